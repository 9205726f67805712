//! Horizontal speed prediction by brute force over the nine movement key combinations.

use bevy::math::{DVec2, DVec3};
use sg_utils::InputReport;
use tracing::trace;

use crate::context::MoveContext;
use crate::geometry::Aabb;
use crate::medium::{LAVA_FLOW_SCALE, Medium, WATER_FLOW_SCALE, look_vector, strategy};
use crate::moves::{ForwardImpulse, MoveData, SplitKind, StrafeImpulse};
use crate::tristate::AlmostBoolean;
use crate::velocity::VelocityLedger;
use crate::vertical::{STEP_HEIGHT, glide_motion};
use crate::workarounds::{TELEPORT_SETTLE_TICKS, WorkaroundAxis, WorkaroundProbe, WorkaroundRegistry, WorkaroundUsage};

pub const PREDICTION_EPSILON: f64 = 1e-4;
pub const INPUT_DAMPING: f64 = 0.98;
pub const SNEAK_MULTIPLIER: f64 = 0.3;
pub const USE_ITEM_MULTIPLIER: f64 = 0.2;
pub const SPRINT_JUMP_BOOST: f64 = 0.2;
pub const CLIMB_HORIZONTAL_CAP: f64 = 0.15;
pub const ATTACK_SLOWDOWN: f64 = 0.6;
pub const TRANSPORT_SPLIT_STEP_CAP: f64 = 0.7;
pub const HONEY_SLIDE_THRESHOLD: f64 = -0.13;
pub const HONEY_SLIDE_SPEED: f64 = -0.05;
/// Index of the no-key candidate.
pub const NO_INPUT: usize = 4;
pub const CANDIDATE_COUNT: usize = 9;

/// Strafe and forward keys of candidate `index`; strafe is positive to the left.
pub const fn candidate_input(index: usize) -> (i8, i8) {
    ((index % 3) as i8 - 1, (index / 3) as i8 - 1)
}

pub fn candidate_index(strafe: i8, forward: i8) -> usize {
    ((forward.signum() + 1) as usize) * 3 + (strafe.signum() + 1) as usize
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Candidate {
    pub strafe: i8,
    pub forward: i8,
    /// Input acceleration alone.
    pub acceleration: DVec3,
    /// Motion fed into collision.
    pub motion: DVec3,
    /// Motion after collision.
    pub result: DVec3,
    pub collided_x: bool,
    pub collided_z: bool,
}

impl Candidate {
    pub fn horizontal(&self) -> f64 {
        self.result.x.hypot(self.result.z)
    }

    fn matches(&self, observed: DVec2, strict: bool) -> bool {
        if strict {
            (self.result.x - observed.x).abs() < PREDICTION_EPSILON
                && (self.result.z - observed.y).abs() < PREDICTION_EPSILON
        } else {
            (self.horizontal() - observed.length()).abs() < PREDICTION_EPSILON
        }
    }

    fn distance_to(&self, observed: DVec2) -> f64 {
        DVec2::new(self.result.x - observed.x, self.result.z - observed.y).length()
    }
}

/// Rotates a strafe/forward input into world space, scaled to `speed`.
pub fn relative_acceleration(input: DVec2, speed: f64, yaw: f32) -> DVec2 {
    let len_sq = input.length_squared();
    if len_sq < 1.0e-7 {
        return DVec2::ZERO;
    }
    let input = if len_sq > 1.0 { input.normalize() } else { input } * speed;
    let (sin, cos) = f64::from(yaw).to_radians().sin_cos();
    DVec2::new(input.x * cos - input.y * sin, input.y * cos + input.x * sin)
}

/// Momentum carried from the previous move, split so the slime damping can be redone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Momentum {
    pub before_damping: DVec3,
    pub damping: f64,
}

impl Momentum {
    pub fn value(&self) -> DVec3 {
        self.before_damping * DVec3::new(self.damping, 1.0, self.damping)
    }
}

pub fn momentum(ctx: &MoveContext<'_, '_>) -> Momentum {
    let Some(prior) = ctx.prior else {
        return Momentum {
            before_damping: DVec3::ZERO,
            damping: 1.0,
        };
    };
    if prior.stuck {
        return Momentum {
            before_damping: DVec3::ZERO,
            damping: 1.0,
        };
    }

    let mut x = if prior.collide_x { 0.0 } else { prior.x_distance };
    let mut z = if prior.collide_z { 0.0 } else { prior.z_distance };
    let prior_vy = if prior.collide_y { 0.0 } else { prior.y_distance };

    if prior.to.touching_honey_side && !prior.to.on_ground && prior_vy < HONEY_SLIDE_THRESHOLD {
        let scale = HONEY_SLIDE_SPEED / prior_vy;
        x *= scale;
        z *= scale;
    }

    let carry = prior.next_inertia * prior.next_speed_factor;
    x *= carry;
    z *= carry;

    let damping = if prior.to.on_bouncy && prior.to.on_ground && !prior.sneaking && prior_vy.abs() < 0.1 {
        0.4 + prior_vy.abs() * 0.2
    } else {
        1.0
    };

    if ctx.actions.attack_slowdown {
        x *= ATTACK_SLOWDOWN;
        z *= ATTACK_SLOWDOWN;
    }

    if ctx.from.is_in_water() {
        let flow = ctx.from.fluid_flow() * WATER_FLOW_SCALE;
        x += flow.x / damping;
        z += flow.z / damping;
    } else if ctx.from.is_in_lava() {
        let flow = ctx.from.fluid_flow() * LAVA_FLOW_SCALE;
        x += flow.x / damping;
        z += flow.z / damping;
    }

    let cut = ctx.policy.negligible_momentum;
    if (x * damping).abs() < cut {
        x = 0.0;
    }
    if (z * damping).abs() < cut {
        z = 0.0;
    }

    Momentum {
        before_damping: DVec3::new(x, 0.0, z),
        damping,
    }
}

/// Riptide launch along the look direction.
pub fn riptide_push(level: u8, yaw: f32, pitch: f32) -> DVec3 {
    let strength = 3.0 * (1.0 + f64::from(level)) / 4.0;
    look_vector(yaw, pitch) * strength
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HorizontalPrediction {
    pub allowed: f64,
    pub excess: f64,
    pub matched: bool,
    pub candidate: Candidate,
    pub inferred: usize,
    pub has_impulse: AlmostBoolean,
    pub sprint_cleared: bool,
    pub bunny_hop: bool,
    pub unpredictable: bool,
    pub workaround: Option<&'static str>,
    pub velocity_used: Option<DVec2>,
    pub next_inertia: f64,
}

impl Default for HorizontalPrediction {
    fn default() -> Self {
        Self {
            allowed: 0.0,
            excess: 0.0,
            matched: false,
            candidate: Candidate::default(),
            inferred: NO_INPUT,
            has_impulse: AlmostBoolean::Maybe,
            sprint_cleared: false,
            bunny_hop: false,
            unpredictable: false,
            workaround: None,
            velocity_used: None,
            next_inertia: 0.0,
        }
    }
}

impl HorizontalPrediction {
    /// Copies the verdict into the move record.
    pub fn apply_to(&self, current: &mut MoveData) {
        current.h_allowed = self.allowed;
        current.h_excess = self.excess;
        current.has_impulse = self.has_impulse;
        let (strafe, forward) = candidate_input(self.inferred);
        current.strafe_impulse = StrafeImpulse::from_input(strafe);
        current.forward_impulse = ForwardImpulse::from_input(forward);
        current.bunny_hop = self.bunny_hop;
        current.hor_vel_used = self.velocity_used;
        current.next_inertia = self.next_inertia;
        if self.matched {
            current.collide_x = self.candidate.collided_x;
            current.collide_z = self.candidate.collided_z;
        }
        if self.sprint_cleared {
            current.sprinting = false;
        }
    }
}

pub struct HorizontalPredictor<'r> {
    registry: &'r WorkaroundRegistry,
}

impl<'r> HorizontalPredictor<'r> {
    pub fn new(registry: &'r WorkaroundRegistry) -> Self {
        Self { registry }
    }

    /// Predicts the horizontal part of `current`. The vertical predictor must already have
    /// filled `is_jump` and `y_motion`.
    pub fn predict(
        &self,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        ledger: &mut VelocityLedger,
        usage: &mut WorkaroundUsage,
    ) -> HorizontalPrediction {
        let observed = ctx.observed_horizontal();
        let observed_h = observed.length();

        if ctx.split_kind == SplitKind::TransportSplit {
            let allowed = TRANSPORT_SPLIT_STEP_CAP * f64::from(ctx.multi_move_count.max(1));
            return HorizontalPrediction {
                allowed,
                excess: (observed_h - allowed).max(0.0),
                next_inertia: self.next_inertia(ctx, ctx.sprint_state()),
                ..HorizontalPrediction::default()
            };
        }

        let momentum = momentum(ctx);

        if ctx.medium() == Medium::Gliding {
            return self.predict_gliding(ctx, current, momentum, ledger, usage);
        }

        let known_input = known_input(ctx);
        let mut sprinting = ctx.sprint_state();
        let mut sprint_cleared = false;

        loop {
            let candidates = self.candidates(ctx, current, momentum.value(), sprinting);
            let indices: Vec<usize> = match known_input {
                Some(input) => vec![candidate_index(input.strafe, input.forward)],
                None => (0..CANDIDATE_COUNT).collect(),
            };

            let found = indices
                .iter()
                .copied()
                .find(|&i| candidates[i].matches(observed, ctx.strict_horizontal));

            if let Some(index) = found {
                let candidate = candidates[index];
                // Sprinting needs a forward key and food.
                if sprinting && (candidate.forward <= 0 || ctx.starving()) {
                    trace!(index, "sprint match rejected");
                    sprinting = false;
                    sprint_cleared = true;
                    continue;
                }
                let has_impulse = AlmostBoolean::from_bool(index != NO_INPUT);
                return HorizontalPrediction {
                    allowed: candidate.horizontal(),
                    excess: 0.0,
                    matched: true,
                    candidate,
                    inferred: index,
                    has_impulse,
                    sprint_cleared,
                    bunny_hop: current.is_jump && sprinting,
                    next_inertia: self.next_inertia(ctx, sprinting),
                    ..HorizontalPrediction::default()
                };
            }

            // The server may still think the player sprints after the client stopped.
            if sprinting {
                sprinting = false;
                sprint_cleared = true;
                continue;
            }

            let mut prediction = self.resolve_mismatch(
                ctx,
                current,
                &candidates,
                &indices,
                momentum,
                sprint_cleared,
                ledger,
                usage,
            );
            if let Some(input) = known_input {
                prediction.inferred = candidate_index(input.strafe, input.forward);
            }
            return prediction;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_mismatch(
        &self,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        candidates: &[Candidate; CANDIDATE_COUNT],
        indices: &[usize],
        momentum: Momentum,
        sprint_cleared: bool,
        ledger: &mut VelocityLedger,
        usage: &mut WorkaroundUsage,
    ) -> HorizontalPrediction {
        let observed = ctx.observed_horizontal();
        let observed_h = observed.length();
        let closest = indices
            .iter()
            .copied()
            .min_by(|&a, &b| {
                candidates[a]
                    .distance_to(observed)
                    .total_cmp(&candidates[b].distance_to(observed))
            })
            .unwrap_or(NO_INPUT);
        let candidate = candidates[closest];
        let unpredictable = self.is_unpredictable(ctx);
        let has_impulse = match known_input(ctx) {
            Some(input) => AlmostBoolean::from_bool(candidate_index(input.strafe, input.forward) != NO_INPUT),
            None if unpredictable => AlmostBoolean::Maybe,
            None => AlmostBoolean::No,
        };
        // Per-axis comparison holds the direction against the player, so it needs a known input.
        let strict = ctx.strict_horizontal && has_impulse.is_certain();
        // A move explained by an outside push says nothing about unreported keys.
        let covered_impulse = if known_input(ctx).is_some() {
            has_impulse
        } else {
            AlmostBoolean::Maybe
        };

        let mut prediction = HorizontalPrediction {
            allowed: candidate.horizontal(),
            excess: excess(candidate, observed, strict),
            candidate,
            inferred: if unpredictable { closest } else { NO_INPUT },
            has_impulse,
            sprint_cleared,
            unpredictable,
            next_inertia: self.next_inertia(ctx, ctx.sprint_state()),
            ..HorizontalPrediction::default()
        };
        if prediction.excess <= 0.0 {
            return prediction;
        }

        let probe = WorkaroundProbe {
            observed: ctx.observed(),
            predicted: candidate.result,
            momentum: momentum.before_damping,
            candidates: candidates.as_slice(),
            alternatives: &[],
        };
        if let Some(name) = self
            .registry
            .apply(WorkaroundAxis::Horizontal, ctx, current, &probe, usage)
        {
            prediction.workaround = Some(name);
            prediction.allowed = observed_h;
            prediction.excess = 0.0;
            prediction.has_impulse = covered_impulse;
            return prediction;
        }

        let tolerance = self.max_acceleration(ctx, ctx.sprint_state()) + PREDICTION_EPSILON;
        let carried = momentum.value();
        let used = ledger
            .use_horizontal(observed.x - carried.x, observed.y - carried.z, tolerance)
            .or_else(|| ledger.use_horizontal(observed.x, observed.y, tolerance));
        if let Some(value) = used {
            prediction.velocity_used = Some(value);
            prediction.allowed = observed_h;
            prediction.excess = 0.0;
            prediction.has_impulse = covered_impulse;
        }
        prediction
    }

    fn predict_gliding(
        &self,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        momentum: Momentum,
        ledger: &mut VelocityLedger,
        usage: &mut WorkaroundUsage,
    ) -> HorizontalPrediction {
        let glide = glide_motion(ctx, momentum.value());
        let motion = DVec3::new(glide.x, current.y_motion, glide.z);
        let result = ctx.world.collide(&ctx.from.aabb(), motion);
        let candidate = Candidate {
            strafe: 0,
            forward: 0,
            acceleration: DVec3::ZERO,
            motion,
            result,
            collided_x: result.x != motion.x,
            collided_z: result.z != motion.z,
        };
        let candidates = [candidate; CANDIDATE_COUNT];
        let observed = ctx.observed_horizontal();
        if candidate.matches(observed, ctx.strict_horizontal) {
            return HorizontalPrediction {
                allowed: candidate.horizontal(),
                matched: true,
                candidate,
                next_inertia: 1.0,
                ..HorizontalPrediction::default()
            };
        }
        let mut prediction = self.resolve_mismatch(
            ctx,
            current,
            &candidates,
            &[NO_INPUT],
            momentum,
            false,
            ledger,
            usage,
        );
        prediction.has_impulse = AlmostBoolean::Maybe;
        prediction.next_inertia = 1.0;
        prediction
    }

    fn candidates(
        &self,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        momentum: DVec3,
        sprinting: bool,
    ) -> [Candidate; CANDIDATE_COUNT] {
        let yaw = ctx.to.yaw();
        let mut seed = momentum;
        if current.is_jump && sprinting {
            let (sin, cos) = f64::from(yaw).to_radians().sin_cos();
            seed.x -= sin * SPRINT_JUMP_BOOST;
            seed.z += cos * SPRINT_JUMP_BOOST;
        }
        if let Some(level) = ctx.actions.riptide {
            seed += riptide_push(level, yaw, ctx.to.pitch());
        }

        let acceleration = strategy(ctx.medium(), &ctx.policy).acceleration(&ctx.env(sprinting, current.y_motion));
        let mut modifier = INPUT_DAMPING;
        if ctx.actions.sneaking {
            modifier *= SNEAK_MULTIPLIER;
        }
        if ctx.actions.using_item {
            modifier *= USE_ITEM_MULTIPLIER;
        }
        let climbing = ctx.from.is_on_climbable() && !ctx.from.is_in_liquid();
        let stuck = ctx.from.stuck_multiplier();
        let from_bb: Aabb = ctx.from.aabb();
        let on_ground = ctx.from.is_on_ground();

        std::array::from_fn(|index| {
            let (strafe, forward) = candidate_input(index);
            let input = DVec2::new(f64::from(strafe), f64::from(forward)) * modifier;
            let accel = relative_acceleration(input, acceleration, yaw);
            let mut motion = DVec3::new(seed.x + accel.x, current.y_motion, seed.z + accel.y);
            if climbing {
                motion.x = motion.x.clamp(-CLIMB_HORIZONTAL_CAP, CLIMB_HORIZONTAL_CAP);
                motion.z = motion.z.clamp(-CLIMB_HORIZONTAL_CAP, CLIMB_HORIZONTAL_CAP);
            }
            if let Some(multiplier) = stuck {
                motion.x *= multiplier[0];
                motion.z *= multiplier[2];
            }
            let collision = ctx
                .world
                .resolve_with_step(&from_bb, motion, on_ground, STEP_HEIGHT);
            Candidate {
                strafe,
                forward,
                acceleration: DVec3::new(accel.x, 0.0, accel.y),
                motion,
                result: collision.motion,
                collided_x: collision.collided_x,
                collided_z: collision.collided_z,
            }
        })
    }

    fn max_acceleration(&self, ctx: &MoveContext<'_, '_>, sprinting: bool) -> f64 {
        strategy(ctx.medium(), &ctx.policy).acceleration(&ctx.env(sprinting, 0.0))
    }

    fn next_inertia(&self, ctx: &MoveContext<'_, '_>, sprinting: bool) -> f64 {
        strategy(ctx.medium(), &ctx.policy).horizontal_inertia(&ctx.env(sprinting, 0.0))
    }

    /// Ticks whose hidden client state cannot be reproduced exactly.
    fn is_unpredictable(&self, ctx: &MoveContext<'_, '_>) -> bool {
        let on_slime = ctx.from.is_on_bouncy() && ctx.from.is_on_ground();
        let medium_change = ctx
            .prior
            .is_some_and(|prior| prior.from.in_liquid() != ctx.from.is_in_liquid());
        on_slime
            || medium_change
            || ctx.from.touching_honey_side()
            || ctx.prior.is_none()
            || ctx.ticks_since_teleport <= TELEPORT_SETTLE_TICKS
    }
}

fn known_input(ctx: &MoveContext<'_, '_>) -> Option<InputReport> {
    if ctx.policy.input_packet { ctx.input } else { None }
}

fn excess(candidate: Candidate, observed: DVec2, strict: bool) -> f64 {
    if strict {
        axis_excess(observed.x, candidate.result.x).hypot(axis_excess(observed.y, candidate.result.z))
    } else {
        (observed.length() - candidate.horizontal()).max(0.0)
    }
}

/// Distance moved beyond the prediction along one axis; moving against it counts in full.
fn axis_excess(observed: f64, predicted: f64) -> f64 {
    if observed * predicted < 0.0 {
        observed.abs()
    } else {
        (observed.abs() - predicted.abs()).max(0.0)
    }
}
