//! Vertical speed prediction: resting, stepping and jumping first, then a replay of the
//! previous tick's medium physics.

use bevy::math::DVec3;
use tracing::trace;

use crate::context::MoveContext;
use crate::envelope::{LiftOffEnvelope, jump_gain};
use crate::horizontal::{PREDICTION_EPSILON, momentum};
use crate::medium::{Medium, MediumEnv, glide_velocity, strategy};
use crate::moves::{MoveData, SplitKind};
use crate::velocity::VelocityLedger;
use crate::workarounds::{WorkaroundAxis, WorkaroundProbe, WorkaroundRegistry, WorkaroundUsage};

pub const STEP_HEIGHT: f64 = 0.6;
pub const CLIMB_UP_SPEED: f64 = 0.2;
pub const CLIMB_DESCENT_CAP: f64 = -0.15;
pub const LIQUID_JUMP_BOB: f64 = 0.04;
pub const EXIT_LIQUID_BOOST: f64 = 0.3;
pub const HONEY_SLIDE_SPEED: f64 = -0.05;
pub const BUBBLE_DOWN_STEP: f64 = 0.03;
pub const BUBBLE_DOWN_CAP: f64 = -0.3;
pub const BUBBLE_UP_STEP: f64 = 0.06;
pub const BUBBLE_UP_CAP: f64 = 0.7;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VerticalPrediction {
    pub allowed: f64,
    pub excess: f64,
    pub is_jump: bool,
    pub is_step_up: bool,
    /// Motion fed into collision, before clipping.
    pub y_motion: f64,
    pub collide_y: bool,
    pub workaround: Option<&'static str>,
    pub velocity_used: Option<f64>,
}

impl VerticalPrediction {
    pub fn apply_to(&self, current: &mut MoveData) {
        current.y_allowed = self.allowed;
        current.y_excess = self.excess;
        current.is_jump = self.is_jump;
        current.is_step_up = self.is_step_up;
        current.y_motion = self.y_motion;
        current.collide_y = self.collide_y;
        current.ver_vel_used = self.velocity_used;
    }
}

/// Velocity left after the previous move, before this tick's physics.
fn carried_vertical(prior: Option<&MoveData>) -> f64 {
    match prior {
        Some(prior) if !prior.collide_y && !prior.is_step_up => prior.y_distance,
        _ => 0.0,
    }
}

/// Elytra motion for this tick from the carried horizontal momentum.
pub fn glide_motion(ctx: &MoveContext<'_, '_>, horizontal: DVec3) -> DVec3 {
    let vy = carried_vertical(ctx.prior.as_ref());
    glide_velocity(
        DVec3::new(horizontal.x, vy, horizontal.z),
        ctx.to.yaw(),
        ctx.to.pitch(),
        ctx.gravity_for(vy),
    )
}

/// One pre-collision vertical motion the client could have used.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Hypothesis {
    motion: f64,
    result: f64,
}

pub struct VerticalPredictor<'r> {
    registry: &'r WorkaroundRegistry,
}

impl<'r> VerticalPredictor<'r> {
    pub fn new(registry: &'r WorkaroundRegistry) -> Self {
        Self { registry }
    }

    pub fn predict(
        &self,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        ledger: &mut VelocityLedger,
        usage: &mut WorkaroundUsage,
    ) -> VerticalPrediction {
        let y = ctx.observed().y;
        let h = ctx.observed_horizontal().length();
        let from_ground = ctx.from.is_on_ground();
        let to_ground = ctx.to.is_on_ground();

        if ctx.split_kind == SplitKind::TransportSplit {
            let count = f64::from(ctx.multi_move_count.max(1));
            let cap = jump_gain(LiftOffEnvelope::Normal, ctx.from.jump_factor(), ctx.effects.jump_boost) * count;
            return VerticalPrediction {
                allowed: cap,
                excess: (y - cap).max(0.0),
                y_motion: y / count,
                ..VerticalPrediction::default()
            };
        }

        if from_ground && to_ground && y.abs() < PREDICTION_EPSILON {
            return VerticalPrediction {
                allowed: 0.0,
                y_motion: -ctx.gravity_for(0.0),
                collide_y: true,
                ..VerticalPrediction::default()
            };
        }

        let gliding = ctx.medium() == Medium::Gliding;
        if from_ground && to_ground && !gliding && y > 0.0 && y <= STEP_HEIGHT + PREDICTION_EPSILON && h > 0.0 {
            return VerticalPrediction {
                allowed: y,
                is_step_up: true,
                y_motion: -ctx.gravity_for(0.0),
                ..VerticalPrediction::default()
            };
        }

        if let Some(jump) = self.jump(ctx, y) {
            return jump;
        }

        let (hypotheses, alternatives) = self.replay(ctx);
        let chosen = hypotheses
            .iter()
            .copied()
            .min_by(|a, b| (a.result - y).abs().total_cmp(&(b.result - y).abs()))
            .unwrap_or(Hypothesis {
                motion: 0.0,
                result: 0.0,
            });
        trace!(count = hypotheses.len(), chosen = chosen.result, observed = y, "vertical replay");

        let mut prediction = VerticalPrediction {
            allowed: chosen.result,
            excess: vertical_excess(y, chosen.result, to_ground),
            y_motion: chosen.motion,
            collide_y: chosen.result != chosen.motion,
            ..VerticalPrediction::default()
        };
        if prediction.excess <= 0.0 {
            return prediction;
        }

        let observed = ctx.observed();
        let probe = WorkaroundProbe {
            observed,
            predicted: DVec3::new(observed.x, chosen.result, observed.z),
            momentum: DVec3::ZERO,
            candidates: &[],
            alternatives: &alternatives,
        };
        if let Some(name) = self
            .registry
            .apply(WorkaroundAxis::Vertical, ctx, current, &probe, usage)
        {
            // The client moved as observed, so the next tick carries that speed.
            prediction.workaround = Some(name);
            prediction.allowed = y;
            prediction.excess = 0.0;
            prediction.y_motion = y;
            prediction.collide_y = false;
            return prediction;
        }

        let used = ledger
            .use_vertical(y, PREDICTION_EPSILON)
            .or_else(|| ledger.use_vertical(y - chosen.result, PREDICTION_EPSILON));
        if let Some(value) = used {
            prediction.velocity_used = Some(value);
            prediction.allowed = y;
            prediction.excess = 0.0;
            prediction.y_motion = y;
        }
        prediction
    }

    fn jump(&self, ctx: &MoveContext<'_, '_>, y: f64) -> Option<VerticalPrediction> {
        let lifting_off = ctx.from.is_on_ground() || ctx.prior.is_some_and(|prior| prior.to.on_ground);
        if y <= 0.0 || !lifting_off || ctx.jump_phase > 1 || !ctx.envelope.allows_jump() {
            return None;
        }
        let mut gain = jump_gain(ctx.envelope, ctx.from.jump_factor(), ctx.effects.jump_boost);
        if let Some(multiplier) = ctx.from.stuck_multiplier() {
            gain *= multiplier[1];
        }
        if gain <= 0.0 {
            return None;
        }
        let clipped = ctx.world.collide(&ctx.from.aabb(), DVec3::new(0.0, gain, 0.0)).y;
        [gain, clipped]
            .into_iter()
            .find(|value| (value - y).abs() < PREDICTION_EPSILON)
            .map(|_| VerticalPrediction {
                allowed: y,
                is_jump: true,
                y_motion: gain,
                collide_y: clipped != gain,
                ..VerticalPrediction::default()
            })
    }

    /// Every vertical motion the replay could not rule out, collided against the world,
    /// plus levitation outcomes a byte-wrapping client would produce.
    fn replay(&self, ctx: &MoveContext<'_, '_>) -> (Vec<Hypothesis>, Vec<f64>) {
        let prior = ctx.prior.as_ref();
        let from_bb = ctx.from.aabb();
        let collide = |motion: f64| Hypothesis {
            motion,
            result: ctx.world.collide(&from_bb, DVec3::new(0.0, motion, 0.0)).y,
        };

        if ctx.medium() == Medium::Gliding {
            let motion = glide_motion(ctx, momentum(ctx).value()).y;
            return (vec![collide(motion)], Vec::new());
        }

        let mut vy = carried_vertical(prior);
        if let Some(prior) = prior {
            if prior.collide_y && prior.y_motion < 0.0 && prior.to.on_bouncy && !prior.sneaking {
                vy = -prior.y_motion * prior.to.bounce_factor;
            }
        }
        match ctx.from.bubble_column() {
            Some(true) => vy = (vy - BUBBLE_DOWN_STEP).max(BUBBLE_DOWN_CAP),
            Some(false) => vy = (vy + BUBBLE_UP_STEP).min(BUBBLE_UP_CAP),
            None => {}
        }
        if ctx.from.is_sliding_down(vy) {
            vy = HONEY_SLIDE_SPEED;
        }
        if prior.is_some_and(|prior| prior.stuck) {
            vy = 0.0;
        }
        if prior.is_some_and(|prior| prior.to.on_climbable && prior.collided_horizontally()) {
            vy = CLIMB_UP_SPEED;
        }

        let (medium, sprinting) = prior.map_or((ctx.medium(), ctx.sprint_state()), |prior| (prior.medium, prior.sprinting));
        let physics = strategy(medium, &ctx.policy);
        let env = ctx.env(sprinting, vy);
        let mut motions = vec![physics.next_vertical(vy, &env)];
        if prior.is_some_and(|prior| prior.from.in_liquid() && prior.collided_horizontally()) {
            motions.push(EXIT_LIQUID_BOOST);
        }

        let mut alternatives = Vec::new();
        if let Some(amplifier) = env.levitation {
            let wrapped = ctx.policy.client_amplifier(amplifier);
            if wrapped != amplifier {
                let wrapped_env = MediumEnv {
                    levitation: Some(wrapped),
                    ..env
                };
                alternatives.push(collide(physics.next_vertical(vy, &wrapped_env)).result);
            }
        }

        let cut = ctx.policy.negligible_momentum;
        let climbing = ctx.from.is_on_climbable() && !ctx.from.is_in_liquid();
        let in_liquid = ctx.from.is_in_liquid();
        let stuck = ctx.from.stuck_multiplier();

        let mut hypotheses = Vec::with_capacity(motions.len() * 2);
        for base in motions {
            let base = if base.abs() < cut { 0.0 } else { base };
            let mut variants = vec![base];
            if in_liquid {
                variants.push(base + LIQUID_JUMP_BOB);
            }
            for mut motion in variants {
                if climbing {
                    motion = motion.max(CLIMB_DESCENT_CAP);
                    if ctx.actions.sneaking && motion < 0.0 {
                        motion = 0.0;
                    }
                }
                if let Some(multiplier) = stuck {
                    motion *= multiplier[1];
                }
                hypotheses.push(collide(motion));
            }
        }
        (hypotheses, alternatives)
    }
}

/// Rising above the prediction, or falling faster than it while still airborne.
fn vertical_excess(observed: f64, predicted: f64, to_ground: bool) -> f64 {
    if observed > predicted + PREDICTION_EPSILON {
        observed - predicted
    } else if observed < predicted - PREDICTION_EPSILON && !to_ground {
        predicted - observed
    } else {
        0.0
    }
}
