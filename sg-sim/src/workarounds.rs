//! Named exceptions to the strict replay.
//!
//! Each entry accepts one narrowly scoped situation in which a legitimate client is known
//! to disagree with the replay. Entries only run once a move already has excess, they never
//! make a prediction stricter, and every firing is recorded in the tick's usage record.

use std::collections::HashSet;

use bevy::math::{DVec2, DVec3};
use tracing::debug;

use crate::context::MoveContext;
use crate::envelope::JUMP_GAIN;
use crate::horizontal::{Candidate, PREDICTION_EPSILON};
use crate::medium::{AIR_DRAG, GRAVITY};
use crate::moves::MoveData;
use crate::vertical::STEP_HEIGHT;

/// First fall step from rest.
pub const FIRST_DESCENT: f64 = GRAVITY * AIR_DRAG;
pub const TELEPORT_SETTLE_TICKS: u32 = 2;
pub const TELEPORT_SETTLE_MAX_FALL: f64 = 0.5;
pub const TELEPORT_SETTLE_MAX_HORIZONTAL: f64 = 0.5;
pub const LIQUID_SURFACE_BOB: f64 = 0.1;
pub const SLIME_DAMPING_MIN: f64 = 0.4;
pub const SLIME_DAMPING_MAX: f64 = 0.42;
const SLIME_DAMPING_STEPS: u32 = 8;
/// Airborne ticks after which a legacy head bump no longer explains a stalled rise.
pub const LEGACY_HEAD_BUMP_PHASE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkaroundAxis {
    Vertical,
    Horizontal,
}

/// What the predictor saw when it gave up on a move.
#[derive(Clone, Copy, Debug)]
pub struct WorkaroundProbe<'p> {
    pub observed: DVec3,
    /// Closest prediction.
    pub predicted: DVec3,
    /// Horizontal momentum before block damping.
    pub momentum: DVec3,
    pub candidates: &'p [Candidate],
    /// Other vertical outcomes the replay could not rule out.
    pub alternatives: &'p [f64],
}

pub type WorkaroundTest = fn(&MoveContext<'_, '_>, &MoveData, &WorkaroundProbe<'_>) -> bool;

#[derive(Clone, Copy)]
pub struct Workaround {
    pub name: &'static str,
    pub axis: WorkaroundAxis,
    /// Why the discrepancy is legitimate.
    pub summary: &'static str,
    pub test: WorkaroundTest,
}

impl std::fmt::Debug for Workaround {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workaround")
            .field("name", &self.name)
            .field("axis", &self.axis)
            .finish()
    }
}

/// Workarounds that fired during the current tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkaroundUsage {
    fired: Vec<&'static str>,
}

impl WorkaroundUsage {
    pub fn fire(&mut self, name: &'static str) {
        if !self.fired.contains(&name) {
            self.fired.push(name);
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.fired.iter().any(|fired| *fired == name)
    }

    pub fn names(&self) -> &[&'static str] {
        &self.fired
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn reset(&mut self) {
        self.fired.clear();
    }
}

pub struct WorkaroundRegistry {
    entries: Vec<Workaround>,
    disabled: HashSet<&'static str>,
}

impl Default for WorkaroundRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WorkaroundRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            disabled: HashSet::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for entry in BUILTIN {
            registry.register(*entry);
        }
        registry
    }

    /// Appends an entry. Names are unique.
    pub fn register(&mut self, workaround: Workaround) {
        if self.get(workaround.name).is_some() {
            panic!("workaround `{}` registered twice", workaround.name);
        }
        self.entries.push(workaround);
    }

    pub fn get(&self, name: &str) -> Option<&Workaround> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[Workaround] {
        &self.entries
    }

    /// Returns false if no entry has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let Some(entry) = self.get(name) else {
            return false;
        };
        let name = entry.name;
        if enabled {
            self.disabled.remove(name);
        } else {
            self.disabled.insert(name);
        }
        true
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some() && !self.disabled.contains(name)
    }

    /// First enabled entry on `axis` that accepts the move.
    pub fn apply(
        &self,
        axis: WorkaroundAxis,
        ctx: &MoveContext<'_, '_>,
        current: &MoveData,
        probe: &WorkaroundProbe<'_>,
        usage: &mut WorkaroundUsage,
    ) -> Option<&'static str> {
        let entry = self
            .entries
            .iter()
            .filter(|entry| entry.axis == axis && !self.disabled.contains(entry.name))
            .find(|entry| (entry.test)(ctx, current, probe))?;
        usage.fire(entry.name);
        debug!(
            workaround = entry.name,
            tick = current.tick,
            observed_y = probe.observed.y,
            predicted_y = probe.predicted.y,
            "workaround applied"
        );
        Some(entry.name)
    }
}

pub const BUILTIN: &[Workaround] = &[
    Workaround {
        name: "ground_lost_descend",
        axis: WorkaroundAxis::Vertical,
        summary: "The server lost ground contact a tick before the client did, so the client \
                  still starts its fall from rest.",
        test: ground_lost_descend,
    },
    Workaround {
        name: "edge_descend",
        axis: WorkaroundAxis::Vertical,
        summary: "Walking off an edge: the server still clips the fall against the block being \
                  left while the client already took the first fall step.",
        test: edge_descend,
    },
    Workaround {
        name: "could_step",
        axis: WorkaroundAxis::Vertical,
        summary: "Step-up right after ground was lost server side; the client still counted \
                  itself as grounded and was allowed to step.",
        test: could_step,
    },
    Workaround {
        name: "slime_bounce_decay",
        axis: WorkaroundAxis::Vertical,
        summary: "A bounce is computed from the client's pre-collision fall speed, which the \
                  server only knows approximately; a weaker bounce is always legitimate.",
        test: slime_bounce_decay,
    },
    Workaround {
        name: "glide_touchdown",
        axis: WorkaroundAxis::Vertical,
        summary: "Gliding stops client side on touchdown before the server sees the toggle.",
        test: glide_touchdown,
    },
    Workaround {
        name: "levitation_overflow",
        axis: WorkaroundAxis::Vertical,
        summary: "Levitation amplifiers above 127 wrap negative on clients that read the \
                  amplifier as a signed byte.",
        test: levitation_overflow,
    },
    Workaround {
        name: "legacy_head_bump",
        axis: WorkaroundAxis::Vertical,
        summary: "Pre-1.9 clients clip jumps under a ceiling differently from the modern \
                  collision order.",
        test: legacy_head_bump,
    },
    Workaround {
        name: "teleport_settle",
        axis: WorkaroundAxis::Vertical,
        summary: "Right after a teleport the client settles onto the ground with velocity the \
                  server no longer tracks.",
        test: teleport_settle,
    },
    Workaround {
        name: "liquid_surface_bob",
        axis: WorkaroundAxis::Vertical,
        summary: "Crossing a liquid surface the client bobs with an input the protocol does not \
                  report.",
        test: liquid_surface_bob,
    },
    Workaround {
        name: "slime_speed_bruteforce",
        axis: WorkaroundAxis::Horizontal,
        summary: "Slime damping depends on the exact vertical speed after the bounce; every \
                  damping factor the client could have used is tried.",
        test: slime_speed_bruteforce,
    },
    Workaround {
        name: "teleport_settle_horizontal",
        axis: WorkaroundAxis::Horizontal,
        summary: "Momentum from before a teleport can survive into the first moves after it.",
        test: teleport_settle_horizontal,
    },
];

fn is_first_descent(y: f64) -> bool {
    y < 0.0 && y >= -(FIRST_DESCENT + PREDICTION_EPSILON)
}

fn ground_lost_descend(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    is_first_descent(probe.observed.y)
        && !ctx.from.is_on_ground()
        && ctx.jump_phase <= 1
        && ctx.prior.is_some_and(|prior| prior.touched_ground)
}

fn edge_descend(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    let h = probe.observed.x.hypot(probe.observed.z);
    is_first_descent(probe.observed.y)
        && ctx.from.is_on_ground()
        && !ctx.to.is_on_ground()
        && h > 0.0
        && probe.predicted.y >= probe.observed.y
}

/// Ground was touched on the last move, or two moves back with only a first fall step since.
fn lost_ground_recently(ctx: &MoveContext<'_, '_>) -> bool {
    if ctx.jump_phase > ctx.envelope.max_jump_phase().max(1) {
        return false;
    }
    match ctx.jump_phase {
        0 | 1 => ctx.prior.is_some_and(|prior| prior.touched_ground),
        2 => {
            ctx.prior.is_some_and(|prior| is_first_descent(prior.y_distance))
                && ctx.second_prior.is_some_and(|second| second.touched_ground)
        }
        _ => false,
    }
}

fn could_step(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    let y = probe.observed.y;
    let h = probe.observed.x.hypot(probe.observed.z);
    y > 0.0
        && y <= STEP_HEIGHT + PREDICTION_EPSILON
        && h > 0.0
        && !ctx.from.is_on_ground()
        && ctx.to.is_on_ground()
        && lost_ground_recently(ctx)
}

fn slime_bounce_decay(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    let bounced = ctx.prior.is_some_and(|prior| {
        prior.collide_y && prior.y_motion < 0.0 && prior.to.on_bouncy && !prior.sneaking
    });
    bounced && probe.observed.y > 0.0 && probe.observed.y <= probe.predicted.y + PREDICTION_EPSILON
}

fn glide_touchdown(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    ctx.gliding()
        && (ctx.from.is_on_ground() || ctx.to.is_on_ground())
        && probe.observed.y <= PREDICTION_EPSILON
        && probe.observed.y.abs() <= probe.predicted.y.abs() + PREDICTION_EPSILON
}

fn levitation_overflow(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    ctx.policy.amplifier_is_byte
        && ctx.levitation().is_some_and(|amplifier| amplifier > i32::from(i8::MAX))
        && probe
            .alternatives
            .iter()
            .any(|alt| (alt - probe.observed.y).abs() < PREDICTION_EPSILON)
}

fn legacy_head_bump(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    ctx.policy.legacy_client
        && ctx.jump_phase <= LEGACY_HEAD_BUMP_PHASE.min(ctx.envelope.max_jump_phase())
        && ctx.from.is_head_obstructed()
        && probe.observed.y >= -PREDICTION_EPSILON
        && probe.observed.y <= JUMP_GAIN + PREDICTION_EPSILON
}

fn teleport_settle(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    ctx.ticks_since_teleport <= TELEPORT_SETTLE_TICKS
        && probe.observed.y <= PREDICTION_EPSILON
        && probe.observed.y >= -TELEPORT_SETTLE_MAX_FALL
}

fn liquid_surface_bob(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    let from = ctx.from.is_in_liquid();
    let to = ctx.to.is_in_liquid();
    from != to && probe.observed.y.abs() <= LIQUID_SURFACE_BOB + PREDICTION_EPSILON
}

fn slime_speed_bruteforce(ctx: &MoveContext<'_, '_>, _current: &MoveData, probe: &WorkaroundProbe<'_>) -> bool {
    let on_slime = (ctx.from.is_on_bouncy() && ctx.from.is_on_ground())
        || ctx.prior.is_some_and(|prior| prior.to.on_bouncy && prior.to.on_ground);
    if !on_slime {
        return false;
    }
    let observed = DVec2::new(probe.observed.x, probe.observed.z);
    let momentum = DVec2::new(probe.momentum.x, probe.momentum.z);
    let factors = (0..=SLIME_DAMPING_STEPS)
        .map(|step| {
            SLIME_DAMPING_MIN
                + (SLIME_DAMPING_MAX - SLIME_DAMPING_MIN) * f64::from(step) / f64::from(SLIME_DAMPING_STEPS)
        })
        .chain(std::iter::once(1.0));
    for factor in factors {
        for candidate in probe.candidates {
            let acceleration = DVec2::new(candidate.acceleration.x, candidate.acceleration.z);
            let predicted = momentum * factor + acceleration;
            if (predicted.x - observed.x).abs() < PREDICTION_EPSILON
                && (predicted.y - observed.y).abs() < PREDICTION_EPSILON
            {
                return true;
            }
        }
    }
    false
}

fn teleport_settle_horizontal(
    ctx: &MoveContext<'_, '_>,
    _current: &MoveData,
    probe: &WorkaroundProbe<'_>,
) -> bool {
    ctx.ticks_since_teleport <= TELEPORT_SETTLE_TICKS
        && probe.observed.x.hypot(probe.observed.z) <= TELEPORT_SETTLE_MAX_HORIZONTAL
}
