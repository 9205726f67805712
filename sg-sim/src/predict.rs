use bevy::math::DVec3;

use crate::context::MoveContext;
use crate::horizontal::{HorizontalPrediction, HorizontalPredictor};
use crate::moves::MoveData;
use crate::velocity::VelocityLedger;
use crate::vertical::{VerticalPrediction, VerticalPredictor};
use crate::workarounds::{WorkaroundRegistry, WorkaroundUsage};

/// Longest move per tick that still goes through the replay. Velocity packets top out
/// well below this.
pub const MAX_MOVE_DISTANCE: f64 = 16.0;

/// Both verdicts of one move plus the workarounds that fired for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovePrediction {
    pub vertical: VerticalPrediction,
    pub horizontal: HorizontalPrediction,
    pub usage: WorkaroundUsage,
}

impl MovePrediction {
    pub fn h_excess(&self) -> f64 {
        self.horizontal.excess
    }

    pub fn y_excess(&self) -> f64 {
        self.vertical.excess
    }

    pub fn is_violation(&self) -> bool {
        self.h_excess() > 0.0 || self.y_excess() > 0.0
    }

    pub fn severity(&self) -> f64 {
        self.h_excess() + self.y_excess()
    }
}

/// Fills the per-move state that does not depend on the verdicts.
fn prepare(ctx: &MoveContext<'_, '_>, current: &mut MoveData) {
    current.medium = ctx.medium();
    current.sprinting = ctx.sprint_state();
    current.sneaking = ctx.actions.sneaking;
    current.gliding = ctx.gliding();
    current.next_speed_factor = ctx.to.speed_factor();
    current.stuck = ctx.from.stuck_multiplier().is_some();
    current.split_kind = ctx.split_kind;
    current.multi_move_count = ctx.multi_move_count;
}

/// Runs the vertical predictor, then the horizontal one (it needs the jump flag), and
/// writes both verdicts into `current`.
pub fn predict_move(
    registry: &WorkaroundRegistry,
    ctx: &MoveContext<'_, '_>,
    current: &mut MoveData,
    ledger: &mut VelocityLedger,
) -> MovePrediction {
    prepare(ctx, current);
    let mut usage = WorkaroundUsage::default();

    let vertical = VerticalPredictor::new(registry).predict(ctx, current, ledger, &mut usage);
    vertical.apply_to(current);

    let horizontal = HorizontalPredictor::new(registry).predict(ctx, current, ledger, &mut usage);
    horizontal.apply_to(current);

    MovePrediction {
        vertical,
        horizontal,
        usage,
    }
}

/// Verdict for a move longer than `max_distance`: the whole distance is excess and no
/// collision is evaluated. Non-finite moves count as `max_distance`.
pub fn reject_oversized(observed: DVec3, max_distance: f64, current: &mut MoveData) -> MovePrediction {
    let horizontal = observed.x.hypot(observed.z);
    let vertical = observed.y.abs();
    let (horizontal, vertical) = if horizontal.is_finite() && vertical.is_finite() {
        (horizontal, vertical)
    } else {
        (max_distance, 0.0)
    };
    let prediction = MovePrediction {
        vertical: VerticalPrediction {
            excess: vertical,
            ..VerticalPrediction::default()
        },
        horizontal: HorizontalPrediction {
            excess: horizontal,
            ..HorizontalPrediction::default()
        },
        usage: WorkaroundUsage::default(),
    };
    prediction.vertical.apply_to(current);
    prediction.horizontal.apply_to(current);
    prediction
}

/// Whether a move is too long (or not a number) to replay.
pub fn is_oversized(observed: DVec3, max_distance: f64) -> bool {
    let length = observed.length();
    length.is_nan() || length > max_distance
}
