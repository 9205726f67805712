//! Movement replay kernel: collision, per-medium physics and the two speed predictors.

pub mod context;
pub mod envelope;
pub mod geometry;
pub mod horizontal;
pub mod location;
pub mod medium;
pub mod moves;
pub mod policy;
pub mod predict;
pub mod tristate;
pub mod velocity;
pub mod vertical;
pub mod workarounds;

pub use context::{ActionState, Effects, MoveContext};
pub use envelope::{LiftOffEnvelope, jump_gain};
pub use geometry::{Aabb, Collision, RayHit, WorldBorder, WorldCollision};
pub use horizontal::{Candidate, HorizontalPrediction, HorizontalPredictor, PREDICTION_EPSILON};
pub use location::{MoveEndpoint, PlayerLocation};
pub use medium::{Medium, MediumPhysics};
pub use moves::{MoveData, MoveHistory, SplitKind};
pub use policy::PhysicsPolicy;
pub use predict::{MAX_MOVE_DISTANCE, MovePrediction, is_oversized, predict_move, reject_oversized};
pub use tristate::AlmostBoolean;
pub use velocity::{VelocityFlags, VelocityLedger};
pub use vertical::{VerticalPrediction, VerticalPredictor};
pub use workarounds::{Workaround, WorkaroundRegistry, WorkaroundUsage};

#[cfg(test)]
mod tests;
