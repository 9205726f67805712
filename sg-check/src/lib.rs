//! Per-player orchestration of the movement predictors, violation levels and the ECS
//! plugin that feeds them.

pub mod adjudicator;
pub mod config;
pub mod engine;
pub mod plugin;
pub mod session;
pub mod sink;

pub use adjudicator::{Adjudicator, Decision, SetBack, ViolationLevel, ViolationPolicy};
pub use config::{ConfigError, EngineConfig};
pub use engine::{MovingEngine, PASSABLE_CHECK, SPEED_CHECK, Verdict};
pub use plugin::{AntiCheatPlugin, PositionReportQueue, VerdictQueue};
pub use session::PlayerSession;
pub use sink::{ActionOutcome, LogSink, ViolationSink};

#[cfg(test)]
mod tests;
