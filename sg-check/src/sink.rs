use sg_utils::{EntityId, PlayerLook};
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub cancel: bool,
}

/// Where violations go once a check has measured them.
pub trait ViolationSink {
    fn record_violation(
        &mut self,
        entity_id: EntityId,
        check: &'static str,
        level: f64,
        severity: f64,
    ) -> ActionOutcome;

    fn request_set_back(&mut self, entity_id: EntityId, location: PlayerLook);
}

/// Logs every violation and cancels once the level passes `cancel_threshold`.
#[derive(Clone, Copy, Debug)]
pub struct LogSink {
    pub cancel_threshold: f64,
}

impl ViolationSink for LogSink {
    fn record_violation(
        &mut self,
        entity_id: EntityId,
        check: &'static str,
        level: f64,
        severity: f64,
    ) -> ActionOutcome {
        let cancel = level > self.cancel_threshold;
        warn!(entity_id, check, level, severity, cancel, "violation");
        ActionOutcome { cancel }
    }

    fn request_set_back(&mut self, entity_id: EntityId, location: PlayerLook) {
        warn!(
            entity_id,
            x = location.pos.x,
            y = location.pos.y,
            z = location.pos.z,
            "set-back"
        );
    }
}
