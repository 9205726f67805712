//! Turns measured excess into violation levels and set-back decisions.

use sg_utils::{EntityId, PlayerLook};
use tracing::debug;

use crate::config::ViolationConfig;
use crate::sink::ViolationSink;

/// Level added per block of excess distance.
pub const LEVEL_PER_BLOCK: f64 = 100.0;
const NEGLIGIBLE_LEVEL: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViolationPolicy {
    pub decay_factor: f64,
    pub freeze_ticks: u32,
    pub decay_while_airborne: bool,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        Self::from(&ViolationConfig::default())
    }
}

impl From<&ViolationConfig> for ViolationPolicy {
    fn from(config: &ViolationConfig) -> Self {
        Self {
            decay_factor: config.decay_factor.clamp(0.0, 1.0),
            freeze_ticks: config.freeze_ticks,
            decay_while_airborne: config.decay_while_airborne,
        }
    }
}

/// Per player, per check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViolationLevel {
    level: f64,
    clean_ticks: u32,
}

impl ViolationLevel {
    pub fn value(&self) -> f64 {
        self.level
    }

    pub fn clean_ticks(&self) -> u32 {
        self.clean_ticks
    }

    pub fn add(&mut self, excess: f64) {
        self.level += excess.max(0.0) * LEVEL_PER_BLOCK;
        self.clean_ticks = 0;
    }

    /// A move without violation. Decay starts once `freeze_ticks` clean moves passed.
    pub fn tick_clean(&mut self, policy: &ViolationPolicy, airborne: bool) {
        self.clean_ticks = self.clean_ticks.saturating_add(1);
        if self.clean_ticks <= policy.freeze_ticks || (airborne && !policy.decay_while_airborne) {
            return;
        }
        self.level *= policy.decay_factor;
        if self.level < NEGLIGIBLE_LEVEL {
            self.level = 0.0;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetBack {
    pub look: PlayerLook,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    Allow,
    Revert(SetBack),
}

impl Decision {
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Revert(_))
    }

    /// The harsher of two decisions.
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Revert(_) => self,
            Self::Allow => other,
        }
    }
}

/// One measurement handed to the adjudicator.
#[derive(Clone, Copy, Debug)]
pub struct Finding {
    pub entity_id: EntityId,
    pub check: &'static str,
    pub severity: f64,
    pub airborne: bool,
    pub set_back: PlayerLook,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Adjudicator {
    policy: ViolationPolicy,
}

impl Adjudicator {
    pub fn new(policy: ViolationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ViolationPolicy {
        &self.policy
    }

    /// Updates the level, then asks the sink what to do. The level changes whatever
    /// the sink decides.
    pub fn record(
        &self,
        finding: Finding,
        level: &mut ViolationLevel,
        sink: &mut dyn ViolationSink,
    ) -> Decision {
        if finding.severity <= 0.0 {
            level.tick_clean(&self.policy, finding.airborne);
            return Decision::Allow;
        }
        level.add(finding.severity);
        let outcome = sink.record_violation(finding.entity_id, finding.check, level.value(), finding.severity);
        debug!(
            entity_id = finding.entity_id,
            check = finding.check,
            level = level.value(),
            cancel = outcome.cancel,
            "violation recorded"
        );
        if !outcome.cancel {
            return Decision::Allow;
        }
        sink.request_set_back(finding.entity_id, finding.set_back);
        Decision::Revert(SetBack {
            look: finding.set_back,
        })
    }
}
