use crate::location::MoveEndpoint;

pub const JUMP_GAIN: f64 = 0.42;
pub const MAX_JUMP_PHASE: u32 = 6;

/// What kind of lift-off the surroundings allow, carried across ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LiftOffEnvelope {
    #[default]
    Normal,
    /// Liquids only allow bobbing, not a ground jump.
    LimitLiquid,
    LimitWeb,
    LimitPowderSnow,
    LimitBerryBush,
    LimitHoney,
    NoJump,
    Unknown,
}

impl LiftOffEnvelope {
    pub fn classify(at: &MoveEndpoint) -> Self {
        if at.in_liquid() {
            Self::LimitLiquid
        } else if at.in_web {
            Self::LimitWeb
        } else if at.in_powder_snow {
            Self::LimitPowderSnow
        } else if at.in_berry_bush {
            Self::LimitBerryBush
        } else if at.jump_factor < 1.0 {
            Self::LimitHoney
        } else {
            Self::Normal
        }
    }

    pub fn allows_jump(self) -> bool {
        !matches!(self, Self::LimitLiquid | Self::NoJump)
    }

    /// Scale on the base jump gain before the stuck multiplier applies.
    pub fn jump_multiplier(self) -> f64 {
        match self {
            Self::NoJump | Self::LimitLiquid => 0.0,
            _ => 1.0,
        }
    }

    pub fn max_jump_phase(self) -> u32 {
        match self {
            Self::Normal | Self::Unknown => MAX_JUMP_PHASE,
            Self::LimitHoney => 4,
            _ => 1,
        }
    }
}

/// Initial vertical speed of a jump.
pub fn jump_gain(envelope: LiftOffEnvelope, jump_factor: f64, jump_boost: Option<i32>) -> f64 {
    let boost = jump_boost.map_or(0.0, |amplifier| 0.1 * f64::from(amplifier + 1));
    (JUMP_GAIN * jump_factor + boost) * envelope.jump_multiplier()
}
