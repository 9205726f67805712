use bevy::math::{DVec2, DVec3};
use sg_utils::InputReport;

use crate::envelope::LiftOffEnvelope;
use crate::geometry::WorldCollision;
use crate::location::PlayerLocation;
use crate::medium::{GRAVITY, Medium, MediumEnv, SLOW_FALLING_GRAVITY, movement_speed};
use crate::moves::{MoveData, SplitKind};
use crate::policy::PhysicsPolicy;

pub const MIN_SPRINT_FOOD: i32 = 6;

/// Active potion effects by amplifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub speed: Option<i32>,
    pub slowness: Option<i32>,
    pub jump_boost: Option<i32>,
    pub levitation: Option<i32>,
    pub slow_falling: Option<i32>,
}

/// Player toggles reported by the client outside of position packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionState {
    pub sprinting: bool,
    pub sneaking: bool,
    pub using_item: bool,
    pub gliding: bool,
    /// Attacked while sprinting since the last move.
    pub attack_slowdown: bool,
    pub food: i32,
    /// Riptide level released since the last move.
    pub riptide: Option<u8>,
}

impl Default for ActionState {
    fn default() -> Self {
        Self {
            sprinting: false,
            sneaking: false,
            using_item: false,
            gliding: false,
            attack_slowdown: false,
            food: 20,
            riptide: None,
        }
    }
}

/// Everything the predictors read for one move. Built by the engine, dropped at tick end.
pub struct MoveContext<'a, 'w> {
    pub from: &'a PlayerLocation<'w>,
    pub to: &'a PlayerLocation<'w>,
    pub world: &'a WorldCollision<'w>,
    pub policy: PhysicsPolicy,
    pub actions: ActionState,
    pub effects: Effects,
    pub prior: Option<MoveData>,
    pub second_prior: Option<MoveData>,
    pub jump_phase: u32,
    pub envelope: LiftOffEnvelope,
    pub ticks_since_teleport: u32,
    pub input: Option<InputReport>,
    pub strict_horizontal: bool,
    pub split_kind: SplitKind,
    pub multi_move_count: u8,
}

impl MoveContext<'_, '_> {
    pub fn observed(&self) -> DVec3 {
        self.to.pos() - self.from.pos()
    }

    pub fn observed_horizontal(&self) -> DVec2 {
        let observed = self.observed();
        DVec2::new(observed.x, observed.z)
    }

    pub fn gliding(&self) -> bool {
        self.actions.gliding && self.policy.elytra
    }

    pub fn medium(&self) -> Medium {
        self.from.medium(self.gliding())
    }

    /// Levitation amplifier as the server tracks it.
    pub fn levitation(&self) -> Option<i32> {
        if self.policy.levitation {
            self.effects.levitation
        } else {
            None
        }
    }

    pub fn gravity_for(&self, vy: f64) -> f64 {
        if self.policy.slow_falling && self.effects.slow_falling.is_some() && vy <= 0.0 {
            SLOW_FALLING_GRAVITY
        } else {
            GRAVITY
        }
    }

    /// A sprint attack ends the sprint before the move.
    pub fn sprint_state(&self) -> bool {
        self.actions.sprinting && !self.actions.attack_slowdown
    }

    pub fn starving(&self) -> bool {
        self.actions.food < MIN_SPRINT_FOOD
    }

    pub fn env(&self, sprinting: bool, vy: f64) -> MediumEnv {
        MediumEnv {
            on_ground: self.from.is_on_ground(),
            ground_friction: self.from.ground_friction(),
            movement_speed: movement_speed(self.effects.speed, self.effects.slowness, sprinting),
            sprinting,
            gravity: self.gravity_for(vy),
            levitation: self.levitation(),
        }
    }
}
