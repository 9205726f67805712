use std::collections::HashMap;

use bevy::math::DVec3;
use sg_sim::{
    ActionState, Effects, LiftOffEnvelope, MoveEndpoint, MoveHistory, PhysicsPolicy, VelocityFlags,
    VelocityLedger, WorkaroundUsage,
};
use sg_utils::{Capabilities, EffectKind, EntityId, PlayerActionKind, PlayerLook};

use crate::adjudicator::ViolationLevel;
use crate::config::VelocityConfig;

/// Movement state of one connected player, kept between ticks.
#[derive(Debug)]
pub struct PlayerSession {
    pub entity_id: EntityId,
    pub capabilities: Capabilities,
    pub history: MoveHistory,
    pub ledger: VelocityLedger,
    pub actions: ActionState,
    pub effects: Effects,
    pub jump_phase: u32,
    pub envelope: LiftOffEnvelope,
    pub set_back: PlayerLook,
    pub ticks_since_teleport: u32,
    /// Workarounds that fired on the last evaluated move.
    pub usage: WorkaroundUsage,
    violations: HashMap<&'static str, ViolationLevel>,
}

fn marker_endpoint(look: PlayerLook) -> MoveEndpoint {
    MoveEndpoint {
        pos: look.pos,
        yaw: look.yaw,
        pitch: look.pitch,
        ..MoveEndpoint::default()
    }
}

impl PlayerSession {
    pub fn new(
        entity_id: EntityId,
        look: PlayerLook,
        tick: u32,
        capabilities: Capabilities,
        velocity: &VelocityConfig,
    ) -> Self {
        let mut session = Self {
            entity_id,
            capabilities,
            history: MoveHistory::new(),
            ledger: VelocityLedger::new(velocity.activation_count, velocity.window_ticks),
            actions: ActionState::default(),
            effects: Effects::default(),
            jump_phase: 0,
            envelope: LiftOffEnvelope::Normal,
            set_back: look,
            ticks_since_teleport: 0,
            usage: WorkaroundUsage::default(),
            violations: HashMap::new(),
        };
        session.reset(look, tick);
        session
    }

    pub fn policy(&self) -> PhysicsPolicy {
        PhysicsPolicy::resolve(&self.capabilities)
    }

    /// Respawn, teleport and world change. Violation levels survive.
    pub fn reset(&mut self, look: PlayerLook, tick: u32) {
        self.history.reset_with_marker(tick, marker_endpoint(look));
        self.ledger.clear();
        self.jump_phase = 0;
        self.envelope = LiftOffEnvelope::Normal;
        self.set_back = look;
        self.ticks_since_teleport = 0;
        self.actions.attack_slowdown = false;
        self.actions.riptide = None;
        self.usage.reset();
    }

    /// Puts the player back on the set-back after a cancelled move.
    pub fn revert(&mut self, tick: u32) {
        let set_back = self.set_back;
        self.history.reset_with_marker(tick, marker_endpoint(set_back));
        self.jump_phase = 0;
        self.ticks_since_teleport = 0;
    }

    pub fn violation_level(&self, check: &str) -> f64 {
        self.violations.get(check).map_or(0.0, ViolationLevel::value)
    }

    pub fn violation_mut(&mut self, check: &'static str) -> &mut ViolationLevel {
        self.violations.entry(check).or_default()
    }

    pub fn add_velocity(&mut self, tick: u32, velocity: DVec3, additive: bool) {
        let flags = if additive {
            VelocityFlags::ADDITIVE
        } else {
            VelocityFlags::NONE
        };
        self.ledger.add_back(tick, velocity.x, velocity.y, velocity.z, flags);
    }

    pub fn apply_action(&mut self, action: PlayerActionKind) {
        let actions = &mut self.actions;
        match action {
            PlayerActionKind::StartSprint => actions.sprinting = true,
            PlayerActionKind::StopSprint => actions.sprinting = false,
            PlayerActionKind::StartSneak => actions.sneaking = true,
            PlayerActionKind::StopSneak => actions.sneaking = false,
            PlayerActionKind::StartUseItem => actions.using_item = true,
            PlayerActionKind::StopUseItem => actions.using_item = false,
            PlayerActionKind::StartGliding => actions.gliding = true,
            PlayerActionKind::StopGliding => actions.gliding = false,
            PlayerActionKind::Attack => {
                if actions.sprinting {
                    actions.attack_slowdown = true;
                }
            }
        }
    }

    pub fn apply_effect(&mut self, effect: EffectKind, amplifier: Option<i32>) {
        let slot = match effect {
            EffectKind::Speed => &mut self.effects.speed,
            EffectKind::Slowness => &mut self.effects.slowness,
            EffectKind::JumpBoost => &mut self.effects.jump_boost,
            EffectKind::Levitation => &mut self.effects.levitation,
            EffectKind::SlowFalling => &mut self.effects.slow_falling,
        };
        *slot = amplifier;
    }

    /// Clears the one-shot toggles a move consumes.
    pub fn consume_move_toggles(&mut self) {
        self.actions.attack_slowdown = false;
        self.actions.riptide = None;
    }
}
