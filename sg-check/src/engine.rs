//! The moving check: every inbound message goes through [`MovingEngine::handle`].

use std::collections::HashMap;

use bevy::math::DVec3;
use bevy::prelude::Resource;
use sg_sim::location::{PLAYER_EYE_HEIGHT, PLAYER_HEIGHT, PLAYER_WIDTH};
use sg_sim::{
    LiftOffEnvelope, MoveContext, MoveData, PlayerLocation, RayHit, SplitKind, VelocityFlags,
    WorkaroundRegistry, WorldBorder, WorldCollision, is_oversized, predict_move, reject_oversized,
};
use sg_utils::{BlockCache, BlockFlags, Capabilities, EngineMessage, EntityId, PositionReport};
use tracing::{debug, info, warn};

use crate::adjudicator::{Adjudicator, Decision, Finding, ViolationPolicy};
use crate::config::{ConfigError, EngineConfig};
use crate::session::PlayerSession;
use crate::sink::ViolationSink;

pub const SPEED_CHECK: &str = "moving.speed";
pub const PASSABLE_CHECK: &str = "moving.passable";
/// Feet ray height above the floor, clear of carpets and snow layers.
const PASSABLE_FEET_OFFSET: f64 = 0.0625;
const PASSABLE_MIN_SEVERITY: f64 = 0.01;

/// Outcome of one evaluated move.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub entity_id: EntityId,
    pub tick: u32,
    pub h_excess: f64,
    pub y_excess: f64,
    pub passable: Option<RayHit>,
    /// Speed violation level after this move.
    pub level: f64,
    pub decision: Decision,
    pub workarounds: Vec<&'static str>,
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        self.h_excess > 0.0 || self.y_excess > 0.0 || self.passable.is_some()
    }
}

#[derive(Resource)]
pub struct MovingEngine {
    config: EngineConfig,
    capabilities: Capabilities,
    registry: WorkaroundRegistry,
    adjudicator: Adjudicator,
    border: Option<WorldBorder>,
    sessions: HashMap<EntityId, PlayerSession>,
    shutdown: bool,
}

impl MovingEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let capabilities = config.capabilities.resolve()?;
        let registry = config.moving.workarounds.build_registry()?;
        Ok(Self {
            capabilities,
            registry,
            adjudicator: Adjudicator::new(ViolationPolicy::from(&config.moving.violation)),
            border: config.moving.border.map(WorldBorder::from),
            sessions: HashMap::new(),
            shutdown: false,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkaroundRegistry {
        &self.registry
    }

    pub fn session(&self, entity_id: EntityId) -> Option<&PlayerSession> {
        self.sessions.get(&entity_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Overrides the configured versions for one connection.
    pub fn set_capabilities(&mut self, entity_id: EntityId, capabilities: Capabilities) -> bool {
        match self.sessions.get_mut(&entity_id) {
            Some(session) => {
                session.capabilities = capabilities;
                true
            }
            None => false,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }

    fn session_mut(&mut self, entity_id: EntityId) -> Option<&mut PlayerSession> {
        let session = self.sessions.get_mut(&entity_id);
        if session.is_none() {
            warn!(entity_id, "message for unknown player");
        }
        session
    }

    /// Applies one message. Only position reports produce a verdict.
    pub fn handle(
        &mut self,
        message: EngineMessage,
        world: &dyn BlockCache,
        sink: &mut dyn ViolationSink,
    ) -> Option<Verdict> {
        match message {
            EngineMessage::Join { entity_id, look, tick } => {
                let session =
                    PlayerSession::new(entity_id, look, tick, self.capabilities, &self.config.moving.velocity);
                self.sessions.insert(entity_id, session);
                info!(entity_id, tick, "player joined");
            }
            EngineMessage::Teleport { entity_id, look, tick }
            | EngineMessage::Respawn { entity_id, look, tick } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.reset(look, tick);
                    info!(entity_id, tick, "session reset");
                }
            }
            EngineMessage::Disconnect { entity_id } => {
                if self.sessions.remove(&entity_id).is_some() {
                    info!(entity_id, "player left");
                }
            }
            EngineMessage::Position(report) => return self.process_move(&report, world, sink),
            EngineMessage::Velocity {
                entity_id,
                tick,
                velocity,
                additive,
            } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.add_velocity(tick, velocity, additive);
                    debug!(entity_id, tick, x = velocity.x, y = velocity.y, z = velocity.z, additive, "velocity queued");
                }
            }
            EngineMessage::Action { entity_id, action } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.apply_action(action);
                }
            }
            EngineMessage::Effect {
                entity_id,
                effect,
                amplifier,
            } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.apply_effect(effect, amplifier);
                }
            }
            EngineMessage::FoodLevel { entity_id, food } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.actions.food = food;
                }
            }
            EngineMessage::Riptide { entity_id, level } => {
                if let Some(session) = self.session_mut(entity_id) {
                    session.actions.riptide = Some(level);
                }
            }
            EngineMessage::Shutdown => {
                self.shutdown = true;
                info!(sessions = self.sessions.len(), "engine shutting down");
            }
        }
        None
    }

    pub fn process_move(
        &mut self,
        report: &PositionReport,
        world: &dyn BlockCache,
        sink: &mut dyn ViolationSink,
    ) -> Option<Verdict> {
        if !self.config.moving.enabled {
            return None;
        }
        let capabilities = self.capabilities;
        let velocity = self.config.moving.velocity;
        let session = self.sessions.entry(report.entity_id).or_insert_with(|| {
            info!(entity_id = report.entity_id, "session opened by first move");
            PlayerSession::new(report.entity_id, report.from, report.tick, capabilities, &velocity)
        });
        let policy = session.policy();
        let margin = self.config.moving.ground_margin;
        if session.ledger.has_any() {
            session.ledger.remove_invalid(report.tick);
        }

        let mut from = PlayerLocation::new(world, policy);
        from.set(report.from.pos, report.from.yaw, report.from.pitch, (PLAYER_WIDTH, PLAYER_HEIGHT), margin);
        let mut to = PlayerLocation::new(world, policy);
        to.set(report.to.pos, report.to.yaw, report.to.pitch, (PLAYER_WIDTH, PLAYER_HEIGHT), margin);
        let collision = WorldCollision::new(world).with_border(self.border);
        let (split_kind, multi_move_count) = SplitKind::from_report(report.kind);
        let observed = report.to.pos - report.from.pos;
        let max_distance = self.config.moving.max_move_distance;
        let oversized = is_oversized(observed, max_distance);

        let prediction = if oversized {
            debug!(entity_id = report.entity_id, distance = observed.length(), "move too long to replay");
            let current = session.history.current_mut();
            current.set(report.tick, from.summarize(), to.summarize());
            reject_oversized(observed, max_distance, current)
        } else {
            let ctx = MoveContext {
                from: &from,
                to: &to,
                world: &collision,
                policy,
                actions: session.actions,
                effects: session.effects,
                prior: session.history.valid_prior().copied(),
                second_prior: session.history.second_past().filter(|m| m.to_is_valid).copied(),
                jump_phase: session.jump_phase,
                envelope: session.envelope,
                ticks_since_teleport: session.ticks_since_teleport,
                input: report.input.filter(|_| policy.input_packet),
                strict_horizontal: self.config.moving.strict_horizontal,
                split_kind,
                multi_move_count,
            };
            let current = session.history.current_mut();
            current.set(report.tick, from.summarize(), to.summarize());
            predict_move(&self.registry, &ctx, current, &mut session.ledger)
        };
        let current = *session.history.current();

        let passable = if self.config.moving.passable && !oversized && split_kind != SplitKind::TransportSplit {
            passable_hit(&collision, &from, &to)
        } else {
            None
        };
        from.release();
        to.release();

        if let Some(bounce) = landing_bounce(&current) {
            session.ledger.add_front(report.tick, 0.0, bounce, 0.0, VelocityFlags::INTERNAL);
            debug!(entity_id = report.entity_id, bounce, "bounce queued");
        }
        session.jump_phase = next_jump_phase(&current, session.jump_phase);
        session.envelope = next_envelope(&current, session.envelope);

        let speed = Finding {
            entity_id: report.entity_id,
            check: SPEED_CHECK,
            severity: prediction.severity(),
            airborne: !current.to.on_ground,
            set_back: session.set_back,
        };
        let passable_finding = Finding {
            check: PASSABLE_CHECK,
            severity: passable.map_or(0.0, |hit| report.to.pos.distance(hit.point).max(PASSABLE_MIN_SEVERITY)),
            ..speed
        };
        let decision = self
            .adjudicator
            .record(speed, session.violation_mut(SPEED_CHECK), sink)
            .or(self
                .adjudicator
                .record(passable_finding, session.violation_mut(PASSABLE_CHECK), sink));

        if session.actions.sprinting && prediction.h_excess() <= 0.0 && current.ends_sprint() {
            session.actions.sprinting = false;
            debug!(
                entity_id = report.entity_id,
                strafe = ?current.strafe_impulse,
                forward = ?current.forward_impulse,
                "sprint ended without a forward key"
            );
        }
        session.usage = prediction.usage.clone();
        session.consume_move_toggles();
        match decision {
            Decision::Revert(set_back) => {
                warn!(
                    entity_id = report.entity_id,
                    tick = report.tick,
                    h_excess = prediction.h_excess(),
                    y_excess = prediction.y_excess(),
                    x = set_back.look.pos.x,
                    y = set_back.look.pos.y,
                    z = set_back.look.pos.z,
                    pending_horizontal = ?session.ledger.peek_horizontal().map(|entry| entry.value),
                    pending_vertical = ?session.ledger.peek_vertical().map(|entry| entry.value),
                    "move reverted"
                );
                session.revert(report.tick);
            }
            Decision::Allow => {
                if !prediction.is_violation() && passable.is_none() && current.to.on_ground {
                    session.set_back = report.to;
                }
                session.history.advance();
                session.ticks_since_teleport = session.ticks_since_teleport.saturating_add(1);
            }
        }

        Some(Verdict {
            entity_id: report.entity_id,
            tick: report.tick,
            h_excess: prediction.h_excess(),
            y_excess: prediction.y_excess(),
            passable,
            level: session.violation_level(SPEED_CHECK),
            decision,
            workarounds: prediction.usage.names().to_vec(),
        })
    }
}

/// Straight segments at the feet and at the eyes that cross a full block, while
/// neither endpoint is inside one.
fn passable_hit(
    collision: &WorldCollision<'_>,
    from: &PlayerLocation<'_>,
    to: &PlayerLocation<'_>,
) -> Option<RayHit> {
    if collision.collides(&from.aabb()) || collision.collides(&to.aabb()) {
        return None;
    }
    let oracle = collision.oracle();
    [PASSABLE_FEET_OFFSET, PLAYER_EYE_HEIGHT]
        .into_iter()
        .find_map(|height| {
            let offset = DVec3::Y * height;
            let hit = collision.ray_trace(from.pos() + offset, to.pos() + offset)?;
            let state = oracle.block_state(hit.block.x, hit.block.y, hit.block.z);
            oracle
                .flags(state)
                .contains(BlockFlags::FULL_CUBE)
                .then_some(hit)
        })
}

/// Upward speed the client gets back from landing on a bouncy block.
fn landing_bounce(current: &MoveData) -> Option<f64> {
    let to = &current.to;
    if !to.on_bouncy || !to.on_ground || current.y_distance >= 0.0 || current.sneaking {
        return None;
    }
    let bounce = -current.y_motion.min(current.y_distance) * to.bounce_factor;
    (bounce > 0.0).then_some(bounce)
}

/// Airborne moves since the last ground contact; a jump starts the count at one.
fn next_jump_phase(current: &MoveData, phase: u32) -> u32 {
    if current.is_jump {
        1
    } else if current.to.on_ground {
        0
    } else {
        phase.saturating_add(1)
    }
}

/// The envelope follows the surroundings while grounded or inside a limiting medium,
/// and is carried over while airborne.
fn next_envelope(current: &MoveData, envelope: LiftOffEnvelope) -> LiftOffEnvelope {
    let here = LiftOffEnvelope::classify(&current.to);
    if current.to.on_ground || here != LiftOffEnvelope::Normal {
        here
    } else {
        envelope
    }
}
