//! Recorded movement in JSON: a block world plus the messages the network layer would
//! have produced, in order.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use bevy::math::DVec3;
use crossbeam::channel::SendError;
use serde::Deserialize;
use sg_utils::{
    ChunkBlockCache, EffectKind, EngineMessage, EntityId, InputReport, PlayerActionKind,
    PlayerLook, PositionReport, ReportKind, ReportSender, block_id_by_name, block_state,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse scenario {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown block `{0}`")]
    UnknownBlock(String),
    #[error("entity {0} moves before it joined")]
    NotJoined(EntityId),
    #[error("engine channel closed")]
    ChannelClosed(#[from] SendError<EngineMessage>),
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub world: WorldSpec,
    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorldSpec {
    pub fills: Vec<BlockFill>,
    pub blocks: Vec<BlockPlacement>,
}

/// Inclusive cuboid of one block.
#[derive(Debug, Deserialize)]
pub struct BlockFill {
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub block: String,
    #[serde(default)]
    pub meta: u8,
}

#[derive(Debug, Deserialize)]
pub struct BlockPlacement {
    pub pos: [i32; 3],
    pub block: String,
    #[serde(default)]
    pub meta: u8,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSpec {
    #[default]
    Normal,
    ProtocolSplit {
        count: u8,
    },
    TransportSplit {
        count: u8,
    },
}

impl From<SplitSpec> for ReportKind {
    fn from(split: SplitSpec) -> Self {
        match split {
            SplitSpec::Normal => ReportKind::Normal,
            SplitSpec::ProtocolSplit { count } => ReportKind::ProtocolSplit { count },
            SplitSpec::TransportSplit { count } => ReportKind::TransportSplit { count },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InputSpec {
    pub forward: i8,
    pub strafe: i8,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
}

impl From<InputSpec> for InputReport {
    fn from(input: InputSpec) -> Self {
        InputReport {
            forward: input.forward.signum(),
            strafe: input.strafe.signum(),
            jump: input.jump,
            sneak: input.sneak,
            sprint: input.sprint,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    StartSprint,
    StopSprint,
    StartSneak,
    StopSneak,
    StartUseItem,
    StopUseItem,
    StartGliding,
    StopGliding,
    Attack,
}

impl From<ActionSpec> for PlayerActionKind {
    fn from(action: ActionSpec) -> Self {
        match action {
            ActionSpec::StartSprint => PlayerActionKind::StartSprint,
            ActionSpec::StopSprint => PlayerActionKind::StopSprint,
            ActionSpec::StartSneak => PlayerActionKind::StartSneak,
            ActionSpec::StopSneak => PlayerActionKind::StopSneak,
            ActionSpec::StartUseItem => PlayerActionKind::StartUseItem,
            ActionSpec::StopUseItem => PlayerActionKind::StopUseItem,
            ActionSpec::StartGliding => PlayerActionKind::StartGliding,
            ActionSpec::StopGliding => PlayerActionKind::StopGliding,
            ActionSpec::Attack => PlayerActionKind::Attack,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSpec {
    Speed,
    Slowness,
    JumpBoost,
    Levitation,
    SlowFalling,
}

impl From<EffectSpec> for EffectKind {
    fn from(effect: EffectSpec) -> Self {
        match effect {
            EffectSpec::Speed => EffectKind::Speed,
            EffectSpec::Slowness => EffectKind::Slowness,
            EffectSpec::JumpBoost => EffectKind::JumpBoost,
            EffectSpec::Levitation => EffectKind::Levitation,
            EffectSpec::SlowFalling => EffectKind::SlowFalling,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Join {
        entity: EntityId,
        pos: [f64; 3],
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        pitch: f32,
    },
    Teleport {
        entity: EntityId,
        pos: [f64; 3],
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        pitch: f32,
    },
    Respawn {
        entity: EntityId,
        pos: [f64; 3],
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        pitch: f32,
    },
    Disconnect {
        entity: EntityId,
    },
    /// One position packet; starts where the entity's previous one ended.
    Move {
        entity: EntityId,
        to: [f64; 3],
        yaw: Option<f32>,
        pitch: Option<f32>,
        #[serde(default)]
        on_ground: bool,
        #[serde(default)]
        split: SplitSpec,
        input: Option<InputSpec>,
    },
    Velocity {
        entity: EntityId,
        velocity: [f64; 3],
        #[serde(default)]
        additive: bool,
    },
    Action {
        entity: EntityId,
        action: ActionSpec,
    },
    Effect {
        entity: EntityId,
        effect: EffectSpec,
        amplifier: Option<i32>,
    },
    Food {
        entity: EntityId,
        level: i32,
    },
    Riptide {
        entity: EntityId,
        level: u8,
    },
}

fn vec3(v: [f64; 3]) -> DVec3 {
    DVec3::new(v[0], v[1], v[2])
}

fn state_by_name(name: &str, meta: u8) -> Result<u16, ScenarioError> {
    block_id_by_name(name)
        .map(|id| block_state(id, meta))
        .ok_or_else(|| ScenarioError::UnknownBlock(name.to_string()))
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_json_str(content: &str) -> Result<Self, ScenarioError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(content).map_err(|source| ScenarioError::Json {
            path: path.to_string(),
            source,
        })
    }

    /// Fills first, then single blocks on top.
    pub fn build_world(&self) -> Result<ChunkBlockCache, ScenarioError> {
        let mut world = ChunkBlockCache::default();
        for fill in &self.world.fills {
            let state = state_by_name(&fill.block, fill.meta)?;
            world.fill(
                (fill.min[0], fill.min[1], fill.min[2]),
                (fill.max[0], fill.max[1], fill.max[2]),
                state,
            );
        }
        for block in &self.world.blocks {
            let state = state_by_name(&block.block, block.meta)?;
            world.set_block(block.pos[0], block.pos[1], block.pos[2], state);
        }
        Ok(world)
    }

    /// Turns the events into engine messages. Every move advances the clock by one tick;
    /// other events are stamped with the current tick.
    pub fn messages(&self) -> Result<Vec<EngineMessage>, ScenarioError> {
        let mut tick = 0u32;
        let mut last: HashMap<EntityId, PlayerLook> = HashMap::new();
        let mut out = Vec::with_capacity(self.events.len());

        for event in &self.events {
            let message = match *event {
                ScenarioEvent::Join {
                    entity,
                    pos,
                    yaw,
                    pitch,
                } => {
                    let look = PlayerLook::new(vec3(pos), yaw, pitch);
                    last.insert(entity, look);
                    EngineMessage::Join {
                        entity_id: entity,
                        look,
                        tick,
                    }
                }
                ScenarioEvent::Teleport {
                    entity,
                    pos,
                    yaw,
                    pitch,
                } => {
                    let look = PlayerLook::new(vec3(pos), yaw, pitch);
                    last.insert(entity, look);
                    EngineMessage::Teleport {
                        entity_id: entity,
                        look,
                        tick,
                    }
                }
                ScenarioEvent::Respawn {
                    entity,
                    pos,
                    yaw,
                    pitch,
                } => {
                    let look = PlayerLook::new(vec3(pos), yaw, pitch);
                    last.insert(entity, look);
                    EngineMessage::Respawn {
                        entity_id: entity,
                        look,
                        tick,
                    }
                }
                ScenarioEvent::Disconnect { entity } => {
                    last.remove(&entity);
                    EngineMessage::Disconnect { entity_id: entity }
                }
                ScenarioEvent::Move {
                    entity,
                    to,
                    yaw,
                    pitch,
                    on_ground,
                    split,
                    input,
                } => {
                    let from = *last.get(&entity).ok_or(ScenarioError::NotJoined(entity))?;
                    let to = PlayerLook::new(vec3(to), yaw.unwrap_or(from.yaw), pitch.unwrap_or(from.pitch));
                    last.insert(entity, to);
                    tick += 1;
                    EngineMessage::Position(PositionReport {
                        entity_id: entity,
                        from,
                        to,
                        tick,
                        kind: split.into(),
                        client_on_ground: on_ground,
                        input: input.map(InputReport::from),
                    })
                }
                ScenarioEvent::Velocity {
                    entity,
                    velocity,
                    additive,
                } => EngineMessage::Velocity {
                    entity_id: entity,
                    tick,
                    velocity: vec3(velocity),
                    additive,
                },
                ScenarioEvent::Action { entity, action } => EngineMessage::Action {
                    entity_id: entity,
                    action: action.into(),
                },
                ScenarioEvent::Effect {
                    entity,
                    effect,
                    amplifier,
                } => EngineMessage::Effect {
                    entity_id: entity,
                    effect: effect.into(),
                    amplifier,
                },
                ScenarioEvent::Food { entity, level } => EngineMessage::FoodLevel {
                    entity_id: entity,
                    food: level,
                },
                ScenarioEvent::Riptide { entity, level } => EngineMessage::Riptide {
                    entity_id: entity,
                    level,
                },
            };
            out.push(message);
        }
        Ok(out)
    }
}

/// Sends every message, then `Shutdown`. Returns how many moves were sent.
pub fn stream(scenario: &Scenario, sender: &ReportSender) -> Result<usize, ScenarioError> {
    let messages = scenario.messages()?;
    let mut moves = 0;
    for message in messages {
        if matches!(message, EngineMessage::Position(_)) {
            moves += 1;
        }
        sender.0.send(message)?;
    }
    sender.0.send(EngineMessage::Shutdown)?;
    debug!(moves, "scenario streamed");
    Ok(moves)
}
