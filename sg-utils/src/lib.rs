use bevy::math::DVec3;
use bevy::prelude::Resource;
use crossbeam::channel::{Receiver, Sender};

pub mod chunk;
pub mod registry;
pub mod shape;
pub mod versions;

pub use chunk::{ChunkBlockCache, ChunkSection};
pub use registry::{
    BlockFlags, ShapeKind, block_bounce_factor, block_flags, block_friction, block_id_by_name,
    block_jump_factor, block_name, block_shape_kind, block_speed_factor, block_state,
    block_state_id, block_state_meta, block_stuck_multiplier, bubble_column_drags_down,
    fluid_height,
};
pub use shape::{LocalBox, append_block_collision_boxes};
pub use versions::{Capabilities, protocol_name_to_protocol_version};

pub type EntityId = i32;

/// Read-only view of the world as of the start of the tick being evaluated.
pub trait BlockCache {
    fn block_state(&self, x: i32, y: i32, z: i32) -> u16;

    /// Collision sub-boxes of the block, normalized to the block's own unit cube.
    fn block_bounds(&self, x: i32, y: i32, z: i32) -> Vec<LocalBox> {
        let mut out = Vec::new();
        let block_state = self.block_state(x, y, z);
        append_block_collision_boxes(self, block_state, x, y, z, &mut out);
        out
    }

    fn flags(&self, block_state: u16) -> BlockFlags {
        block_flags(block_state_id(block_state))
    }

    fn fluid_flow(&self, _x: i32, _y: i32, _z: i32) -> DVec3 {
        DVec3::ZERO
    }

    /// Whether a non-block entity offers footing inside the given box.
    fn has_entity_support(&self, _min: DVec3, _max: DVec3) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerLook {
    pub pos: DVec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl PlayerLook {
    pub fn new(pos: DVec3, yaw: f32, pitch: f32) -> Self {
        Self { pos, yaw, pitch }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportKind {
    #[default]
    Normal,
    /// The client split one engine tick into several packets; coordinates are exact.
    ProtocolSplit { count: u8 },
    /// The transport coalesced several ticks; intermediate coordinates are lost.
    TransportSplit { count: u8 },
}

/// Raw movement keys, only sent by clients that have the player input packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputReport {
    pub forward: i8,
    pub strafe: i8,
    pub jump: bool,
    pub sneak: bool,
    pub sprint: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionReport {
    pub entity_id: EntityId,
    pub from: PlayerLook,
    pub to: PlayerLook,
    pub tick: u32,
    pub kind: ReportKind,
    pub client_on_ground: bool,
    pub input: Option<InputReport>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerActionKind {
    StartSprint,
    StopSprint,
    StartSneak,
    StopSneak,
    StartUseItem,
    StopUseItem,
    StartGliding,
    StopGliding,
    /// Attacking while sprinting slows the player for the next tick.
    Attack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Speed,
    Slowness,
    JumpBoost,
    Levitation,
    SlowFalling,
}

/// Everything the network layer hands to the movement engine.
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Join {
        entity_id: EntityId,
        look: PlayerLook,
        tick: u32,
    },
    Teleport {
        entity_id: EntityId,
        look: PlayerLook,
        tick: u32,
    },
    Respawn {
        entity_id: EntityId,
        look: PlayerLook,
        tick: u32,
    },
    Disconnect {
        entity_id: EntityId,
    },
    Position(PositionReport),
    Velocity {
        entity_id: EntityId,
        tick: u32,
        velocity: DVec3,
        additive: bool,
    },
    Action {
        entity_id: EntityId,
        action: PlayerActionKind,
    },
    Effect {
        entity_id: EntityId,
        effect: EffectKind,
        amplifier: Option<i32>,
    },
    FoodLevel {
        entity_id: EntityId,
        food: i32,
    },
    Riptide {
        entity_id: EntityId,
        level: u8,
    },
    Shutdown,
}

#[derive(Resource, Clone)]
pub struct ReportSender(pub Sender<EngineMessage>);

#[derive(Resource, Clone)]
pub struct ReportReceiver(pub Receiver<EngineMessage>);

pub fn report_channel() -> (ReportSender, ReportReceiver) {
    let (tx, rx) = crossbeam::channel::unbounded();
    (ReportSender(tx), ReportReceiver(rx))
}
