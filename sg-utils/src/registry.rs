//! Static block table: ids, names, collision shape kinds and the semantic flags the movement
//! checks care about. Block states are packed as `id << 4 | meta`.

use std::ops::{BitOr, BitOrAssign};

pub const AIR: u16 = 0;
pub const STONE: u16 = 1;
pub const GRASS: u16 = 2;
pub const DIRT: u16 = 3;
pub const FLOWING_WATER: u16 = 8;
pub const WATER: u16 = 9;
pub const FLOWING_LAVA: u16 = 10;
pub const LAVA: u16 = 11;
pub const SAND: u16 = 12;
pub const BED: u16 = 26;
pub const COBWEB: u16 = 30;
pub const STONE_SLAB: u16 = 44;
pub const OAK_STAIRS: u16 = 53;
pub const CHEST: u16 = 54;
pub const LADDER: u16 = 65;
pub const SNOW_LAYER: u16 = 78;
pub const ICE: u16 = 79;
pub const CACTUS: u16 = 81;
pub const OAK_FENCE: u16 = 85;
pub const SOUL_SAND: u16 = 88;
pub const TRAPDOOR: u16 = 96;
pub const IRON_BARS: u16 = 101;
pub const GLASS_PANE: u16 = 102;
pub const VINE: u16 = 106;
pub const FENCE_GATE: u16 = 107;
pub const LILY_PAD: u16 = 111;
pub const COBBLESTONE_WALL: u16 = 139;
pub const SLIME_BLOCK: u16 = 165;
pub const CARPET: u16 = 171;
pub const PACKED_ICE: u16 = 174;
pub const HONEY_BLOCK: u16 = 200;
pub const POWDER_SNOW: u16 = 201;
pub const SWEET_BERRY_BUSH: u16 = 202;
pub const BUBBLE_COLUMN: u16 = 203;
pub const BLUE_ICE: u16 = 204;
pub const SCAFFOLDING: u16 = 205;

pub const DEFAULT_FRICTION: f64 = 0.6;

#[inline]
pub fn block_state(id: u16, meta: u8) -> u16 {
    (id << 4) | u16::from(meta & 0xF)
}

#[inline]
pub fn block_state_id(block_state: u16) -> u16 {
    block_state >> 4
}

#[inline]
pub fn block_state_meta(block_state: u16) -> u8 {
    (block_state & 0xF) as u8
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockFlags(u32);

impl BlockFlags {
    pub const NONE: Self = Self(0);
    /// Has at least one collision box.
    pub const SOLID: Self = Self(1 << 0);
    pub const CLIMBABLE: Self = Self(1 << 1);
    pub const WATER: Self = Self(1 << 2);
    pub const LAVA: Self = Self(1 << 3);
    /// Reverses downward velocity on landing.
    pub const BOUNCY: Self = Self(1 << 4);
    /// Slows entities standing on or inside it (honey).
    pub const STICKY: Self = Self(1 << 5);
    /// Can be stood on even though the shape is not a full cube.
    pub const GROUND: Self = Self(1 << 6);
    /// No collision at all.
    pub const PASSABLE: Self = Self(1 << 7);
    pub const STAIRS: Self = Self(1 << 8);
    /// Collision reaches 1.5 blocks up.
    pub const FENCE: Self = Self(1 << 9);
    pub const SLAB: Self = Self(1 << 10);
    pub const WEB: Self = Self(1 << 11);
    pub const BERRY_BUSH: Self = Self(1 << 12);
    pub const POWDER_SNOW: Self = Self(1 << 13);
    pub const ICE: Self = Self(1 << 14);
    pub const BUBBLE_COLUMN: Self = Self(1 << 15);
    pub const FULL_CUBE: Self = Self(1 << 16);
    pub const SPEED_FACTOR: Self = Self(1 << 17);

    pub const LIQUID: Self = Self(Self::WATER.0 | Self::LAVA.0);
    pub const STUCK: Self = Self(Self::WEB.0 | Self::BERRY_BUSH.0 | Self::POWDER_SNOW.0);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for BlockFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BlockFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Empty,
    Full,
    Slab,
    Stairs,
    Fence,
    Pane,
    Wall,
    Custom,
}

pub fn block_shape_kind(block_id: u16) -> ShapeKind {
    match block_id {
        AIR | FLOWING_WATER | WATER | FLOWING_LAVA | LAVA | COBWEB | VINE | SWEET_BERRY_BUSH
        | POWDER_SNOW | BUBBLE_COLUMN => ShapeKind::Empty,
        STONE_SLAB => ShapeKind::Slab,
        OAK_STAIRS => ShapeKind::Stairs,
        OAK_FENCE => ShapeKind::Fence,
        IRON_BARS | GLASS_PANE => ShapeKind::Pane,
        COBBLESTONE_WALL => ShapeKind::Wall,
        BED | CHEST | LADDER | SNOW_LAYER | CACTUS | SOUL_SAND | TRAPDOOR | FENCE_GATE
        | LILY_PAD | CARPET | HONEY_BLOCK | SCAFFOLDING => ShapeKind::Custom,
        _ => ShapeKind::Full,
    }
}

pub fn block_flags(block_id: u16) -> BlockFlags {
    let base = match block_shape_kind(block_id) {
        ShapeKind::Empty => BlockFlags::PASSABLE,
        ShapeKind::Full => BlockFlags::SOLID | BlockFlags::FULL_CUBE,
        _ => BlockFlags::SOLID,
    };
    let extra = match block_id {
        FLOWING_WATER | WATER => BlockFlags::WATER,
        FLOWING_LAVA | LAVA => BlockFlags::LAVA,
        BED => BlockFlags::BOUNCY | BlockFlags::GROUND,
        SLIME_BLOCK => BlockFlags::BOUNCY,
        COBWEB => BlockFlags::WEB,
        STONE_SLAB => BlockFlags::SLAB | BlockFlags::GROUND,
        OAK_STAIRS => BlockFlags::STAIRS | BlockFlags::GROUND,
        LADDER | VINE | SCAFFOLDING => BlockFlags::CLIMBABLE | BlockFlags::GROUND,
        OAK_FENCE | COBBLESTONE_WALL | FENCE_GATE => BlockFlags::FENCE | BlockFlags::GROUND,
        ICE | PACKED_ICE | BLUE_ICE => BlockFlags::ICE,
        SOUL_SAND => BlockFlags::SPEED_FACTOR | BlockFlags::GROUND,
        HONEY_BLOCK => BlockFlags::STICKY | BlockFlags::SPEED_FACTOR | BlockFlags::GROUND,
        POWDER_SNOW => BlockFlags::POWDER_SNOW,
        SWEET_BERRY_BUSH => BlockFlags::BERRY_BUSH,
        BUBBLE_COLUMN => BlockFlags::BUBBLE_COLUMN | BlockFlags::WATER,
        SNOW_LAYER | CARPET | LILY_PAD | CHEST | CACTUS | TRAPDOOR => BlockFlags::GROUND,
        _ => BlockFlags::NONE,
    };
    base | extra
}

pub fn block_name(block_id: u16) -> &'static str {
    match block_id {
        AIR => "air",
        STONE => "stone",
        GRASS => "grass",
        DIRT => "dirt",
        FLOWING_WATER => "flowing_water",
        WATER => "water",
        FLOWING_LAVA => "flowing_lava",
        LAVA => "lava",
        SAND => "sand",
        BED => "bed",
        COBWEB => "cobweb",
        STONE_SLAB => "stone_slab",
        OAK_STAIRS => "oak_stairs",
        CHEST => "chest",
        LADDER => "ladder",
        SNOW_LAYER => "snow_layer",
        ICE => "ice",
        CACTUS => "cactus",
        OAK_FENCE => "oak_fence",
        SOUL_SAND => "soul_sand",
        TRAPDOOR => "trapdoor",
        IRON_BARS => "iron_bars",
        GLASS_PANE => "glass_pane",
        VINE => "vine",
        FENCE_GATE => "fence_gate",
        LILY_PAD => "lily_pad",
        COBBLESTONE_WALL => "cobblestone_wall",
        SLIME_BLOCK => "slime_block",
        CARPET => "carpet",
        PACKED_ICE => "packed_ice",
        HONEY_BLOCK => "honey_block",
        POWDER_SNOW => "powder_snow",
        SWEET_BERRY_BUSH => "sweet_berry_bush",
        BUBBLE_COLUMN => "bubble_column",
        BLUE_ICE => "blue_ice",
        SCAFFOLDING => "scaffolding",
        _ => "unknown",
    }
}

pub fn block_id_by_name(name: &str) -> Option<u16> {
    if name == "unknown" {
        return None;
    }
    (AIR..=SCAFFOLDING).find(|id| block_name(*id) == name)
}

/// Horizontal slipperiness of a block when stood on.
pub fn block_friction(block_id: u16) -> f64 {
    match block_id {
        ICE | PACKED_ICE => 0.98,
        BLUE_ICE => 0.989,
        SLIME_BLOCK => 0.8,
        _ => DEFAULT_FRICTION,
    }
}

/// Multiplier applied to horizontal velocity after moving on or in the block.
pub fn block_speed_factor(block_id: u16) -> f64 {
    match block_id {
        SOUL_SAND | HONEY_BLOCK => 0.4,
        _ => 1.0,
    }
}

pub fn block_jump_factor(block_id: u16) -> f64 {
    match block_id {
        HONEY_BLOCK => 0.5,
        _ => 1.0,
    }
}

/// Fraction of the downward speed returned upward on landing.
pub fn block_bounce_factor(block_id: u16) -> f64 {
    match block_id {
        SLIME_BLOCK => 1.0,
        BED => 0.66,
        _ => 0.0,
    }
}

/// Per-axis motion multiplier while inside a block that makes entities stuck.
pub fn block_stuck_multiplier(block_id: u16) -> Option<[f64; 3]> {
    match block_id {
        COBWEB => Some([0.25, 0.05, 0.25]),
        SWEET_BERRY_BUSH => Some([0.8, 0.75, 0.8]),
        POWDER_SNOW => Some([0.9, 1.5, 0.9]),
        _ => None,
    }
}

/// Height of the liquid surface inside a liquid block, from its level meta.
pub fn fluid_height(block_state: u16) -> f64 {
    let meta = block_state_meta(block_state);
    let level = if meta >= 8 { 0 } else { meta };
    1.0 - f64::from(level + 1) / 9.0
}

/// Bubble columns store "drag down" (magma below) in the low meta bit.
pub fn bubble_column_drags_down(block_state: u16) -> bool {
    block_state_meta(block_state) & 0x1 != 0
}
