//! Positional snapshot of a player with lazily evaluated medium predicates.

use std::cell::OnceCell;

use bevy::math::DVec3;
use sg_utils::{
    BlockCache, BlockFlags, block_bounce_factor, block_flags, block_friction,
    block_jump_factor, block_speed_factor, block_state_id, block_stuck_multiplier,
    bubble_column_drags_down,
};

use crate::geometry::{Aabb, COLLISION_EPSILON, WorldCollision, block_range};
use crate::medium::Medium;
use crate::policy::PhysicsPolicy;

pub const PLAYER_WIDTH: f64 = 0.6;
pub const PLAYER_HEIGHT: f64 = 1.8;
pub const PLAYER_EYE_HEIGHT: f64 = 1.62;
pub const DEFAULT_GROUND_MARGIN: f64 = 0.001;
/// Headroom a standing jump needs.
pub const HEAD_CLEARANCE: f64 = 0.42;

/// Copy-only summary of a snapshot, safe to keep after the tick is over.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveEndpoint {
    pub pos: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub in_water: bool,
    pub in_lava: bool,
    pub on_climbable: bool,
    pub in_web: bool,
    pub in_berry_bush: bool,
    pub in_powder_snow: bool,
    pub touching_honey_side: bool,
    pub on_ice: bool,
    pub on_bouncy: bool,
    pub head_obstructed: bool,
    pub flags: BlockFlags,
    pub ground_friction: f64,
    pub speed_factor: f64,
    pub jump_factor: f64,
    pub bounce_factor: f64,
    /// `Some(true)` inside a downward column, `Some(false)` inside an upward one.
    pub bubble_column: Option<bool>,
    pub fluid_flow: DVec3,
    pub stuck: Option<[f64; 3]>,
}

impl MoveEndpoint {
    pub fn in_liquid(&self) -> bool {
        self.in_water || self.in_lava
    }

    pub fn medium(&self, gliding: bool) -> Medium {
        classify_medium(
            gliding,
            self.in_water,
            self.in_lava,
            self.in_web,
            self.in_powder_snow,
            self.in_berry_bush,
            self.on_climbable,
        )
    }
}

fn classify_medium(
    gliding: bool,
    in_water: bool,
    in_lava: bool,
    in_web: bool,
    in_powder_snow: bool,
    in_berry_bush: bool,
    on_climbable: bool,
) -> Medium {
    if gliding && !in_water && !in_lava {
        Medium::Gliding
    } else if in_water {
        Medium::Water
    } else if in_lava {
        Medium::Lava
    } else if in_web {
        Medium::Web
    } else if in_powder_snow {
        Medium::PowderSnow
    } else if in_berry_bush {
        Medium::BerryBush
    } else if on_climbable {
        Medium::Climbable
    } else {
        Medium::Air
    }
}

fn ground_flags(block_state: u16) -> BlockFlags {
    block_flags(block_state_id(block_state))
}

#[derive(Default)]
struct Cache {
    on_ground: OnceCell<bool>,
    in_water: OnceCell<bool>,
    in_lava: OnceCell<bool>,
    on_climbable: OnceCell<bool>,
    flags: OnceCell<BlockFlags>,
    ground_block: OnceCell<u16>,
    feet_block: OnceCell<u16>,
    touching_honey_side: OnceCell<bool>,
    head_obstructed: OnceCell<bool>,
    bubble_column: OnceCell<Option<bool>>,
    fluid_flow: OnceCell<DVec3>,
    stuck: OnceCell<Option<[f64; 3]>>,
}

pub struct PlayerLocation<'a> {
    oracle: Option<&'a dyn BlockCache>,
    policy: PhysicsPolicy,
    pos: DVec3,
    yaw: f32,
    pitch: f32,
    width: f64,
    height: f64,
    ground_margin: f64,
    bb: Aabb,
    cache: Cache,
}

impl<'a> PlayerLocation<'a> {
    pub fn new(oracle: &'a dyn BlockCache, policy: PhysicsPolicy) -> Self {
        Self {
            oracle: Some(oracle),
            policy,
            pos: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            ground_margin: DEFAULT_GROUND_MARGIN,
            bb: Aabb::from_feet(DVec3::ZERO, PLAYER_WIDTH, PLAYER_HEIGHT),
            cache: Cache::default(),
        }
    }

    /// Moves the snapshot and drops every cached predicate.
    pub fn set(
        &mut self,
        pos: DVec3,
        yaw: f32,
        pitch: f32,
        dims: (f64, f64),
        ground_margin: f64,
    ) -> &mut Self {
        self.pos = pos;
        self.yaw = yaw;
        self.pitch = pitch;
        self.width = dims.0;
        self.height = dims.1;
        self.ground_margin = ground_margin;
        self.bb = Aabb::from_feet(pos, dims.0, dims.1);
        self.cache = Cache::default();
        self
    }

    /// Clears the oracle reference. Cached predicates stay readable.
    pub fn release(&mut self) {
        self.oracle = None;
    }

    pub fn is_released(&self) -> bool {
        self.oracle.is_none()
    }

    pub fn pos(&self) -> DVec3 {
        self.pos
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn aabb(&self) -> Aabb {
        self.bb
    }

    pub fn policy(&self) -> &PhysicsPolicy {
        &self.policy
    }

    fn oracle(&self) -> &'a dyn BlockCache {
        match self.oracle {
            Some(oracle) => oracle,
            None => panic!("location predicate queried after release"),
        }
    }

    fn cached<T: Copy>(&self, cell: &OnceCell<T>, compute: impl FnOnce(&'a dyn BlockCache) -> T) -> T {
        *cell.get_or_init(|| compute(self.oracle()))
    }

    pub fn is_on_ground(&self) -> bool {
        self.cached(&self.cache.on_ground, |oracle| {
            let query = Aabb::new(
                DVec3::new(self.bb.min.x, self.bb.min.y - self.ground_margin, self.bb.min.z),
                DVec3::new(self.bb.max.x, self.bb.min.y, self.bb.max.z),
            );
            WorldCollision::new(oracle).collides(&query)
                || oracle.has_entity_support(query.min, query.max)
        })
    }

    fn liquid_box(&self, flag: BlockFlags) -> Aabb {
        if self.policy.modern_liquids {
            return self.bb.deflate(0.001);
        }
        let shrunk = Aabb::new(
            DVec3::new(self.bb.min.x, self.bb.min.y + 0.4, self.bb.min.z),
            DVec3::new(self.bb.max.x, self.bb.max.y - 0.4, self.bb.max.z),
        );
        if flag == BlockFlags::LAVA {
            shrunk.contract(0.1, 0.0, 0.1)
        } else {
            shrunk.deflate(0.001)
        }
    }

    pub fn is_in_water(&self) -> bool {
        self.cached(&self.cache.in_water, |oracle| {
            let bb = self.liquid_box(BlockFlags::WATER);
            WorldCollision::new(oracle).aabb_has_liquid(&bb, BlockFlags::WATER)
        })
    }

    pub fn is_in_lava(&self) -> bool {
        self.cached(&self.cache.in_lava, |oracle| {
            let bb = self.liquid_box(BlockFlags::LAVA);
            WorldCollision::new(oracle).aabb_has_liquid(&bb, BlockFlags::LAVA)
        })
    }

    pub fn is_in_liquid(&self) -> bool {
        self.is_in_water() || self.is_in_lava()
    }

    pub fn is_on_climbable(&self) -> bool {
        self.cached(&self.cache.on_climbable, |oracle| {
            oracle
                .flags(self.feet_block())
                .contains(BlockFlags::CLIMBABLE)
        })
    }

    /// Flags of every block the box touches.
    pub fn flags(&self) -> BlockFlags {
        self.cached(&self.cache.flags, |oracle| {
            let bb = self.bb.deflate(0.001);
            let (min_x, max_x) = block_range(bb.min.x, bb.max.x);
            let (min_y, max_y) = block_range(bb.min.y, bb.max.y);
            let (min_z, max_z) = block_range(bb.min.z, bb.max.z);
            let mut flags = BlockFlags::NONE;
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    for x in min_x..=max_x {
                        flags |= oracle.flags(oracle.block_state(x, y, z));
                    }
                }
            }
            flags
        })
    }

    pub fn is_in_web(&self) -> bool {
        self.flags().contains(BlockFlags::WEB)
    }

    pub fn is_in_berry_bush(&self) -> bool {
        self.policy.berry_bush && self.flags().contains(BlockFlags::BERRY_BUSH)
    }

    pub fn is_in_powder_snow(&self) -> bool {
        self.policy.powder_snow && self.flags().contains(BlockFlags::POWDER_SNOW)
    }

    /// Block state under the feet that decides friction and bounce.
    pub fn ground_block(&self) -> u16 {
        self.cached(&self.cache.ground_block, |oracle| {
            let x = self.pos.x.floor() as i32;
            let y = (self.pos.y - 0.500_000_1).floor() as i32;
            let z = self.pos.z.floor() as i32;
            oracle.block_state(x, y, z)
        })
    }

    fn feet_block(&self) -> u16 {
        self.cached(&self.cache.feet_block, |oracle| {
            let x = self.pos.x.floor() as i32;
            let y = self.pos.y.floor() as i32;
            let z = self.pos.z.floor() as i32;
            oracle.block_state(x, y, z)
        })
    }

    pub fn is_on_ice(&self) -> bool {
        ground_flags(self.ground_block()).contains(BlockFlags::ICE)
    }

    pub fn is_on_bouncy(&self) -> bool {
        ground_flags(self.ground_block()).contains(BlockFlags::BOUNCY)
    }

    pub fn ground_friction(&self) -> f64 {
        block_friction(block_state_id(self.ground_block()))
    }

    /// Feet block wins when it slows, otherwise the block underneath decides.
    pub fn speed_factor(&self) -> f64 {
        let feet = block_state_id(self.feet_block());
        let factor = block_speed_factor(feet);
        if factor != 1.0 {
            return factor;
        }
        block_speed_factor(block_state_id(self.ground_block()))
    }

    pub fn jump_factor(&self) -> f64 {
        if !self.policy.honey {
            return 1.0;
        }
        let feet = block_jump_factor(block_state_id(self.feet_block()));
        if feet != 1.0 {
            return feet;
        }
        block_jump_factor(block_state_id(self.ground_block()))
    }

    pub fn bounce_factor(&self) -> f64 {
        block_bounce_factor(block_state_id(self.ground_block()))
    }

    pub fn touching_honey_side(&self) -> bool {
        if !self.policy.honey {
            return false;
        }
        self.cached(&self.cache.touching_honey_side, |oracle| {
            let probe = self.bb.contract(-0.01, 0.0, -0.01);
            let (min_x, max_x) = block_range(probe.min.x, probe.max.x);
            let (min_y, max_y) = block_range(probe.min.y, probe.max.y);
            let (min_z, max_z) = block_range(probe.min.z, probe.max.z);
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    for x in min_x..=max_x {
                        let flags = oracle.flags(oracle.block_state(x, y, z));
                        if !flags.contains(BlockFlags::STICKY) {
                            continue;
                        }
                        // Standing on top is not sliding.
                        if self.pos.y > f64::from(y) + 0.9375 - COLLISION_EPSILON {
                            continue;
                        }
                        return true;
                    }
                }
            }
            false
        })
    }

    /// Sliding down the side of a honey block with the given vertical velocity.
    pub fn is_sliding_down(&self, vy: f64) -> bool {
        !self.is_on_ground() && vy < -0.08 && self.touching_honey_side()
    }

    pub fn is_head_obstructed(&self) -> bool {
        self.cached(&self.cache.head_obstructed, |oracle| {
            let query = Aabb::new(
                DVec3::new(self.bb.min.x, self.bb.max.y, self.bb.min.z),
                DVec3::new(self.bb.max.x, self.bb.max.y + HEAD_CLEARANCE, self.bb.max.z),
            );
            WorldCollision::new(oracle).collides(&query)
        })
    }

    pub fn bubble_column(&self) -> Option<bool> {
        if !self.policy.bubble_columns {
            return None;
        }
        self.cached(&self.cache.bubble_column, |oracle| {
            let (min_x, max_x) = block_range(self.bb.min.x, self.bb.max.x);
            let (min_y, max_y) = block_range(self.bb.min.y, self.bb.max.y);
            let (min_z, max_z) = block_range(self.bb.min.z, self.bb.max.z);
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    for x in min_x..=max_x {
                        let block_state = oracle.block_state(x, y, z);
                        if oracle.flags(block_state).contains(BlockFlags::BUBBLE_COLUMN) {
                            return Some(bubble_column_drags_down(block_state));
                        }
                    }
                }
            }
            None
        })
    }

    /// Normalized sum of the flow vectors of touched liquid blocks.
    pub fn fluid_flow(&self) -> DVec3 {
        self.cached(&self.cache.fluid_flow, |oracle| {
            let bb = self.bb.deflate(0.001);
            let (min_x, max_x) = block_range(bb.min.x, bb.max.x);
            let (min_y, max_y) = block_range(bb.min.y, bb.max.y);
            let (min_z, max_z) = block_range(bb.min.z, bb.max.z);
            let mut sum = DVec3::ZERO;
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    for x in min_x..=max_x {
                        let flags = oracle.flags(oracle.block_state(x, y, z));
                        if flags.intersects(BlockFlags::LIQUID) {
                            sum += oracle.fluid_flow(x, y, z);
                        }
                    }
                }
            }
            sum.try_normalize().unwrap_or(DVec3::ZERO)
        })
    }

    /// Per-axis multiplier of the block the player is stuck in, web first.
    pub fn stuck_multiplier(&self) -> Option<[f64; 3]> {
        self.cached(&self.cache.stuck, |oracle| {
            let bb = self.bb.deflate(0.001);
            let (min_x, max_x) = block_range(bb.min.x, bb.max.x);
            let (min_y, max_y) = block_range(bb.min.y, bb.max.y);
            let (min_z, max_z) = block_range(bb.min.z, bb.max.z);
            let mut found: Option<(u8, [f64; 3])> = None;
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    for x in min_x..=max_x {
                        let block_state = oracle.block_state(x, y, z);
                        let flags = oracle.flags(block_state);
                        let rank = if flags.contains(BlockFlags::WEB) {
                            0
                        } else if flags.contains(BlockFlags::POWDER_SNOW) && self.policy.powder_snow {
                            1
                        } else if flags.contains(BlockFlags::BERRY_BUSH) && self.policy.berry_bush {
                            2
                        } else {
                            continue;
                        };
                        let Some(multiplier) = block_stuck_multiplier(block_state_id(block_state)) else {
                            continue;
                        };
                        if found.is_none_or(|(best, _)| rank < best) {
                            found = Some((rank, multiplier));
                        }
                    }
                }
            }
            found.map(|(_, multiplier)| multiplier)
        })
    }

    pub fn medium(&self, gliding: bool) -> Medium {
        classify_medium(
            gliding && self.policy.elytra,
            self.is_in_water(),
            self.is_in_lava(),
            self.is_in_web(),
            self.is_in_powder_snow(),
            self.is_in_berry_bush(),
            self.is_on_climbable(),
        )
    }

    /// Evaluates every predicate and copies the results out.
    pub fn summarize(&self) -> MoveEndpoint {
        MoveEndpoint {
            pos: self.pos,
            yaw: self.yaw,
            pitch: self.pitch,
            on_ground: self.is_on_ground(),
            in_water: self.is_in_water(),
            in_lava: self.is_in_lava(),
            on_climbable: self.is_on_climbable(),
            in_web: self.is_in_web(),
            in_berry_bush: self.is_in_berry_bush(),
            in_powder_snow: self.is_in_powder_snow(),
            touching_honey_side: self.touching_honey_side(),
            on_ice: self.is_on_ice(),
            on_bouncy: self.is_on_bouncy(),
            head_obstructed: self.is_head_obstructed(),
            flags: self.flags(),
            ground_friction: self.ground_friction(),
            speed_factor: self.speed_factor(),
            jump_factor: self.jump_factor(),
            bounce_factor: self.bounce_factor(),
            bubble_column: self.bubble_column(),
            fluid_flow: self.fluid_flow(),
            stuck: self.stuck_multiplier(),
        }
    }
}
