use crate::BlockCache;
use crate::registry::{
    BED, CACTUS, CARPET, CHEST, COBBLESTONE_WALL, FENCE_GATE, FLOWING_LAVA, FLOWING_WATER,
    GLASS_PANE, HONEY_BLOCK, IRON_BARS, LADDER, LAVA, LILY_PAD, SCAFFOLDING, SNOW_LAYER,
    SOUL_SAND, ShapeKind, TRAPDOOR, WATER, block_flags, block_shape_kind, block_state_id,
    block_state_meta,
};

/// A collision sub-box in block-local coordinates (0..1, fences reach 1.5).
pub type LocalBox = ([f64; 3], [f64; 3]);

const FULL: LocalBox = ([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);

/// Appends every collision sub-box of the block at the given position. Neighbour lookups go
/// through the cache because fences, panes and walls connect to adjacent blocks.
pub fn append_block_collision_boxes<C: BlockCache + ?Sized>(
    cache: &C,
    block_state: u16,
    block_x: i32,
    block_y: i32,
    block_z: i32,
    out: &mut Vec<LocalBox>,
) {
    let block_id = block_state_id(block_state);
    let meta = block_state_meta(block_state);
    match block_shape_kind(block_id) {
        ShapeKind::Empty => {}
        ShapeKind::Full => out.push(FULL),
        ShapeKind::Slab => {
            if meta & 0x8 != 0 {
                out.push(([0.0, 0.5, 0.0], [1.0, 1.0, 1.0]));
            } else {
                out.push(([0.0, 0.0, 0.0], [1.0, 0.5, 1.0]));
            }
        }
        ShapeKind::Stairs => append_stair_boxes(meta, out),
        ShapeKind::Fence => {
            let connect = connections(cache, block_x, block_y, block_z, fence_connects_to);
            out.push(([0.375, 0.0, 0.375], [0.625, 1.5, 0.625]));
            push_arms(connect, 0.375, 0.625, 1.5, out);
        }
        ShapeKind::Pane => {
            let connect = connections(cache, block_x, block_y, block_z, pane_connects_to);
            let has_x = connect.east || connect.west;
            let has_z = connect.north || connect.south;
            if !has_x || !has_z {
                out.push(([0.4375, 0.0, 0.4375], [0.5625, 1.0, 0.5625]));
            }
            push_arms(connect, 0.4375, 0.5625, 1.0, out);
        }
        ShapeKind::Wall => {
            let connect = connections(cache, block_x, block_y, block_z, wall_connects_to);
            // Wall collision is raised to fence height.
            out.push(([0.25, 0.0, 0.25], [0.75, 1.5, 0.75]));
            push_arms(connect, 0.3125, 0.6875, 1.5, out);
        }
        ShapeKind::Custom => append_custom_boxes(block_id, meta, out),
    }
}

fn append_stair_boxes(meta: u8, out: &mut Vec<LocalBox>) {
    let top = meta & 0x4 != 0;
    let facing = meta & 0x3;

    if top {
        out.push(([0.0, 0.5, 0.0], [1.0, 1.0, 1.0]));
    } else {
        out.push(([0.0, 0.0, 0.0], [1.0, 0.5, 1.0]));
    }

    let (min_x, max_x, min_z, max_z) = match facing {
        0 => (0.5, 1.0, 0.0, 1.0), // east
        1 => (0.0, 0.5, 0.0, 1.0), // west
        2 => (0.0, 1.0, 0.5, 1.0), // south
        _ => (0.0, 1.0, 0.0, 0.5), // north
    };
    if top {
        out.push(([min_x, 0.0, min_z], [max_x, 0.5, max_z]));
    } else {
        out.push(([min_x, 0.5, min_z], [max_x, 1.0, max_z]));
    }
}

fn append_custom_boxes(block_id: u16, meta: u8, out: &mut Vec<LocalBox>) {
    let sixteenth = 1.0 / 16.0;
    match block_id {
        CHEST => out.push((
            [sixteenth, 0.0, sixteenth],
            [15.0 * sixteenth, 14.0 * sixteenth, 15.0 * sixteenth],
        )),
        BED => out.push(([0.0, 0.0, 0.0], [1.0, 9.0 * sixteenth, 1.0])),
        CARPET => out.push(([0.0, 0.0, 0.0], [1.0, sixteenth, 1.0])),
        LILY_PAD => out.push(([0.0, 0.0, 0.0], [1.0, 0.015625, 1.0])),
        SOUL_SAND => out.push(([0.0, 0.0, 0.0], [1.0, 0.875, 1.0])),
        CACTUS => out.push((
            [sixteenth, 0.0, sixteenth],
            [15.0 * sixteenth, 1.0, 15.0 * sixteenth],
        )),
        HONEY_BLOCK => out.push((
            [sixteenth, 0.0, sixteenth],
            [15.0 * sixteenth, 15.0 * sixteenth, 15.0 * sixteenth],
        )),
        SNOW_LAYER => {
            let layers = (meta & 0x7) + 1;
            // One layer of snow has no collision; every further layer adds 1/8.
            let h = f64::from(layers - 1) / 8.0;
            if h > 0.0 {
                out.push(([0.0, 0.0, 0.0], [1.0, h, 1.0]));
            }
        }
        LADDER => {
            let t = 3.0 / 16.0;
            let bounds = match meta & 0x7 {
                2 => ([0.0, 0.0, 1.0 - t], [1.0, 1.0, 1.0]),
                3 => ([0.0, 0.0, 0.0], [1.0, 1.0, t]),
                4 => ([1.0 - t, 0.0, 0.0], [1.0, 1.0, 1.0]),
                5 => ([0.0, 0.0, 0.0], [t, 1.0, 1.0]),
                _ => ([0.0, 0.0, 0.0], [1.0, 1.0, t]),
            };
            out.push(bounds);
        }
        TRAPDOOR => {
            let is_open = meta & 0x4 != 0;
            let is_top = meta & 0x8 != 0;
            let t = 3.0 / 16.0;
            let bounds = if is_open {
                match meta & 0x3 {
                    0 => ([0.0, 0.0, 1.0 - t], [1.0, 1.0, 1.0]),
                    1 => ([0.0, 0.0, 0.0], [1.0, 1.0, t]),
                    2 => ([1.0 - t, 0.0, 0.0], [1.0, 1.0, 1.0]),
                    _ => ([0.0, 0.0, 0.0], [t, 1.0, 1.0]),
                }
            } else if is_top {
                ([0.0, 1.0 - t, 0.0], [1.0, 1.0, 1.0])
            } else {
                ([0.0, 0.0, 0.0], [1.0, t, 1.0])
            };
            out.push(bounds);
        }
        FENCE_GATE => {
            // Open gates have no collision.
            if meta & 0x4 == 0 {
                if matches!(meta & 0x3, 0 | 2) {
                    out.push(([0.0, 0.0, 0.375], [1.0, 1.5, 0.625]));
                } else {
                    out.push(([0.375, 0.0, 0.0], [0.625, 1.5, 1.0]));
                }
            }
        }
        SCAFFOLDING => {
            // Only the top plate collides for an entity standing on it.
            out.push(([0.0, 14.0 * sixteenth, 0.0], [1.0, 1.0, 1.0]));
        }
        _ => out.push(FULL),
    }
}

#[derive(Clone, Copy, Default)]
struct Connections {
    north: bool,
    south: bool,
    west: bool,
    east: bool,
}

fn connections<C: BlockCache + ?Sized>(
    cache: &C,
    x: i32,
    y: i32,
    z: i32,
    connects: fn(u16) -> bool,
) -> Connections {
    Connections {
        east: connects(cache.block_state(x + 1, y, z)),
        west: connects(cache.block_state(x - 1, y, z)),
        south: connects(cache.block_state(x, y, z + 1)),
        north: connects(cache.block_state(x, y, z - 1)),
    }
}

fn push_arms(connect: Connections, lo: f64, hi: f64, height: f64, out: &mut Vec<LocalBox>) {
    if connect.north {
        out.push(([lo, 0.0, 0.0], [hi, height, 0.5]));
    }
    if connect.south {
        out.push(([lo, 0.0, 0.5], [hi, height, 1.0]));
    }
    if connect.west {
        out.push(([0.0, 0.0, lo], [0.5, height, hi]));
    }
    if connect.east {
        out.push(([0.5, 0.0, lo], [1.0, height, hi]));
    }
}

fn is_liquid_or_air(block_id: u16) -> bool {
    matches!(block_id, 0 | FLOWING_WATER | WATER | FLOWING_LAVA | LAVA)
}

fn fence_connects_to(neighbor_state: u16) -> bool {
    let neighbor_id = block_state_id(neighbor_state);
    if is_liquid_or_air(neighbor_id) {
        return false;
    }
    if matches!(block_shape_kind(neighbor_id), ShapeKind::Fence) || neighbor_id == FENCE_GATE {
        return true;
    }
    matches!(block_shape_kind(neighbor_id), ShapeKind::Full)
}

fn pane_connects_to(neighbor_state: u16) -> bool {
    let neighbor_id = block_state_id(neighbor_state);
    if is_liquid_or_air(neighbor_id) {
        return false;
    }
    if matches!(neighbor_id, IRON_BARS | GLASS_PANE) {
        return true;
    }
    matches!(block_shape_kind(neighbor_id), ShapeKind::Full)
}

fn wall_connects_to(neighbor_state: u16) -> bool {
    let neighbor_id = block_state_id(neighbor_state);
    if is_liquid_or_air(neighbor_id) {
        return false;
    }
    if matches!(neighbor_id, COBBLESTONE_WALL | FENCE_GATE) {
        return true;
    }
    block_flags(neighbor_id).contains(crate::BlockFlags::FULL_CUBE)
}
