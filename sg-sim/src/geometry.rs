//! Axis-aligned collision against block sub-boxes.
//!
//! Every comparison uses [`COLLISION_EPSILON`] instead of relative float comparison, so a
//! client position that drifted by a few ulps from the server's own arithmetic still collides
//! the same way.

use bevy::math::{DVec3, IVec3};
use sg_utils::{BlockCache, BlockFlags, fluid_height};

pub const COLLISION_EPSILON: f64 = 1e-7;
/// Cells a ray visits before it gives up.
pub const MAX_RAY_CELLS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Entity box standing with its feet at `pos`.
    pub fn from_feet(pos: DVec3, width: f64, height: f64) -> Self {
        let half = width * 0.5;
        Self::new(
            DVec3::new(pos.x - half, pos.y, pos.z - half),
            DVec3::new(pos.x + half, pos.y + height, pos.z + half),
        )
    }

    pub fn offset(self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Box covering the whole sweep of `self` along `motion`.
    pub fn expanded_by_motion(self, motion: DVec3) -> Self {
        Self {
            min: self.min.min(self.min + motion),
            max: self.max.max(self.max + motion),
        }
    }

    pub fn contract(self, x: f64, y: f64, z: f64) -> Self {
        Self {
            min: DVec3::new(self.min.x + x, self.min.y + y, self.min.z + z),
            max: DVec3::new(self.max.x - x, self.max.y - y, self.max.z - z),
        }
    }

    pub fn deflate(self, amount: f64) -> Self {
        self.contract(amount, amount, amount)
    }

    pub fn inflate(self, amount: f64) -> Self {
        self.contract(-amount, -amount, -amount)
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.max.x > other.min.x
            && self.min.x < other.max.x
            && self.max.y > other.min.y
            && self.min.y < other.max.y
            && self.max.z > other.min.z
            && self.min.z < other.max.z
    }

    /// Overlap test that ignores contact thinner than the collision epsilon.
    pub fn intersects_eps(&self, other: &Aabb) -> bool {
        overlap_x(self, other) && overlap_y(self, other) && overlap_z(self, other)
    }

    pub fn feet_position(&self) -> DVec3 {
        DVec3::new(
            (self.min.x + self.max.x) * 0.5,
            self.min.y,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

fn overlap_x(a: &Aabb, b: &Aabb) -> bool {
    a.max.x - COLLISION_EPSILON > b.min.x && a.min.x + COLLISION_EPSILON < b.max.x
}

fn overlap_y(a: &Aabb, b: &Aabb) -> bool {
    a.max.y - COLLISION_EPSILON > b.min.y && a.min.y + COLLISION_EPSILON < b.max.y
}

fn overlap_z(a: &Aabb, b: &Aabb) -> bool {
    a.max.z - COLLISION_EPSILON > b.min.z && a.min.z + COLLISION_EPSILON < b.max.z
}

pub fn collide_y(entity: &Aabb, block: &Aabb, mut dy: f64) -> f64 {
    if !overlap_x(entity, block) || !overlap_z(entity, block) {
        return dy;
    }
    if dy > 0.0 && entity.max.y - COLLISION_EPSILON <= block.min.y {
        dy = dy.min(block.min.y - entity.max.y).max(0.0);
    } else if dy < 0.0 && entity.min.y + COLLISION_EPSILON >= block.max.y {
        dy = dy.max(block.max.y - entity.min.y).min(0.0);
    }
    dy
}

pub fn collide_x(entity: &Aabb, block: &Aabb, mut dx: f64) -> f64 {
    if !overlap_y(entity, block) || !overlap_z(entity, block) {
        return dx;
    }
    if dx > 0.0 && entity.max.x - COLLISION_EPSILON <= block.min.x {
        dx = dx.min(block.min.x - entity.max.x).max(0.0);
    } else if dx < 0.0 && entity.min.x + COLLISION_EPSILON >= block.max.x {
        dx = dx.max(block.max.x - entity.min.x).min(0.0);
    }
    dx
}

pub fn collide_z(entity: &Aabb, block: &Aabb, mut dz: f64) -> f64 {
    if !overlap_x(entity, block) || !overlap_y(entity, block) {
        return dz;
    }
    if dz > 0.0 && entity.max.z - COLLISION_EPSILON <= block.min.z {
        dz = dz.min(block.min.z - entity.max.z).max(0.0);
    } else if dz < 0.0 && entity.min.z + COLLISION_EPSILON >= block.max.z {
        dz = dz.max(block.max.z - entity.min.z).min(0.0);
    }
    dz
}

/// Resolves `motion` against `boxes`: Y first, then the horizontal axis with the larger
/// displacement, then the remaining one.
pub fn collide_boxes(entity: Aabb, motion: DVec3, boxes: &[Aabb]) -> DVec3 {
    let mut bb = entity;

    let mut y = motion.y;
    if y != 0.0 {
        for block in boxes {
            y = collide_y(&bb, block, y);
        }
        bb = bb.offset(DVec3::new(0.0, y, 0.0));
    }

    let mut x = motion.x;
    let mut z = motion.z;
    if x.abs() >= z.abs() {
        if x != 0.0 {
            for block in boxes {
                x = collide_x(&bb, block, x);
            }
            bb = bb.offset(DVec3::new(x, 0.0, 0.0));
        }
        if z != 0.0 {
            for block in boxes {
                z = collide_z(&bb, block, z);
            }
        }
    } else {
        if z != 0.0 {
            for block in boxes {
                z = collide_z(&bb, block, z);
            }
            bb = bb.offset(DVec3::new(0.0, 0.0, z));
        }
        if x != 0.0 {
            for block in boxes {
                x = collide_x(&bb, block, x);
            }
        }
    }

    DVec3::new(x, y, z)
}

/// Merges contiguous boxes that share the same cross-section, so the seam between two
/// half-blocks that together fill a unit never acts as an edge of its own.
pub fn merge_seams(boxes: &mut Vec<Aabb>) {
    let mut merged = true;
    while merged {
        merged = false;
        'outer: for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if let Some(union) = seam_union(&boxes[i], &boxes[j]) {
                    boxes[i] = union;
                    boxes.swap_remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
    }
}

fn seam_union(a: &Aabb, b: &Aabb) -> Option<Aabb> {
    let same = |a0: f64, a1: f64, b0: f64, b1: f64| {
        (a0 - b0).abs() < COLLISION_EPSILON && (a1 - b1).abs() < COLLISION_EPSILON
    };
    let touches = |a0: f64, a1: f64, b0: f64, b1: f64| {
        (a1 - b0).abs() < COLLISION_EPSILON || (b1 - a0).abs() < COLLISION_EPSILON
    };
    let same_x = same(a.min.x, a.max.x, b.min.x, b.max.x);
    let same_y = same(a.min.y, a.max.y, b.min.y, b.max.y);
    let same_z = same(a.min.z, a.max.z, b.min.z, b.max.z);
    let joined = (same_y && same_z && touches(a.min.x, a.max.x, b.min.x, b.max.x))
        || (same_x && same_z && touches(a.min.y, a.max.y, b.min.y, b.max.y))
        || (same_x && same_y && touches(a.min.z, a.max.z, b.min.z, b.max.z));
    joined.then(|| Aabb::new(a.min.min(b.min), a.max.max(b.max)))
}

/// Square world border centred on (center_x, center_z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBorder {
    pub center_x: f64,
    pub center_z: f64,
    pub size: f64,
}

impl WorldBorder {
    pub fn min_x(&self) -> f64 {
        self.center_x - self.size * 0.5
    }

    pub fn max_x(&self) -> f64 {
        self.center_x + self.size * 0.5
    }

    pub fn min_z(&self) -> f64 {
        self.center_z - self.size * 0.5
    }

    pub fn max_z(&self) -> f64 {
        self.center_z + self.size * 0.5
    }

    pub fn contains(&self, bb: &Aabb) -> bool {
        bb.min.x >= self.min_x() - COLLISION_EPSILON
            && bb.max.x <= self.max_x() + COLLISION_EPSILON
            && bb.min.z >= self.min_z() - COLLISION_EPSILON
            && bb.max.z <= self.max_z() + COLLISION_EPSILON
    }

    /// Entities inside the border cannot leave it; entities already outside move freely.
    pub fn clamp_motion(&self, bb: &Aabb, motion: DVec3) -> DVec3 {
        if !self.contains(bb) {
            return motion;
        }
        let mut out = motion;
        if out.x > 0.0 {
            out.x = out.x.min(self.max_x() - bb.max.x).max(0.0);
        } else if out.x < 0.0 {
            out.x = out.x.max(self.min_x() - bb.min.x).min(0.0);
        }
        if out.z > 0.0 {
            out.z = out.z.min(self.max_z() - bb.max.z).max(0.0);
        } else if out.z < 0.0 {
            out.z = out.z.max(self.min_z() - bb.min.z).min(0.0);
        }
        out
    }
}

/// Result of moving a box through the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub motion: DVec3,
    pub collided_x: bool,
    pub collided_y: bool,
    pub collided_z: bool,
    /// Vertical motion was clipped while moving down.
    pub landed: bool,
    pub stepped: bool,
}

impl Collision {
    pub fn collided_horizontally(&self) -> bool {
        self.collided_x || self.collided_z
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub block: IVec3,
    pub point: DVec3,
    pub face: Face,
    /// Fraction of the segment travelled before the hit, 0..=1.
    pub fraction: f64,
}

pub struct WorldCollision<'a> {
    oracle: &'a dyn BlockCache,
    border: Option<WorldBorder>,
}

impl<'a> WorldCollision<'a> {
    pub fn new(oracle: &'a dyn BlockCache) -> Self {
        Self {
            oracle,
            border: None,
        }
    }

    pub fn with_border(mut self, border: Option<WorldBorder>) -> Self {
        self.border = border;
        self
    }

    pub fn oracle(&self) -> &'a dyn BlockCache {
        self.oracle
    }

    pub fn collect_collision_boxes(&self, query: &Aabb) -> Vec<Aabb> {
        let (min_x, max_x) = block_range(query.min.x, query.max.x);
        // Fences and walls reach into the block above them.
        let (min_y, max_y) = block_range(query.min.y - 0.5, query.max.y);
        let (min_z, max_z) = block_range(query.min.z, query.max.z);
        let mut out = Vec::new();
        for y in min_y..=max_y {
            for z in min_z..=max_z {
                for x in min_x..=max_x {
                    for (local_min, local_max) in self.oracle.block_bounds(x, y, z) {
                        let origin = DVec3::new(f64::from(x), f64::from(y), f64::from(z));
                        let bb = Aabb::new(
                            origin + DVec3::from_array(local_min),
                            origin + DVec3::from_array(local_max),
                        );
                        if bb.intersects(&query.inflate(COLLISION_EPSILON)) {
                            out.push(bb);
                        }
                    }
                }
            }
        }
        merge_seams(&mut out);
        out
    }

    pub fn collides(&self, bb: &Aabb) -> bool {
        self.collect_collision_boxes(bb)
            .iter()
            .any(|block| bb.intersects_eps(block))
    }

    pub fn collide(&self, bb: &Aabb, motion: DVec3) -> DVec3 {
        let boxes = self.collect_collision_boxes(&bb.expanded_by_motion(motion));
        let resolved = collide_boxes(*bb, motion, &boxes);
        match self.border {
            Some(border) => border.clamp_motion(bb, resolved),
            None => resolved,
        }
    }

    /// Moves `bb` by `motion`, stepping up to `step_height` when grounded and blocked
    /// horizontally. The stepped variant is kept only if it travels farther.
    pub fn resolve_with_step(
        &self,
        bb: &Aabb,
        motion: DVec3,
        on_ground: bool,
        step_height: f64,
    ) -> Collision {
        let direct = self.collide(bb, motion);
        let landed = motion.y < 0.0 && direct.y != motion.y;
        let blocked = direct.x != motion.x || direct.z != motion.z;

        let mut result = direct;
        let mut stepped = false;
        if step_height > 0.0 && (on_ground || landed) && blocked {
            let query = bb.expanded_by_motion(DVec3::new(motion.x, step_height, motion.z));
            let boxes = self.collect_collision_boxes(&query);

            // Candidate A: raise against the whole horizontal sweep, then move.
            let sweep = bb.expanded_by_motion(DVec3::new(motion.x, 0.0, motion.z));
            let mut up_a = step_height;
            for block in &boxes {
                up_a = collide_y(&sweep, block, up_a);
            }
            let raised_a = bb.offset(DVec3::new(0.0, up_a, 0.0));
            let horizontal_a = collide_boxes(raised_a, DVec3::new(motion.x, 0.0, motion.z), &boxes);

            // Candidate B: raise in place, then move.
            let up_b = collide_boxes(*bb, DVec3::new(0.0, step_height, 0.0), &boxes).y;
            let raised_b = bb.offset(DVec3::new(0.0, up_b, 0.0));
            let horizontal_b = collide_boxes(raised_b, DVec3::new(motion.x, 0.0, motion.z), &boxes);

            let dist_a = horizontal_a.x * horizontal_a.x + horizontal_a.z * horizontal_a.z;
            let dist_b = horizontal_b.x * horizontal_b.x + horizontal_b.z * horizontal_b.z;
            let (up, horizontal) = if dist_a > dist_b {
                (up_a, horizontal_a)
            } else {
                (up_b, horizontal_b)
            };

            let moved = bb.offset(DVec3::new(horizontal.x, up, horizontal.z));
            let mut down = -up + motion.y.min(0.0);
            for block in &boxes {
                down = collide_y(&moved, block, down);
            }
            let candidate = DVec3::new(horizontal.x, up + down, horizontal.z);

            if direct.x * direct.x + direct.z * direct.z
                < candidate.x * candidate.x + candidate.z * candidate.z
            {
                result = candidate;
                stepped = true;
            }
        }

        Collision {
            motion: result,
            collided_x: result.x != motion.x,
            collided_y: result.y != motion.y && !stepped,
            collided_z: result.z != motion.z,
            landed: landed || stepped,
            stepped,
        }
    }

    pub fn aabb_has_liquid(&self, bb: &Aabb, flag: BlockFlags) -> bool {
        let (min_x, max_x) = block_range(bb.min.x, bb.max.x);
        let (min_y, max_y) = block_range(bb.min.y, bb.max.y);
        let (min_z, max_z) = block_range(bb.min.z, bb.max.z);
        for y in min_y..=max_y {
            for z in min_z..=max_z {
                for x in min_x..=max_x {
                    let block_state = self.oracle.block_state(x, y, z);
                    if !self.oracle.flags(block_state).intersects(flag) {
                        continue;
                    }
                    let origin = DVec3::new(f64::from(x), f64::from(y), f64::from(z));
                    let liquid_bb = Aabb::new(
                        origin,
                        origin + DVec3::new(1.0, fluid_height(block_state), 1.0),
                    );
                    if bb.intersects(&liquid_bb) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Whether the box, shifted by `offset`, is free of both collision and liquid.
    pub fn is_offset_position_free(&self, bb: &Aabb, offset: DVec3) -> bool {
        let moved = bb.offset(offset);
        !self.collides(&moved) && !self.aabb_has_liquid(&moved, BlockFlags::LIQUID)
    }

    /// First block sub-box hit on the segment from `start` to `end`, within the first
    /// [`MAX_RAY_CELLS`] cells.
    pub fn ray_trace(&self, start: DVec3, end: DVec3) -> Option<RayHit> {
        let delta = end - start;
        let length = delta.length();
        if length < COLLISION_EPSILON {
            return None;
        }
        let dir = delta / length;

        let mut cell = start.floor().as_ivec3();
        let end_cell = end.floor().as_ivec3();
        let step = IVec3::new(
            axis_step(dir.x),
            axis_step(dir.y),
            axis_step(dir.z),
        );
        let mut t_max = DVec3::new(
            first_boundary(start.x, dir.x, cell.x),
            first_boundary(start.y, dir.y, cell.y),
            first_boundary(start.z, dir.z, cell.z),
        );
        let t_delta = DVec3::new(
            boundary_spacing(dir.x),
            boundary_spacing(dir.y),
            boundary_spacing(dir.z),
        );

        for _ in 0..MAX_RAY_CELLS {
            if let Some(hit) = self.ray_hit_in_cell(cell, start, dir, length) {
                return Some(hit);
            }
            // Fence-like boxes poke up into the cell above their own.
            let below = cell - IVec3::Y;
            let below_state = self.oracle.block_state(below.x, below.y, below.z);
            if self.oracle.flags(below_state).contains(BlockFlags::FENCE) {
                if let Some(hit) = self.ray_hit_in_cell(below, start, dir, length) {
                    return Some(hit);
                }
            }
            if cell == end_cell {
                return None;
            }
            if t_max.x < t_max.y && t_max.x < t_max.z {
                if t_max.x > length {
                    return None;
                }
                cell.x = cell.x.saturating_add(step.x);
                t_max.x += t_delta.x;
            } else if t_max.y < t_max.z {
                if t_max.y > length {
                    return None;
                }
                cell.y = cell.y.saturating_add(step.y);
                t_max.y += t_delta.y;
            } else {
                if t_max.z > length {
                    return None;
                }
                cell.z = cell.z.saturating_add(step.z);
                t_max.z += t_delta.z;
            }
        }
        None
    }

    fn ray_hit_in_cell(&self, cell: IVec3, origin: DVec3, dir: DVec3, length: f64) -> Option<RayHit> {
        let base = cell.as_dvec3();
        let mut nearest: Option<(f64, Face)> = None;
        for (local_min, local_max) in self.oracle.block_bounds(cell.x, cell.y, cell.z) {
            let min = base + DVec3::from_array(local_min);
            let max = base + DVec3::from_array(local_max);
            let Some((distance, face)) = ray_aabb_distance(origin, dir, min, max, length) else {
                continue;
            };
            match nearest {
                Some((current, _)) if current <= distance => {}
                _ => nearest = Some((distance, face)),
            }
        }
        nearest.map(|(distance, face)| RayHit {
            block: cell,
            point: origin + dir * distance,
            face,
            fraction: distance / length,
        })
    }
}

fn axis_step(d: f64) -> i32 {
    if d > 0.0 {
        1
    } else if d < 0.0 {
        -1
    } else {
        0
    }
}

fn first_boundary(origin: f64, dir: f64, cell: i32) -> f64 {
    if dir > 0.0 {
        (f64::from(cell) + 1.0 - origin) / dir
    } else if dir < 0.0 {
        (origin - f64::from(cell)) / -dir
    } else {
        f64::INFINITY
    }
}

fn boundary_spacing(dir: f64) -> f64 {
    if dir == 0.0 {
        f64::INFINITY
    } else {
        1.0 / dir.abs()
    }
}

/// Slab test; returns the entry distance along `dir` and the face entered through.
fn ray_aabb_distance(
    origin: DVec3,
    dir: DVec3,
    min: DVec3,
    max: DVec3,
    max_distance: f64,
) -> Option<(f64, Face)> {
    let mut t_min = 0.0f64;
    let mut t_max = max_distance;
    let mut face = None;

    for axis in 0..3 {
        let (origin_axis, dir_axis, min_axis, max_axis) = match axis {
            0 => (origin.x, dir.x, min.x, max.x),
            1 => (origin.y, dir.y, min.y, max.y),
            _ => (origin.z, dir.z, min.z, max.z),
        };

        if dir_axis.abs() <= f64::EPSILON {
            if origin_axis < min_axis || origin_axis > max_axis {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir_axis;
        let mut t1 = (min_axis - origin_axis) * inv;
        let mut t2 = (max_axis - origin_axis) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        if t1 > t_min {
            t_min = t1;
            face = Some(match (axis, dir_axis > 0.0) {
                (0, true) => Face::West,
                (0, false) => Face::East,
                (1, true) => Face::Down,
                (1, false) => Face::Up,
                (_, true) => Face::North,
                (_, false) => Face::South,
            });
        }
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }

    // A ray starting inside the box reports the box itself at distance zero.
    Some((t_min, face.unwrap_or(Face::Up)))
}

pub fn block_range(min: f64, max: f64) -> (i32, i32) {
    let min_i = (min + COLLISION_EPSILON).floor() as i32;
    let max_i = (max - COLLISION_EPSILON).floor() as i32;
    if min_i <= max_i {
        (min_i, max_i)
    } else {
        (max_i, min_i)
    }
}
