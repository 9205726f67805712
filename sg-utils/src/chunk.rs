use std::collections::HashMap;

use bevy::math::DVec3;
use bevy::prelude::Resource;

use crate::BlockCache;

const CHUNK_SIZE: i32 = 16;
const SECTION_HEIGHT: i32 = 16;
pub const WORLD_MIN_Y: i32 = -64;
pub const WORLD_HEIGHT: i32 = 384;

#[derive(Clone, Default)]
struct ChunkColumn {
    sections: Vec<Option<Vec<u16>>>,
}

impl ChunkColumn {
    fn new() -> Self {
        Self {
            sections: vec![None; (WORLD_HEIGHT / SECTION_HEIGHT) as usize],
        }
    }

    fn set_section(&mut self, index: usize, blocks: Vec<u16>) {
        if index >= self.sections.len() {
            return;
        }
        self.sections[index] = Some(blocks);
    }
}

/// One 16x16x16 block section as delivered by the world layer.
#[derive(Clone)]
pub struct ChunkSection {
    pub index: u8,
    pub blocks: Vec<u16>,
}

/// In-memory block snapshot keyed by chunk column. Unloaded chunks read as air.
#[derive(Resource, Default)]
pub struct ChunkBlockCache {
    chunks: HashMap<(i32, i32), ChunkColumn>,
    fluid_flows: HashMap<(i32, i32, i32), DVec3>,
    entity_supports: Vec<(DVec3, DVec3)>,
}

impl ChunkBlockCache {
    pub fn update_chunk(&mut self, chunk_x: i32, chunk_z: i32, full: bool, sections: Vec<ChunkSection>) {
        let entry = self
            .chunks
            .entry((chunk_x, chunk_z))
            .or_insert_with(ChunkColumn::new);
        if full {
            *entry = ChunkColumn::new();
        }
        for section in sections {
            entry.set_section(section.index as usize, section.blocks);
        }
    }

    pub fn unload_chunk(&mut self, chunk_x: i32, chunk_z: i32) {
        self.chunks.remove(&(chunk_x, chunk_z));
    }

    pub fn has_chunk(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.chunks.contains_key(&(chunk_x, chunk_z))
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block_state: u16) {
        let Some((section_index, idx)) = section_slot(x, y, z) else {
            return;
        };
        let column = self
            .chunks
            .entry((x.div_euclid(CHUNK_SIZE), z.div_euclid(CHUNK_SIZE)))
            .or_insert_with(ChunkColumn::new);
        let section = column.sections[section_index]
            .get_or_insert_with(|| vec![0; (CHUNK_SIZE * CHUNK_SIZE * SECTION_HEIGHT) as usize]);
        section[idx] = block_state;
    }

    /// Fills the inclusive block range with one state.
    pub fn fill(&mut self, min: (i32, i32, i32), max: (i32, i32, i32), block_state: u16) {
        for y in min.1.min(max.1)..=min.1.max(max.1) {
            for z in min.2.min(max.2)..=min.2.max(max.2) {
                for x in min.0.min(max.0)..=min.0.max(max.0) {
                    self.set_block(x, y, z, block_state);
                }
            }
        }
    }

    pub fn set_fluid_flow(&mut self, x: i32, y: i32, z: i32, flow: DVec3) {
        if flow == DVec3::ZERO {
            self.fluid_flows.remove(&(x, y, z));
        } else {
            self.fluid_flows.insert((x, y, z), flow);
        }
    }

    /// Registers a box an entity may stand on (boats, shulkers, other players).
    pub fn add_entity_support(&mut self, min: DVec3, max: DVec3) {
        self.entity_supports.push((min, max));
    }

    pub fn clear_entity_supports(&mut self) {
        self.entity_supports.clear();
    }
}

fn section_slot(x: i32, y: i32, z: i32) -> Option<(usize, usize)> {
    if y < WORLD_MIN_Y || y >= WORLD_MIN_Y + WORLD_HEIGHT {
        return None;
    }
    let rel_y = y - WORLD_MIN_Y;
    let section_index = (rel_y / SECTION_HEIGHT) as usize;
    let local_y = (rel_y % SECTION_HEIGHT) as usize;
    let local_x = x.rem_euclid(CHUNK_SIZE) as usize;
    let local_z = z.rem_euclid(CHUNK_SIZE) as usize;
    Some((section_index, local_y * 16 * 16 + local_z * 16 + local_x))
}

impl BlockCache for ChunkBlockCache {
    fn block_state(&self, x: i32, y: i32, z: i32) -> u16 {
        let Some((section_index, idx)) = section_slot(x, y, z) else {
            return 0;
        };
        let Some(column) = self
            .chunks
            .get(&(x.div_euclid(CHUNK_SIZE), z.div_euclid(CHUNK_SIZE)))
        else {
            return 0;
        };
        let Some(section) = column.sections.get(section_index).and_then(|v| v.as_ref()) else {
            return 0;
        };
        *section.get(idx).unwrap_or(&0)
    }

    fn fluid_flow(&self, x: i32, y: i32, z: i32) -> DVec3 {
        self.fluid_flows
            .get(&(x, y, z))
            .copied()
            .unwrap_or(DVec3::ZERO)
    }

    fn has_entity_support(&self, min: DVec3, max: DVec3) -> bool {
        self.entity_supports.iter().any(|(e_min, e_max)| {
            max.x > e_min.x
                && min.x < e_max.x
                && max.y >= e_min.y
                && min.y <= e_max.y
                && max.z > e_min.z
                && min.z < e_max.z
        })
    }
}
