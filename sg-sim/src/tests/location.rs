use bevy::math::DVec3;
use sg_utils::registry::{
    COBWEB, HONEY_BLOCK, ICE, LADDER, POWDER_SNOW, SLIME_BLOCK, SOUL_SAND, STONE, WATER,
};
use sg_utils::versions::PROTOCOL_1_8;
use sg_utils::{BlockCache, Capabilities, block_state};

use super::{flat_world, location, location_with};
use crate::envelope::LiftOffEnvelope;
use crate::medium::Medium;
use crate::policy::PhysicsPolicy;

#[test]
fn standing_on_floor_is_on_ground() {
    let world = flat_world();
    assert!(location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0).is_on_ground());
    assert!(!location(&world, DVec3::new(0.5, 64.01, 0.5), 0.0).is_on_ground());
}

#[test]
fn entity_support_counts_as_ground() {
    let mut world = flat_world();
    world.add_entity_support(DVec3::new(-1.0, 70.0, -1.0), DVec3::new(2.0, 70.6, 2.0));
    assert!(location(&world, DVec3::new(0.5, 70.6, 0.5), 0.0).is_on_ground());
}

#[test]
fn ground_block_properties() {
    let mut world = flat_world();
    world.set_block(0, 63, 0, block_state(ICE, 0));
    world.set_block(2, 63, 0, block_state(SLIME_BLOCK, 0));
    world.set_block(4, 63, 0, block_state(SOUL_SAND, 0));

    let ice = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    assert!(ice.is_on_ice());
    assert!((ice.ground_friction() - 0.98).abs() < 1e-12);

    let slime = location(&world, DVec3::new(2.5, 64.0, 0.5), 0.0);
    assert!(slime.is_on_bouncy());
    assert_eq!(slime.bounce_factor(), 1.0);

    let soul_sand = location(&world, DVec3::new(4.5, 64.0, 0.5), 0.0);
    assert_eq!(soul_sand.speed_factor(), 0.4);

    let stone = location(&world, DVec3::new(6.5, 64.0, 0.5), 0.0);
    assert!((stone.ground_friction() - 0.6).abs() < 1e-12);
    assert_eq!(stone.bounce_factor(), 0.0);
}

#[test]
fn honey_jump_factor_follows_version() {
    let mut world = flat_world();
    world.set_block(0, 63, 0, block_state(HONEY_BLOCK, 0));
    let pos = DVec3::new(0.5, 64.0, 0.5);
    assert_eq!(location(&world, pos, 0.0).jump_factor(), 0.5);

    let legacy = PhysicsPolicy::resolve(&Capabilities::uniform(PROTOCOL_1_8));
    assert_eq!(location_with(&world, legacy, pos, 0.0).jump_factor(), 1.0);
}

#[test]
fn water_and_surface() {
    let mut world = flat_world();
    world.fill((-2, 64, -2), (2, 64, 2), block_state(WATER, 0));
    let submerged = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    assert!(submerged.is_in_water());
    assert!(!submerged.is_in_lava());
    assert_eq!(submerged.medium(false), Medium::Water);
    assert_eq!(
        LiftOffEnvelope::classify(&submerged.summarize()),
        LiftOffEnvelope::LimitLiquid
    );

    // Level 0 water stops at 8/9 of the block.
    let above = location(&world, DVec3::new(0.5, 64.9, 0.5), 0.0);
    assert!(!above.is_in_water());
}

#[test]
fn fluid_flow_is_normalized() {
    let mut world = flat_world();
    world.set_block(0, 64, 0, block_state(WATER, 1));
    world.set_fluid_flow(0, 64, 0, DVec3::new(3.0, 0.0, 4.0));
    let flow = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0).fluid_flow();
    assert!((flow - DVec3::new(0.6, 0.0, 0.8)).length() < 1e-12);
}

#[test]
fn climbable_and_stuck_blocks() {
    let mut world = flat_world();
    world.set_block(0, 64, 0, block_state(LADDER, 2));
    world.set_block(3, 64, 0, block_state(COBWEB, 0));
    world.set_block(3, 65, 0, block_state(POWDER_SNOW, 0));

    let ladder = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    assert!(ladder.is_on_climbable());
    assert_eq!(ladder.medium(false), Medium::Climbable);

    let web = location(&world, DVec3::new(3.5, 64.0, 0.5), 0.0);
    assert!(web.is_in_web());
    assert!(web.is_in_powder_snow());
    // Web wins over powder snow.
    assert_eq!(web.stuck_multiplier(), Some([0.25, 0.05, 0.25]));
    assert_eq!(web.medium(false), Medium::Web);
}

#[test]
fn head_obstruction() {
    let mut world = flat_world();
    world.set_block(0, 66, 0, block_state(STONE, 0));
    assert!(location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0).is_head_obstructed());
    assert!(!location(&world, DVec3::new(3.5, 64.0, 0.5), 0.0).is_head_obstructed());
}

#[test]
fn gliding_only_outside_liquids() {
    let world = flat_world();
    let air = location(&world, DVec3::new(0.5, 80.0, 0.5), 0.0);
    assert_eq!(air.medium(true), Medium::Gliding);

    let legacy = PhysicsPolicy::resolve(&Capabilities::uniform(PROTOCOL_1_8));
    let legacy_air = location_with(&world, legacy, DVec3::new(0.5, 80.0, 0.5), 0.0);
    assert_eq!(legacy_air.medium(true), Medium::Air);
}

#[test]
fn cached_predicates_survive_release() {
    let world = flat_world();
    let mut snapshot = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    assert!(snapshot.is_on_ground());
    snapshot.release();
    assert!(snapshot.is_released());
    assert!(snapshot.is_on_ground());
}

#[test]
#[should_panic(expected = "queried after release")]
fn uncached_predicate_after_release_panics() {
    let world = flat_world();
    let mut snapshot = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    snapshot.release();
    snapshot.is_in_water();
}

#[test]
fn set_drops_cached_predicates() {
    let world = flat_world();
    let mut snapshot = location(&world, DVec3::new(0.5, 64.0, 0.5), 0.0);
    assert!(snapshot.is_on_ground());
    snapshot.set(DVec3::new(0.5, 66.0, 0.5), 0.0, 0.0, (0.6, 1.8), 0.001);
    assert!(!snapshot.is_on_ground());
    assert_eq!(world.block_state(0, 63, 0), block_state(STONE, 0));
}
