use bevy::math::DVec3;
use sg_utils::registry::{SLIME_BLOCK, STONE, WATER};
use sg_utils::versions::{PROTOCOL_1_8, PROTOCOL_1_13};
use sg_utils::{Capabilities, ChunkBlockCache, block_state};

use super::{context, flat_world, location};
use crate::context::MoveContext;
use crate::envelope::LiftOffEnvelope;
use crate::geometry::WorldCollision;
use crate::horizontal::Candidate;
use crate::moves::MoveData;
use crate::policy::PhysicsPolicy;
use crate::workarounds::{
    BUILTIN, LEGACY_HEAD_BUMP_PHASE, Workaround, WorkaroundAxis, WorkaroundProbe, WorkaroundRegistry,
    WorkaroundUsage,
};

const GROUND: DVec3 = DVec3::new(0.5, 64.0, 0.5);
const HOVER: DVec3 = DVec3::new(0.5, 64.05, 0.5);

fn probe(observed: DVec3, predicted: DVec3) -> WorkaroundProbe<'static> {
    WorkaroundProbe {
        observed,
        predicted,
        momentum: DVec3::ZERO,
        candidates: &[],
        alternatives: &[],
    }
}

fn grounded_prior() -> MoveData {
    MoveData {
        valid: true,
        to_is_valid: true,
        touched_ground: true,
        ..MoveData::default()
    }
}

fn accepts(name: &str, ctx: &MoveContext<'_, '_>, probe: &WorkaroundProbe<'_>) -> bool {
    let registry = WorkaroundRegistry::builtin();
    let entry = registry
        .get(name)
        .unwrap_or_else(|| panic!("no workaround named {name}"));
    (entry.test)(ctx, &MoveData::default(), probe)
}

#[test]
fn ground_lost_descend_needs_recent_ground() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, HOVER, 0.0);
    let to = location(&world, HOVER - DVec3::Y * 0.0784, 0.0);
    let fall = probe(DVec3::new(0.0, -0.0784, 0.0), DVec3::ZERO);

    let ctx = context(&from, &to, &collision, Some(grounded_prior()));
    assert!(accepts("ground_lost_descend", &ctx, &fall));

    let ctx = context(&from, &to, &collision, None);
    assert!(!accepts("ground_lost_descend", &ctx, &fall));

    let ctx = context(&from, &to, &collision, Some(grounded_prior()));
    let deeper = probe(DVec3::new(0.0, -0.2, 0.0), DVec3::ZERO);
    assert!(!accepts("ground_lost_descend", &ctx, &deeper));
}

#[test]
fn edge_descend_walking_off_a_block() {
    let mut world = ChunkBlockCache::default();
    world.set_block(0, 63, 0, block_state(STONE, 0));
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, DVec3::new(2.5, 63.9216, 0.5), 0.0);
    let ctx = context(&from, &to, &collision, None);

    let clipped = probe(DVec3::new(0.1, -0.0784, 0.0), DVec3::new(0.1, 0.0, 0.0));
    assert!(accepts("edge_descend", &ctx, &clipped));

    let standing = probe(DVec3::new(0.0, -0.0784, 0.0), DVec3::ZERO);
    assert!(!accepts("edge_descend", &ctx, &standing));
}

#[test]
fn could_step_after_lost_ground() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, HOVER, 0.0);
    let to = location(&world, GROUND, 0.0);
    let step = probe(DVec3::new(0.0, 0.5, 0.1), DVec3::new(0.0, -0.08, 0.1));

    let mut ctx = context(&from, &to, &collision, Some(grounded_prior()));
    assert!(accepts("could_step", &ctx, &step));

    ctx.jump_phase = 3;
    assert!(!accepts("could_step", &ctx, &step));
}

#[test]
fn could_step_reads_back_past_a_first_fall_step() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, HOVER, 0.0);
    let to = location(&world, GROUND, 0.0);
    let step = probe(DVec3::new(0.0, 0.5, 0.1), DVec3::new(0.0, -0.08, 0.1));
    let first_fall = MoveData {
        valid: true,
        to_is_valid: true,
        y_distance: -0.0784,
        ..MoveData::default()
    };

    let mut ctx = context(&from, &to, &collision, Some(first_fall));
    ctx.jump_phase = 2;
    assert!(!accepts("could_step", &ctx, &step));

    ctx.second_prior = Some(grounded_prior());
    assert!(accepts("could_step", &ctx, &step));

    ctx.envelope = LiftOffEnvelope::LimitWeb;
    assert!(!accepts("could_step", &ctx, &step));
}

#[test]
fn slime_bounce_may_be_weaker() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::Y * 0.3, 0.0);
    let mut prior = grounded_prior();
    prior.collide_y = true;
    prior.y_motion = -0.5;
    prior.to.on_bouncy = true;
    let ctx = context(&from, &to, &collision, Some(prior));

    let weaker = probe(DVec3::new(0.0, 0.3, 0.0), DVec3::new(0.0, 0.49, 0.0));
    assert!(accepts("slime_bounce_decay", &ctx, &weaker));

    let stronger = probe(DVec3::new(0.0, 0.6, 0.0), DVec3::new(0.0, 0.49, 0.0));
    assert!(!accepts("slime_bounce_decay", &ctx, &stronger));

    prior.sneaking = true;
    let ctx = context(&from, &to, &collision, Some(prior));
    assert!(!accepts("slime_bounce_decay", &ctx, &weaker));
}

#[test]
fn glide_touchdown_only_while_gliding() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::Z * 0.5, 0.0);
    let landing = probe(DVec3::new(0.0, 0.0, 0.5), DVec3::new(0.0, -0.05, 0.5));

    let mut ctx = context(&from, &to, &collision, None);
    ctx.actions.gliding = true;
    assert!(accepts("glide_touchdown", &ctx, &landing));

    ctx.actions.gliding = false;
    assert!(!accepts("glide_touchdown", &ctx, &landing));
}

#[test]
fn levitation_overflow_matches_wrapped_amplifier() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let pos = DVec3::new(0.5, 70.0, 0.5);
    let from = location(&world, pos, 0.0);
    let to = location(&world, pos - DVec3::Y * 0.539, 0.0);
    let alternatives = [-0.539];
    let wrapped = WorkaroundProbe {
        alternatives: &alternatives,
        ..probe(DVec3::new(0.0, -0.539, 0.0), DVec3::new(0.0, 1.9698, 0.0))
    };

    let mut ctx = context(&from, &to, &collision, None);
    ctx.policy = PhysicsPolicy::resolve(&Capabilities::uniform(PROTOCOL_1_13));
    ctx.effects.levitation = Some(200);
    assert!(accepts("levitation_overflow", &ctx, &wrapped));

    ctx.effects.levitation = Some(100);
    assert!(!accepts("levitation_overflow", &ctx, &wrapped));

    ctx.effects.levitation = Some(200);
    ctx.policy = PhysicsPolicy::default();
    assert!(!accepts("levitation_overflow", &ctx, &wrapped));
}

#[test]
fn legacy_head_bump_under_a_ceiling() {
    let mut world = flat_world();
    world.set_block(0, 66, 0, block_state(STONE, 0));
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::Y * 0.2, 0.0);
    let bump = probe(DVec3::new(0.0, 0.2, 0.0), DVec3::new(0.0, 0.0, 0.0));

    let mut ctx = context(&from, &to, &collision, None);
    ctx.policy = PhysicsPolicy::resolve(&Capabilities::uniform(PROTOCOL_1_8));
    assert!(accepts("legacy_head_bump", &ctx, &bump));

    // Only the first airborne ticks of a rise can be stalled by the ceiling.
    ctx.jump_phase = LEGACY_HEAD_BUMP_PHASE + 1;
    assert!(!accepts("legacy_head_bump", &ctx, &bump));
    ctx.jump_phase = LEGACY_HEAD_BUMP_PHASE;
    ctx.envelope = LiftOffEnvelope::LimitWeb;
    assert!(!accepts("legacy_head_bump", &ctx, &bump));

    ctx.jump_phase = 0;
    ctx.envelope = LiftOffEnvelope::Normal;
    ctx.policy = PhysicsPolicy::default();
    assert!(!accepts("legacy_head_bump", &ctx, &bump));
}

#[test]
fn teleport_settle_is_short_lived() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, HOVER, 0.0);
    let to = location(&world, GROUND, 0.0);
    let settle = probe(DVec3::new(0.0, -0.3, 0.0), DVec3::new(0.0, -0.0784, 0.0));

    let mut ctx = context(&from, &to, &collision, None);
    ctx.ticks_since_teleport = 1;
    assert!(accepts("teleport_settle", &ctx, &settle));

    let plunge = probe(DVec3::new(0.0, -0.8, 0.0), DVec3::new(0.0, -0.0784, 0.0));
    assert!(!accepts("teleport_settle", &ctx, &plunge));

    ctx.ticks_since_teleport = 5;
    assert!(!accepts("teleport_settle", &ctx, &settle));
}

#[test]
fn liquid_surface_bob_on_crossing() {
    let mut world = flat_world();
    world.set_block(0, 64, 0, block_state(WATER, 0));
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::Y, 0.0);
    let bob = probe(DVec3::new(0.0, 0.08, 0.0), DVec3::new(0.0, 0.0, 0.0));

    let ctx = context(&from, &to, &collision, None);
    assert!(accepts("liquid_surface_bob", &ctx, &bob));

    let ctx = context(&from, &from, &collision, None);
    assert!(!accepts("liquid_surface_bob", &ctx, &bob));
}

#[test]
fn slime_speed_tries_every_damping() {
    let mut world = flat_world();
    world.set_block(0, 63, 0, block_state(SLIME_BLOCK, 0));
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::new(0.08, 0.0, 0.098), 0.0);
    let candidates = [Candidate {
        strafe: 0,
        forward: 1,
        acceleration: DVec3::new(0.0, 0.0, 0.098),
        ..Candidate::default()
    }];
    let damped = WorkaroundProbe {
        momentum: DVec3::new(0.2, 0.0, 0.0),
        candidates: &candidates,
        ..probe(DVec3::new(0.08, 0.0, 0.098), DVec3::new(0.2, 0.0, 0.098))
    };

    let ctx = context(&from, &to, &collision, None);
    assert!(accepts("slime_speed_bruteforce", &ctx, &damped));

    let off = WorkaroundProbe {
        observed: DVec3::new(0.15, 0.0, 0.098),
        ..damped
    };
    assert!(!accepts("slime_speed_bruteforce", &ctx, &off));

    let stone_world = flat_world();
    let stone = location(&stone_world, GROUND, 0.0);
    let stone_collision = WorldCollision::new(&stone_world);
    let ctx = context(&stone, &stone, &stone_collision, None);
    assert!(!accepts("slime_speed_bruteforce", &ctx, &damped));
}

#[test]
fn teleport_settle_horizontal_is_bounded() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, GROUND, 0.0);
    let to = location(&world, GROUND + DVec3::X * 0.3, 0.0);
    let mut ctx = context(&from, &to, &collision, None);
    ctx.ticks_since_teleport = 2;

    assert!(accepts("teleport_settle_horizontal", &ctx, &probe(DVec3::X * 0.3, DVec3::ZERO)));
    assert!(!accepts("teleport_settle_horizontal", &ctx, &probe(DVec3::X * 0.8, DVec3::ZERO)));
}

#[test]
fn builtin_names_are_unique() {
    let registry = WorkaroundRegistry::builtin();
    assert_eq!(registry.entries().len(), BUILTIN.len());
    assert_eq!(BUILTIN.len(), 11);
    for entry in BUILTIN {
        assert!(registry.is_enabled(entry.name));
        assert!(!entry.summary.is_empty());
    }
}

#[test]
fn disabled_entries_never_fire() {
    let world = flat_world();
    let collision = WorldCollision::new(&world);
    let from = location(&world, HOVER, 0.0);
    let to = location(&world, GROUND, 0.0);
    let mut ctx = context(&from, &to, &collision, None);
    ctx.ticks_since_teleport = 1;
    let settle = probe(DVec3::new(0.0, -0.3, 0.0), DVec3::ZERO);
    let current = MoveData::default();

    let mut registry = WorkaroundRegistry::builtin();
    let mut usage = WorkaroundUsage::default();
    let fired = registry.apply(WorkaroundAxis::Vertical, &ctx, &current, &settle, &mut usage);
    assert_eq!(fired, Some("teleport_settle"));
    assert!(usage.has("teleport_settle"));

    assert!(registry.set_enabled("teleport_settle", false));
    assert!(!registry.is_enabled("teleport_settle"));
    usage.reset();
    let fired = registry.apply(WorkaroundAxis::Vertical, &ctx, &current, &settle, &mut usage);
    assert_eq!(fired, None);
    assert!(usage.is_empty());

    // Horizontal entries are never consulted for the vertical axis.
    assert_eq!(
        registry.apply(WorkaroundAxis::Horizontal, &ctx, &current, &probe(DVec3::ZERO, DVec3::ZERO), &mut usage),
        Some("teleport_settle_horizontal")
    );
}

#[test]
fn unknown_name_cannot_be_toggled() {
    let mut registry = WorkaroundRegistry::builtin();
    assert!(!registry.set_enabled("no_such_workaround", false));
    assert!(!registry.is_enabled("no_such_workaround"));
}

#[test]
#[should_panic(expected = "registered twice")]
fn duplicate_registration_panics() {
    let mut registry = WorkaroundRegistry::builtin();
    let copy: Workaround = BUILTIN[0];
    registry.register(copy);
}
