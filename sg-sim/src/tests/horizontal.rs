use bevy::math::{DVec2, DVec3};
use sg_utils::InputReport;
use sg_utils::registry::{ICE, WATER};
use sg_utils::block_state;

use super::{GROUND_WALK, Walker, flat_world, ramped_walk};
use crate::horizontal::{
    CANDIDATE_COUNT, NO_INPUT, candidate_index, candidate_input, relative_acceleration,
};
use crate::moves::{ForwardImpulse, SplitKind, StrafeImpulse};
use crate::tristate::AlmostBoolean;
use crate::velocity::VelocityFlags;

const START: DVec3 = DVec3::new(0.5, 64.0, -20.5);

#[test]
fn candidate_indices_round_trip() {
    for index in 0..CANDIDATE_COUNT {
        let (strafe, forward) = candidate_input(index);
        assert_eq!(candidate_index(strafe, forward), index);
    }
    assert_eq!(candidate_input(NO_INPUT), (0, 0));
    assert_eq!(candidate_input(7), (0, 1));
}

#[test]
fn yaw_rotation_matches_facing() {
    // Yaw 0 faces +Z, yaw -90 faces +X; strafe is positive to the left.
    let forward = relative_acceleration(DVec2::new(0.0, 1.0), 0.1, 0.0);
    assert!((forward - DVec2::new(0.0, 0.1)).length() < 1e-12);
    let east = relative_acceleration(DVec2::new(0.0, 1.0), 0.1, -90.0);
    assert!((east - DVec2::new(0.1, 0.0)).length() < 1e-9);
    let left = relative_acceleration(DVec2::new(1.0, 0.0), 0.1, 0.0);
    assert!((left - DVec2::new(0.1, 0.0)).length() < 1e-12);
    assert_eq!(relative_acceleration(DVec2::ZERO, 0.1, 45.0), DVec2::ZERO);
}

#[test]
fn every_input_is_recovered_from_its_move() {
    let world = flat_world();
    for index in 0..CANDIDATE_COUNT {
        let yaw = 37.0;
        let (strafe, forward) = candidate_input(index);
        let input = DVec2::new(f64::from(strafe), f64::from(forward)) * 0.98;
        let accel = relative_acceleration(input, 0.1, yaw);

        let mut walker = Walker::new(&world, START, yaw);
        let (data, prediction) = walker.step(START + DVec3::new(accel.x, 0.0, accel.y));

        assert!(prediction.horizontal.matched, "input {index} not matched");
        assert_eq!(prediction.horizontal.inferred, index);
        assert_eq!(prediction.h_excess(), 0.0);
        assert_eq!(data.strafe_impulse, StrafeImpulse::from_input(strafe));
        assert_eq!(data.forward_impulse, ForwardImpulse::from_input(forward));
        let expected = if index == NO_INPUT {
            AlmostBoolean::No
        } else {
            AlmostBoolean::Yes
        };
        assert_eq!(data.has_impulse, expected);
    }
}

#[test]
fn straight_walk_ramps_up_without_violation() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let speed = walker.walk_forward(30);
    assert!((speed - ramped_walk(30)).abs() < 1e-12);
    assert!((speed - GROUND_WALK / 0.454).abs() < 1e-6);
}

#[test]
fn speed_hack_is_measured_against_best_candidate() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let speed = walker.walk_forward(30);

    let to = walker.pos + DVec3::new(0.0, 0.0, 10.0);
    let (data, prediction) = walker.step(to);
    let expected = 10.0 - (speed * 0.546 + GROUND_WALK);
    assert!(prediction.is_violation());
    assert!((prediction.h_excess() - expected).abs() < 1e-6);
    assert!((prediction.h_excess() - 9.784).abs() < 1e-3);
    assert_eq!(data.h_excess, prediction.h_excess());
    assert_eq!(prediction.y_excess(), 0.0);
}

#[test]
fn sneaking_scales_input() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let (_, prediction) = walker.step_with(START + DVec3::new(0.0, 0.0, 0.098 * 0.3), |ctx| {
        ctx.actions.sneaking = true;
    });
    assert!(prediction.horizontal.matched);
    assert_eq!(prediction.horizontal.inferred, 7);
}

#[test]
fn sprint_is_cleared_for_backward_input() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let (data, prediction) = walker.step_with(START - DVec3::new(0.0, 0.0, GROUND_WALK), |ctx| {
        ctx.actions.sprinting = true;
    });
    assert!(prediction.horizontal.matched);
    assert!(prediction.horizontal.sprint_cleared);
    assert_eq!(prediction.horizontal.inferred, 1);
    assert!(!data.sprinting);
    assert!(data.ends_sprint());
}

#[test]
fn sprint_forward_matches_sprint_speed() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let sprint_step = 0.13 * 0.98;
    let (data, prediction) = walker.step_with(START + DVec3::new(0.0, 0.0, sprint_step), |ctx| {
        ctx.actions.sprinting = true;
    });
    assert!(prediction.horizontal.matched);
    assert!(!prediction.horizontal.sprint_cleared);
    assert!(data.sprinting);
    assert!(!data.ends_sprint());
}

#[test]
fn starving_player_cannot_sprint() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let sprint_step = 0.13 * 0.98;
    let (_, prediction) = walker.step_with(START + DVec3::new(0.0, 0.0, sprint_step), |ctx| {
        ctx.actions.sprinting = true;
        ctx.actions.food = 4;
    });
    assert!(prediction.horizontal.sprint_cleared);
    assert!((prediction.h_excess() - (sprint_step - GROUND_WALK)).abs() < 1e-9);
}

#[test]
fn reported_input_restricts_the_search() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let (data, prediction) = walker.step_with(START + DVec3::new(0.0, 0.0, GROUND_WALK), |ctx| {
        ctx.input = Some(InputReport {
            forward: -1,
            ..InputReport::default()
        });
    });
    assert!(!prediction.horizontal.matched);
    assert!((prediction.h_excess() - GROUND_WALK).abs() < 1e-9);
    assert_eq!(prediction.horizontal.inferred, 1);
    assert_eq!(data.has_impulse, AlmostBoolean::Yes);
}

#[test]
fn direction_is_only_judged_with_a_known_input() {
    let world = flat_world();
    let skewed = DVec3::new(0.09, 0.0, 0.03);

    // The first move after a join has no usable prior, so its input stays unknown.
    let mut walker = Walker::new(&world, START, 0.0);
    let (data, prediction) = walker.step(START + skewed);
    assert_eq!(data.has_impulse, AlmostBoolean::Maybe);
    assert_eq!(prediction.h_excess(), 0.0);

    let mut walker = Walker::new(&world, START, 0.0);
    walker.step(START);
    let (data, prediction) = walker.step(START + skewed);
    assert_eq!(data.has_impulse, AlmostBoolean::No);
    assert!((prediction.h_excess() - 0.03).abs() < 1e-9);
}

#[test]
fn explosion_is_compensated_once() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    walker.walk_forward(5);
    let tick = walker.tick;
    walker.ledger.add_back(tick, 2.0, 0.0, 0.0, VelocityFlags::ADDITIVE);

    let speed = ramped_walk(6);
    let to = walker.pos + DVec3::new(2.0, 0.0, speed);
    let (data, prediction) = walker.step(to);
    assert_eq!(prediction.h_excess(), 0.0);
    assert_eq!(data.hor_vel_used, Some(DVec2::new(2.0, 0.0)));
    assert!(!walker.ledger.has_any());

    let mut replay = Walker::new(&world, START, 0.0);
    replay.walk_forward(5);
    let to = replay.pos + DVec3::new(2.0, 0.0, speed);
    let (_, prediction) = replay.step(to);
    assert!(prediction.h_excess() > 1.9);
}

#[test]
fn ice_carries_more_momentum() {
    let mut world = flat_world();
    world.fill((-2, 63, -25), (2, 63, -15), block_state(ICE, 0));
    let mut walker = Walker::new(&world, START, 0.0);
    walker.step(START + DVec3::new(0.0, 0.0, 0.1 * 0.216 / (0.98f64.powi(3)) * 0.98));
    let prior = walker.prior.map(|m| m.next_inertia).unwrap_or_default();
    assert!((prior - 0.98 * 0.91).abs() < 1e-12);

    // Released keys: only momentum remains.
    let coast = 0.1 * 0.216 / 0.98f64.powi(3) * 0.98 * 0.98 * 0.91;
    let (_, prediction) = walker.step(walker.pos + DVec3::new(0.0, 0.0, coast));
    assert!(prediction.horizontal.matched);
    assert_eq!(prediction.horizontal.inferred, NO_INPUT);
}

#[test]
fn water_flow_pushes_the_player() {
    let mut world = flat_world();
    world.fill((-2, 64, -25), (2, 65, -15), block_state(WATER, 0));
    world.set_fluid_flow(0, 64, -21, DVec3::new(1.0, 0.0, 0.0));
    let mut walker = Walker::new(&world, START, 0.0);
    walker.step(START);

    let push = 0.014;
    let (_, prediction) = walker.step(START + DVec3::new(push, 0.0, 0.0));
    assert!(prediction.horizontal.matched, "{:?}", prediction.horizontal);
    assert_eq!(prediction.horizontal.inferred, NO_INPUT);
}

#[test]
fn transport_split_uses_distance_cap() {
    let world = flat_world();
    let mut walker = Walker::new(&world, START, 0.0);
    let (_, prediction) = walker.step_with(START + DVec3::new(0.0, 0.0, 1.3), |ctx| {
        ctx.split_kind = SplitKind::TransportSplit;
        ctx.multi_move_count = 2;
    });
    assert_eq!(prediction.h_excess(), 0.0);

    let (_, prediction) = walker.step_with(walker.pos + DVec3::new(0.0, 0.0, 1.6), |ctx| {
        ctx.split_kind = SplitKind::TransportSplit;
        ctx.multi_move_count = 2;
    });
    assert!((prediction.h_excess() - 0.2).abs() < 1e-9);
}
