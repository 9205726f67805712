use bevy::math::DVec3;
use bevy::prelude::*;
use sg_utils::{EngineMessage, report_channel};

use super::{GROUND_WALK, PLAYER, flat_world, look, report};
use crate::config::EngineConfig;
use crate::engine::MovingEngine;
use crate::plugin::{AntiCheatPlugin, PositionReportQueue, VerdictQueue};

const START: DVec3 = DVec3::new(0.5, 64.0, 0.5);

fn app() -> App {
    let engine = match MovingEngine::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => panic!("{err}"),
    };
    let mut app = App::new();
    app.add_plugins(AntiCheatPlugin::new(engine))
        .insert_resource(flat_world());
    app
}

#[test]
fn queued_reports_are_checked_on_update() {
    let mut app = app();
    {
        let mut queue = app.world_mut().resource_mut::<PositionReportQueue>();
        queue.push(EngineMessage::Join {
            entity_id: PLAYER,
            look: look(START),
            tick: 0,
        });
        queue.push(EngineMessage::Position(report(
            1,
            START,
            START + DVec3::new(0.0, 0.0, GROUND_WALK),
        )));
    }
    app.update();

    let verdicts = app.world_mut().resource_mut::<VerdictQueue>().take_verdicts();
    assert_eq!(verdicts.len(), 1);
    assert!(!verdicts[0].is_violation());
    assert!(app.world().resource::<PositionReportQueue>().messages.is_empty());
    assert_eq!(app.world().resource::<MovingEngine>().session_count(), 1);
}

#[test]
fn channel_reports_reach_the_engine() {
    let mut app = app();
    let (sender, receiver) = report_channel();
    app.insert_resource(receiver);

    let messages = [
        EngineMessage::Join {
            entity_id: PLAYER,
            look: look(START),
            tick: 0,
        },
        EngineMessage::Position(report(1, START, START + DVec3::new(0.0, 0.0, GROUND_WALK))),
        EngineMessage::Position(report(
            2,
            START + DVec3::new(0.0, 0.0, GROUND_WALK),
            START + DVec3::new(0.0, 0.0, 8.0),
        )),
        EngineMessage::Shutdown,
    ];
    for message in messages {
        if sender.0.send(message).is_err() {
            panic!("channel closed");
        }
    }
    app.update();

    let queue = app.world().resource::<VerdictQueue>();
    assert_eq!(queue.verdicts.len(), 2);
    assert!(!queue.verdicts[0].is_violation());
    assert!(queue.verdicts[1].decision.is_revert());
    assert_eq!(queue.set_backs.len(), 1);
    let (entity_id, set_back) = queue.set_backs[0];
    assert_eq!(entity_id, PLAYER);
    assert_eq!(set_back.pos, START + DVec3::new(0.0, 0.0, GROUND_WALK));
    assert!(app.world().resource::<MovingEngine>().is_shut_down());
}

#[test]
fn update_without_reports_is_a_no_op() {
    let mut app = app();
    app.update();
    app.update();
    let queue = app.world().resource::<VerdictQueue>();
    assert!(queue.verdicts.is_empty());
    assert!(queue.set_backs.is_empty());
}
