use std::collections::VecDeque;
use std::sync::Mutex;

use bevy::prelude::*;
use sg_utils::{ChunkBlockCache, EngineMessage, EntityId, PlayerLook, ReportReceiver};

use crate::engine::{MovingEngine, Verdict};
use crate::sink::{ActionOutcome, LogSink, ViolationSink};

/// Messages waiting for the next moving check pass.
#[derive(Default, Resource)]
pub struct PositionReportQueue {
    pub messages: VecDeque<EngineMessage>,
}

impl PositionReportQueue {
    pub fn push(&mut self, message: EngineMessage) {
        self.messages.push_back(message);
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, EngineMessage> {
        self.messages.drain(..)
    }
}

/// Verdicts and set-backs for the network layer to pick up.
#[derive(Default, Resource)]
pub struct VerdictQueue {
    pub verdicts: Vec<Verdict>,
    pub set_backs: Vec<(EntityId, PlayerLook)>,
}

impl VerdictQueue {
    pub fn take_verdicts(&mut self) -> Vec<Verdict> {
        std::mem::take(&mut self.verdicts)
    }
}

/// Logs like [`LogSink`] and queues every set-back.
pub struct EngineSink<'q> {
    log: LogSink,
    set_backs: &'q mut Vec<(EntityId, PlayerLook)>,
}

impl ViolationSink for EngineSink<'_> {
    fn record_violation(
        &mut self,
        entity_id: EntityId,
        check: &'static str,
        level: f64,
        severity: f64,
    ) -> ActionOutcome {
        self.log.record_violation(entity_id, check, level, severity)
    }

    fn request_set_back(&mut self, entity_id: EntityId, location: PlayerLook) {
        self.log.request_set_back(entity_id, location);
        self.set_backs.push((entity_id, location));
    }
}

pub struct AntiCheatPlugin {
    engine: Mutex<Option<MovingEngine>>,
}

impl AntiCheatPlugin {
    pub fn new(engine: MovingEngine) -> Self {
        Self {
            engine: Mutex::new(Some(engine)),
        }
    }
}

impl Plugin for AntiCheatPlugin {
    fn build(&self, app: &mut App) {
        let engine = self
            .engine
            .lock()
            .ok()
            .and_then(|mut engine| engine.take())
            .unwrap_or_else(|| panic!("AntiCheatPlugin built twice"));

        app.insert_resource(engine)
            .init_resource::<ChunkBlockCache>()
            .insert_resource(PositionReportQueue::default())
            .insert_resource(VerdictQueue::default())
            .add_systems(
                Update,
                (receive_reports_system, moving_check_system).chain(),
            );
    }
}

/// Moves everything the network thread sent into the queue.
pub fn receive_reports_system(
    receiver: Option<Res<ReportReceiver>>,
    mut queue: ResMut<PositionReportQueue>,
) {
    let Some(receiver) = receiver else {
        return;
    };
    for message in receiver.0.try_iter() {
        queue.push(message);
    }
}

pub fn moving_check_system(
    mut queue: ResMut<PositionReportQueue>,
    mut engine: ResMut<MovingEngine>,
    world: Res<ChunkBlockCache>,
    mut verdicts: ResMut<VerdictQueue>,
) {
    let log = LogSink {
        cancel_threshold: engine.config().moving.violation.cancel_threshold,
    };
    let verdicts = &mut *verdicts;
    for message in queue.drain() {
        let mut sink = EngineSink {
            log,
            set_backs: &mut verdicts.set_backs,
        };
        if let Some(verdict) = engine.handle(message, &*world, &mut sink) {
            verdicts.verdicts.push(verdict);
        }
    }
}
