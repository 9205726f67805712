use bevy::math::DVec3;
use sg_utils::registry::STONE;
use sg_utils::{
    ChunkBlockCache, EngineMessage, EntityId, PlayerLook, PositionReport, ReportKind, block_state,
};

use crate::config::EngineConfig;
use crate::engine::{MovingEngine, Verdict};
use crate::sink::{ActionOutcome, ViolationSink};

mod plugin;

pub(super) const PLAYER: EntityId = 7;
pub(super) const GROUND_WALK: f64 = 0.098;

pub(super) fn flat_world() -> ChunkBlockCache {
    let mut world = ChunkBlockCache::default();
    world.fill((-32, 63, -32), (32, 63, 32), block_state(STONE, 0));
    world
}

pub(super) fn look(pos: DVec3) -> PlayerLook {
    PlayerLook::new(pos, 0.0, 0.0)
}

pub(super) fn report(tick: u32, from: DVec3, to: DVec3) -> PositionReport {
    PositionReport {
        entity_id: PLAYER,
        from: look(from),
        to: look(to),
        tick,
        kind: ReportKind::Normal,
        client_on_ground: false,
        input: None,
    }
}

/// Records instead of logging; cancels once the level passes `cancel_above`.
pub(super) struct RecordingSink {
    pub cancel_above: f64,
    pub violations: Vec<(&'static str, f64, f64)>,
    pub set_backs: Vec<PlayerLook>,
}

impl RecordingSink {
    pub fn new(cancel_above: f64) -> Self {
        Self {
            cancel_above,
            violations: Vec::new(),
            set_backs: Vec::new(),
        }
    }
}

impl ViolationSink for RecordingSink {
    fn record_violation(
        &mut self,
        _entity_id: EntityId,
        check: &'static str,
        level: f64,
        severity: f64,
    ) -> ActionOutcome {
        self.violations.push((check, level, severity));
        ActionOutcome {
            cancel: level > self.cancel_above,
        }
    }

    fn request_set_back(&mut self, _entity_id: EntityId, location: PlayerLook) {
        self.set_backs.push(location);
    }
}

/// One joined player driven through the engine move by move.
pub(super) struct Driver {
    pub engine: MovingEngine,
    pub world: ChunkBlockCache,
    pub sink: RecordingSink,
    pub tick: u32,
    pub pos: DVec3,
}

impl Driver {
    pub fn new(world: ChunkBlockCache, pos: DVec3) -> Self {
        Self::with_config(EngineConfig::default(), world, pos)
    }

    pub fn with_config(config: EngineConfig, world: ChunkBlockCache, pos: DVec3) -> Self {
        let engine = match MovingEngine::new(config) {
            Ok(engine) => engine,
            Err(err) => panic!("bad test config: {err}"),
        };
        let mut driver = Self {
            engine,
            world,
            sink: RecordingSink::new(100.0),
            tick: 0,
            pos,
        };
        driver.send(EngineMessage::Join {
            entity_id: PLAYER,
            look: look(pos),
            tick: 0,
        });
        driver
    }

    pub fn send(&mut self, message: EngineMessage) -> Option<Verdict> {
        self.engine.handle(message, &self.world, &mut self.sink)
    }

    pub fn move_to(&mut self, to: DVec3) -> Verdict {
        self.tick += 1;
        let report = report(self.tick, self.pos, to);
        self.pos = to;
        self.send(EngineMessage::Position(report))
            .unwrap_or_else(|| panic!("no verdict for tick {}", self.tick))
    }

    /// Walks along +Z from rest with the forward key held.
    pub fn walk_forward(&mut self, ticks: u32) -> f64 {
        let mut speed = 0.0;
        for _ in 0..ticks {
            speed = speed * 0.546 + GROUND_WALK;
            let verdict = self.move_to(self.pos + DVec3::new(0.0, 0.0, speed));
            assert!(!verdict.is_violation(), "walk flagged at tick {}: {verdict:?}", self.tick);
        }
        speed
    }
}
