use bevy::math::DVec3;
use sg_utils::registry::STONE;
use sg_utils::{ChunkBlockCache, block_state};

use crate::context::{ActionState, Effects, MoveContext};
use crate::envelope::LiftOffEnvelope;
use crate::geometry::WorldCollision;
use crate::location::{DEFAULT_GROUND_MARGIN, PLAYER_HEIGHT, PLAYER_WIDTH, PlayerLocation};
use crate::moves::{MoveData, SplitKind};
use crate::policy::PhysicsPolicy;
use crate::predict::{MovePrediction, predict_move};
use crate::velocity::VelocityLedger;
use crate::workarounds::WorkaroundRegistry;

mod horizontal;
mod ledger;
mod location;
mod workarounds;

pub(super) const GROUND_WALK: f64 = 0.098;

/// Stone floor with its top face at y = 64.
pub(super) fn flat_world() -> ChunkBlockCache {
    let mut world = ChunkBlockCache::default();
    world.fill((-32, 63, -32), (32, 63, 32), block_state(STONE, 0));
    world
}

pub(super) fn location_with<'w>(
    world: &'w ChunkBlockCache,
    policy: PhysicsPolicy,
    pos: DVec3,
    yaw: f32,
) -> PlayerLocation<'w> {
    let mut location = PlayerLocation::new(world, policy);
    location.set(pos, yaw, 0.0, (PLAYER_WIDTH, PLAYER_HEIGHT), DEFAULT_GROUND_MARGIN);
    location
}

pub(super) fn location<'w>(world: &'w ChunkBlockCache, pos: DVec3, yaw: f32) -> PlayerLocation<'w> {
    location_with(world, PhysicsPolicy::default(), pos, yaw)
}

pub(super) fn context<'a, 'w>(
    from: &'a PlayerLocation<'w>,
    to: &'a PlayerLocation<'w>,
    world: &'a WorldCollision<'w>,
    prior: Option<MoveData>,
) -> MoveContext<'a, 'w> {
    MoveContext {
        from,
        to,
        world,
        policy: *from.policy(),
        actions: ActionState::default(),
        effects: Effects::default(),
        prior,
        second_prior: None,
        jump_phase: 0,
        envelope: LiftOffEnvelope::Normal,
        ticks_since_teleport: 100,
        input: None,
        strict_horizontal: true,
        split_kind: SplitKind::Normal,
        multi_move_count: 1,
    }
}

/// Steady ground walking speed after `ticks` moves from rest.
pub(super) fn ramped_walk(ticks: u32) -> f64 {
    let mut speed = 0.0;
    for _ in 0..ticks {
        speed = speed * 0.546 + GROUND_WALK;
    }
    speed
}

/// Feeds consecutive moves of one player through the predictors.
pub(super) struct Walker<'w> {
    world: &'w ChunkBlockCache,
    registry: WorkaroundRegistry,
    pub policy: PhysicsPolicy,
    pub ledger: VelocityLedger,
    pub prior: Option<MoveData>,
    pub tick: u32,
    pub pos: DVec3,
    pub yaw: f32,
}

impl<'w> Walker<'w> {
    pub fn new(world: &'w ChunkBlockCache, pos: DVec3, yaw: f32) -> Self {
        Self {
            world,
            registry: WorkaroundRegistry::builtin(),
            policy: PhysicsPolicy::default(),
            ledger: VelocityLedger::default(),
            prior: None,
            tick: 0,
            pos,
            yaw,
        }
    }

    pub fn step(&mut self, to: DVec3) -> (MoveData, MovePrediction) {
        self.step_with(to, |_| {})
    }

    pub fn step_with(
        &mut self,
        to: DVec3,
        configure: impl FnOnce(&mut MoveContext<'_, '_>),
    ) -> (MoveData, MovePrediction) {
        let from_location = location_with(self.world, self.policy, self.pos, self.yaw);
        let to_location = location_with(self.world, self.policy, to, self.yaw);
        let collision = WorldCollision::new(self.world);
        let mut ctx = context(&from_location, &to_location, &collision, self.prior);
        configure(&mut ctx);

        self.tick += 1;
        let mut current = MoveData::default();
        current.set(self.tick, from_location.summarize(), to_location.summarize());
        let prediction = predict_move(&self.registry, &ctx, &mut current, &mut self.ledger);

        self.prior = Some(current);
        self.pos = to;
        (current, prediction)
    }

    /// Walks straight ahead along +Z with the forward key for `ticks` moves.
    pub fn walk_forward(&mut self, ticks: u32) -> f64 {
        let mut speed = 0.0;
        for _ in 0..ticks {
            speed = speed * 0.546 + GROUND_WALK;
            let to = self.pos + DVec3::new(0.0, 0.0, speed);
            let (_, prediction) = self.step(to);
            assert!(!prediction.is_violation(), "walk flagged at tick {}", self.tick);
        }
        speed
    }
}
