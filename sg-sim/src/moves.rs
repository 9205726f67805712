use bevy::math::DVec2;
use sg_utils::ReportKind;

use crate::location::MoveEndpoint;
use crate::medium::Medium;
use crate::tristate::AlmostBoolean;

pub const HISTORY_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitKind {
    #[default]
    Normal,
    /// Several exact packets for one engine tick.
    ProtocolSplit,
    /// Several engine ticks folded into one packet; intermediate positions are lost.
    TransportSplit,
}

impl SplitKind {
    pub fn from_report(kind: ReportKind) -> (Self, u8) {
        match kind {
            ReportKind::Normal => (Self::Normal, 1),
            ReportKind::ProtocolSplit { count } => (Self::ProtocolSplit, count.max(1)),
            ReportKind::TransportSplit { count } => (Self::TransportSplit, count.max(1)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrafeImpulse {
    Left,
    #[default]
    None,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForwardImpulse {
    Backward,
    #[default]
    None,
    Forward,
}

impl StrafeImpulse {
    pub fn from_input(strafe: i8) -> Self {
        match strafe.signum() {
            1 => Self::Left,
            -1 => Self::Right,
            _ => Self::None,
        }
    }
}

impl ForwardImpulse {
    pub fn from_input(forward: i8) -> Self {
        match forward.signum() {
            1 => Self::Forward,
            -1 => Self::Backward,
            _ => Self::None,
        }
    }
}

/// One reported transition. Slots are recycled by the ring, never reallocated.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveData {
    /// The slot holds data for the current ring generation.
    pub valid: bool,
    /// False for join/teleport markers that only carry `from`.
    pub to_is_valid: bool,
    pub tick: u32,
    pub from: MoveEndpoint,
    pub to: MoveEndpoint,
    pub x_distance: f64,
    pub y_distance: f64,
    pub z_distance: f64,
    pub h_distance: f64,
    pub touched_ground: bool,
    pub collide_x: bool,
    pub collide_y: bool,
    pub collide_z: bool,
    pub is_jump: bool,
    pub is_step_up: bool,
    pub bunny_hop: bool,
    pub has_impulse: AlmostBoolean,
    pub strafe_impulse: StrafeImpulse,
    pub forward_impulse: ForwardImpulse,
    pub ver_vel_used: Option<f64>,
    pub hor_vel_used: Option<DVec2>,
    pub multi_move_count: u8,
    pub split_kind: SplitKind,
    pub medium: Medium,
    pub next_inertia: f64,
    pub next_speed_factor: f64,
    pub stuck: bool,
    pub sprinting: bool,
    pub sneaking: bool,
    pub gliding: bool,
    /// Vertical motion the replay fed into collision.
    pub y_motion: f64,
    pub h_allowed: f64,
    pub y_allowed: f64,
    pub h_excess: f64,
    pub y_excess: f64,
}

impl MoveData {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fills the distance fields from the two endpoints.
    pub fn set(&mut self, tick: u32, from: MoveEndpoint, to: MoveEndpoint) {
        self.valid = true;
        self.to_is_valid = true;
        self.tick = tick;
        self.from = from;
        self.to = to;
        self.x_distance = to.pos.x - from.pos.x;
        self.y_distance = to.pos.y - from.pos.y;
        self.z_distance = to.pos.z - from.pos.z;
        self.h_distance = self.x_distance.hypot(self.z_distance);
        self.touched_ground = from.on_ground || to.on_ground;
    }

    /// Join/teleport marker with no completed transition.
    pub fn set_marker(&mut self, tick: u32, at: MoveEndpoint) {
        self.reset();
        self.valid = true;
        self.to_is_valid = false;
        self.tick = tick;
        self.from = at;
        self.to = at;
        self.next_inertia = 0.0;
        self.next_speed_factor = 1.0;
    }

    pub fn collided_horizontally(&self) -> bool {
        self.collide_x || self.collide_z
    }

    /// The client drops its sprint when it certainly held no key, or certainly held keys
    /// without forward. An unknown input never ends it.
    pub fn ends_sprint(&self) -> bool {
        !self.has_impulse.decide_optimistically()
            || (self.has_impulse.decide() && self.forward_impulse != ForwardImpulse::Forward)
    }
}

/// Fixed-depth ring of recent moves. `current` is being filled this tick.
#[derive(Debug)]
pub struct MoveHistory {
    slots: [MoveData; HISTORY_DEPTH],
    head: usize,
}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveHistory {
    pub fn new() -> Self {
        Self {
            slots: [MoveData::default(); HISTORY_DEPTH],
            head: 0,
        }
    }

    fn back(&self, n: usize) -> Option<&MoveData> {
        let idx = (self.head + HISTORY_DEPTH - n) % HISTORY_DEPTH;
        let slot = &self.slots[idx];
        slot.valid.then_some(slot)
    }

    pub fn current(&self) -> &MoveData {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut MoveData {
        &mut self.slots[self.head]
    }

    pub fn first_past(&self) -> Option<&MoveData> {
        self.back(1)
    }

    pub fn second_past(&self) -> Option<&MoveData> {
        self.back(2)
    }

    /// Previous move if it was a real transition.
    pub fn valid_prior(&self) -> Option<&MoveData> {
        self.first_past().filter(|m| m.to_is_valid)
    }

    /// Rotates the ring; the oldest slot becomes the new current one and is reset in place.
    pub fn advance(&mut self) {
        self.head = (self.head + 1) % HISTORY_DEPTH;
        self.slots[self.head].reset();
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    /// Clears the ring and leaves a marker at `at` as the first past move.
    pub fn reset_with_marker(&mut self, tick: u32, at: MoveEndpoint) {
        self.clear();
        self.current_mut().set_marker(tick, at);
        self.advance();
    }
}
