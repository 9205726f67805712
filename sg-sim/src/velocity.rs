//! Pending externally granted velocity (knockback, explosions, bounces).

use std::collections::VecDeque;
use std::ops::Add;

use bevy::math::DVec2;
use tracing::debug;

pub const DEFAULT_ACTIVATION_COUNT: u32 = 20;
pub const DEFAULT_WINDOW_TICKS: u32 = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VelocityFlags(u8);

impl VelocityFlags {
    pub const NONE: Self = Self(0);
    /// Summed with same-tick neighbours before matching.
    pub const ADDITIVE: Self = Self(1 << 0);
    /// Computed by the engine itself, e.g. a bounce.
    pub const INTERNAL: Self = Self(1 << 1);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for VelocityFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Value stored in a ledger queue.
pub trait LedgerValue: Copy + Add<Output = Self> + std::fmt::Debug {
    fn within(self, target: Self, tolerance: f64) -> bool;
}

impl LedgerValue for f64 {
    fn within(self, target: Self, tolerance: f64) -> bool {
        (self - target).abs() <= tolerance
    }
}

impl LedgerValue for DVec2 {
    fn within(self, target: Self, tolerance: f64) -> bool {
        (self.x - target.x).abs() <= tolerance && (self.y - target.y).abs() <= tolerance
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LedgerEntry<T> {
    pub tick: u32,
    pub value: T,
    pub flags: VelocityFlags,
    pub activation_count: u32,
}

impl<T> LedgerEntry<T> {
    pub fn new(tick: u32, value: T, flags: VelocityFlags, activation_count: u32) -> Self {
        Self {
            tick,
            value,
            flags,
            activation_count,
        }
    }

    pub fn is_additive(&self) -> bool {
        self.flags.contains(VelocityFlags::ADDITIVE)
    }
}

#[derive(Clone, Debug)]
pub struct ImpulseQueue<T> {
    entries: VecDeque<LedgerEntry<T>>,
}

impl<T> Default for ImpulseQueue<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T: LedgerValue> ImpulseQueue<T> {
    pub fn add_front(&mut self, entry: LedgerEntry<T>) {
        self.entries.push_front(entry);
    }

    pub fn add_back(&mut self, entry: LedgerEntry<T>) {
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peek(&self) -> Option<&LedgerEntry<T>> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry<T>> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Finds the first group explaining `target`. On a match the group and every entry
    /// walked past before it are removed; without a match nothing changes.
    pub fn use_value(&mut self, target: T, tolerance: f64) -> Option<T> {
        let len = self.entries.len();
        for start in 0..len {
            let head = self.entries[start];
            let mut sum = head.value;
            let mut end = start + 1;
            if sum.within(target, tolerance) {
                return Some(self.consume(end, sum));
            }
            if !head.is_additive() {
                continue;
            }
            while end < len {
                let next = self.entries[end];
                if next.tick != head.tick || !next.is_additive() {
                    break;
                }
                sum = sum + next.value;
                end += 1;
                if sum.within(target, tolerance) {
                    return Some(self.consume(end, sum));
                }
            }
        }
        None
    }

    fn consume(&mut self, end: usize, sum: T) -> T {
        self.entries.drain(..end);
        sum
    }

    /// Ages every entry by one inspection and drops the spent or expired ones.
    pub fn remove_invalid(&mut self, tick: u32, window: u32) {
        self.entries.retain_mut(|entry| {
            entry.activation_count = entry.activation_count.saturating_sub(1);
            entry.activation_count > 0 && entry.tick.saturating_add(window) >= tick
        });
    }
}

/// Horizontal and vertical impulse queues of one player.
#[derive(Clone, Debug)]
pub struct VelocityLedger {
    horizontal: ImpulseQueue<DVec2>,
    vertical: ImpulseQueue<f64>,
    activation_count: u32,
    window: u32,
}

impl Default for VelocityLedger {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_COUNT, DEFAULT_WINDOW_TICKS)
    }
}

impl VelocityLedger {
    pub fn new(activation_count: u32, window: u32) -> Self {
        Self {
            horizontal: ImpulseQueue::default(),
            vertical: ImpulseQueue::default(),
            activation_count: activation_count.max(1),
            window,
        }
    }

    pub fn horizontal_entry(&self, tick: u32, x: f64, z: f64, flags: VelocityFlags) -> LedgerEntry<DVec2> {
        LedgerEntry::new(tick, DVec2::new(x, z), flags, self.activation_count)
    }

    pub fn vertical_entry(&self, tick: u32, y: f64, flags: VelocityFlags) -> LedgerEntry<f64> {
        LedgerEntry::new(tick, y, flags, self.activation_count)
    }

    /// Queues a 3D impulse as one horizontal and one vertical entry.
    pub fn add_back(&mut self, tick: u32, x: f64, y: f64, z: f64, flags: VelocityFlags) {
        if x != 0.0 || z != 0.0 {
            let entry = self.horizontal_entry(tick, x, z, flags);
            self.horizontal.add_back(entry);
        }
        if y != 0.0 {
            let entry = self.vertical_entry(tick, y, flags);
            self.vertical.add_back(entry);
        }
    }

    pub fn add_front(&mut self, tick: u32, x: f64, y: f64, z: f64, flags: VelocityFlags) {
        if x != 0.0 || z != 0.0 {
            let entry = self.horizontal_entry(tick, x, z, flags);
            self.horizontal.add_front(entry);
        }
        if y != 0.0 {
            let entry = self.vertical_entry(tick, y, flags);
            self.vertical.add_front(entry);
        }
    }

    pub fn use_horizontal(&mut self, x: f64, z: f64, tolerance: f64) -> Option<DVec2> {
        let used = self.horizontal.use_value(DVec2::new(x, z), tolerance);
        if let Some(value) = used {
            debug!(x = value.x, z = value.y, "horizontal velocity used");
        }
        used
    }

    pub fn use_vertical(&mut self, y: f64, tolerance: f64) -> Option<f64> {
        let used = self.vertical.use_value(y, tolerance);
        if let Some(value) = used {
            debug!(y = value, "vertical velocity used");
        }
        used
    }

    pub fn remove_invalid(&mut self, tick: u32) {
        self.horizontal.remove_invalid(tick, self.window);
        self.vertical.remove_invalid(tick, self.window);
    }

    pub fn clear(&mut self) {
        self.horizontal.clear();
        self.vertical.clear();
    }

    pub fn has_any(&self) -> bool {
        !self.horizontal.is_empty() || !self.vertical.is_empty()
    }

    pub fn peek_horizontal(&self) -> Option<&LedgerEntry<DVec2>> {
        self.horizontal.peek()
    }

    pub fn peek_vertical(&self) -> Option<&LedgerEntry<f64>> {
        self.vertical.peek()
    }

    pub fn horizontal(&self) -> &ImpulseQueue<DVec2> {
        &self.horizontal
    }

    pub fn vertical(&self) -> &ImpulseQueue<f64> {
        &self.vertical
    }
}
