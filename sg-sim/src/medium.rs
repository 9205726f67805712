use bevy::math::DVec3;

use crate::policy::PhysicsPolicy;

pub const GRAVITY: f64 = 0.08;
pub const SLOW_FALLING_GRAVITY: f64 = 0.01;
pub const AIR_DRAG: f64 = 0.98;
pub const AIR_INERTIA: f64 = 0.91;
pub const AIR_ACCELERATION: f64 = 0.02;
pub const AIR_ACCELERATION_SPRINTING: f64 = 0.026;
pub const GROUND_ACCELERATION_SCALE: f64 = 0.216;
pub const WATER_INERTIA: f64 = 0.8;
pub const WATER_INERTIA_SPRINTING: f64 = 0.9;
pub const LAVA_INERTIA: f64 = 0.5;
pub const LIQUID_ACCELERATION: f64 = 0.02;
pub const LEGACY_WATER_GRAVITY: f64 = 0.02;
pub const MODERN_WATER_GRAVITY: f64 = GRAVITY / 16.0;
pub const LAVA_GRAVITY: f64 = 0.02;
pub const WATER_FLOW_SCALE: f64 = 0.014;
pub const LAVA_FLOW_SCALE: f64 = 0.002_333_333_333_333_333;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Medium {
    #[default]
    Air,
    Water,
    Lava,
    Climbable,
    Web,
    BerryBush,
    PowderSnow,
    Gliding,
}

impl Medium {
    pub fn is_liquid(self) -> bool {
        matches!(self, Self::Water | Self::Lava)
    }
}

/// Inputs a medium needs to advance one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MediumEnv {
    pub on_ground: bool,
    pub ground_friction: f64,
    pub movement_speed: f64,
    pub sprinting: bool,
    /// Gravity for this tick, already adjusted for slow falling.
    pub gravity: f64,
    /// Levitation amplifier as the client applies it.
    pub levitation: Option<i32>,
}

impl Default for MediumEnv {
    fn default() -> Self {
        Self {
            on_ground: false,
            ground_friction: sg_utils::registry::DEFAULT_FRICTION,
            movement_speed: 0.1,
            sprinting: false,
            gravity: GRAVITY,
            levitation: None,
        }
    }
}

/// One medium's share of the per-tick travel routine.
pub trait MediumPhysics: Sync {
    fn medium(&self) -> Medium;

    /// Length of the input acceleration for a full-strength key press.
    fn acceleration(&self, env: &MediumEnv) -> f64;

    /// Factor carried onto the next tick's horizontal velocity.
    fn horizontal_inertia(&self, env: &MediumEnv) -> f64;

    /// Vertical velocity for the next tick, given the velocity left after the move.
    fn next_vertical(&self, vy: f64, env: &MediumEnv) -> f64;
}

pub struct LandPhysics;

impl MediumPhysics for LandPhysics {
    fn medium(&self) -> Medium {
        Medium::Air
    }

    fn acceleration(&self, env: &MediumEnv) -> f64 {
        if env.on_ground {
            let friction = env.ground_friction;
            env.movement_speed * (GROUND_ACCELERATION_SCALE / (friction * friction * friction))
        } else if env.sprinting {
            AIR_ACCELERATION_SPRINTING
        } else {
            AIR_ACCELERATION
        }
    }

    fn horizontal_inertia(&self, env: &MediumEnv) -> f64 {
        if env.on_ground {
            env.ground_friction * AIR_INERTIA
        } else {
            AIR_INERTIA
        }
    }

    fn next_vertical(&self, vy: f64, env: &MediumEnv) -> f64 {
        let vy = match env.levitation {
            Some(amplifier) => vy + (0.05 * f64::from(amplifier + 1) - vy) * 0.2,
            None => vy - env.gravity,
        };
        vy * AIR_DRAG
    }
}

pub struct WaterPhysics {
    pub modern: bool,
}

impl MediumPhysics for WaterPhysics {
    fn medium(&self) -> Medium {
        Medium::Water
    }

    fn acceleration(&self, _env: &MediumEnv) -> f64 {
        LIQUID_ACCELERATION
    }

    fn horizontal_inertia(&self, env: &MediumEnv) -> f64 {
        if self.modern && env.sprinting {
            WATER_INERTIA_SPRINTING
        } else {
            WATER_INERTIA
        }
    }

    fn next_vertical(&self, vy: f64, env: &MediumEnv) -> f64 {
        if !self.modern {
            return vy * WATER_INERTIA - LEGACY_WATER_GRAVITY;
        }
        if env.sprinting {
            vy * WATER_INERTIA
        } else {
            vy * WATER_INERTIA - env.gravity / 16.0
        }
    }
}

pub struct LavaPhysics;

impl MediumPhysics for LavaPhysics {
    fn medium(&self) -> Medium {
        Medium::Lava
    }

    fn acceleration(&self, _env: &MediumEnv) -> f64 {
        LIQUID_ACCELERATION
    }

    fn horizontal_inertia(&self, _env: &MediumEnv) -> f64 {
        LAVA_INERTIA
    }

    fn next_vertical(&self, vy: f64, _env: &MediumEnv) -> f64 {
        vy * LAVA_INERTIA - LAVA_GRAVITY
    }
}

/// Gliding applies its drag before the move, so nothing is carried over here.
pub struct GlidePhysics;

impl MediumPhysics for GlidePhysics {
    fn medium(&self) -> Medium {
        Medium::Gliding
    }

    fn acceleration(&self, _env: &MediumEnv) -> f64 {
        0.0
    }

    fn horizontal_inertia(&self, _env: &MediumEnv) -> f64 {
        1.0
    }

    fn next_vertical(&self, vy: f64, _env: &MediumEnv) -> f64 {
        vy
    }
}

static LAND: LandPhysics = LandPhysics;
static LEGACY_WATER: WaterPhysics = WaterPhysics { modern: false };
static MODERN_WATER: WaterPhysics = WaterPhysics { modern: true };
static LAVA: LavaPhysics = LavaPhysics;
static GLIDE: GlidePhysics = GlidePhysics;

/// Picks the strategy for a medium under the given version policy. Climbing and the
/// stuck media move by land rules; their extra clamps are applied by the predictors.
pub fn strategy(medium: Medium, policy: &PhysicsPolicy) -> &'static dyn MediumPhysics {
    match medium {
        Medium::Water if policy.modern_liquids => &MODERN_WATER,
        Medium::Water => &LEGACY_WATER,
        Medium::Lava => &LAVA,
        Medium::Gliding => &GLIDE,
        Medium::Air
        | Medium::Climbable
        | Medium::Web
        | Medium::BerryBush
        | Medium::PowderSnow => &LAND,
    }
}

/// Unit look vector for the given yaw and pitch in degrees.
pub fn look_vector(yaw: f32, pitch: f32) -> DVec3 {
    let yaw = f64::from(yaw).to_radians();
    let pitch = f64::from(pitch).to_radians();
    DVec3::new(
        -yaw.sin() * pitch.cos(),
        -pitch.sin(),
        yaw.cos() * pitch.cos(),
    )
}

/// Elytra velocity for this tick, starting from the velocity left by the previous move.
pub fn glide_velocity(velocity: DVec3, yaw: f32, pitch: f32, gravity: f64) -> DVec3 {
    let look = look_vector(yaw, pitch);
    let pitch_rad = f64::from(pitch).to_radians();
    let look_h = (look.x * look.x + look.z * look.z).sqrt();
    let speed_h = (velocity.x * velocity.x + velocity.z * velocity.z).sqrt();
    let look_len = look.length();
    let mut lift = pitch_rad.cos();
    lift = lift * lift * (look_len / 0.4).min(1.0);

    let mut v = velocity + DVec3::new(0.0, gravity * (-1.0 + lift * 0.75), 0.0);
    if v.y < 0.0 && look_h > 0.0 {
        let d = v.y * -0.1 * lift;
        v += DVec3::new(look.x * d / look_h, d, look.z * d / look_h);
    }
    if pitch_rad < 0.0 && look_h > 0.0 {
        let d = speed_h * -pitch_rad.sin() * 0.04;
        v += DVec3::new(-look.x * d / look_h, d * 3.2, -look.z * d / look_h);
    }
    if look_h > 0.0 {
        v.x += (look.x / look_h * speed_h - v.x) * 0.1;
        v.z += (look.z / look_h * speed_h - v.z) * 0.1;
    }
    DVec3::new(v.x * 0.99, v.y * 0.98, v.z * 0.99)
}

/// Walking speed attribute after effects and sprinting.
pub fn movement_speed(speed: Option<i32>, slowness: Option<i32>, sprinting: bool) -> f64 {
    let mut value = 0.1;
    if let Some(amplifier) = speed {
        value *= 1.0 + 0.2 * f64::from(amplifier + 1);
    }
    if let Some(amplifier) = slowness {
        value *= (1.0 - 0.15 * f64::from(amplifier + 1)).max(0.0);
    }
    if sprinting {
        value *= 1.3;
    }
    value
}
