use sg_utils::Capabilities;

/// Version-dependent physics switches, resolved once per tick from the connection's
/// capabilities so the replay code never compares protocol numbers itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsPolicy {
    pub legacy_client: bool,
    pub modern_liquids: bool,
    /// Velocity components below this are zeroed before the move.
    pub negligible_momentum: f64,
    pub elytra: bool,
    pub levitation: bool,
    pub bubble_columns: bool,
    pub slow_falling: bool,
    pub berry_bush: bool,
    pub honey: bool,
    pub powder_snow: bool,
    pub amplifier_is_byte: bool,
    pub input_packet: bool,
}

impl PhysicsPolicy {
    pub fn resolve(caps: &Capabilities) -> Self {
        let legacy_client = caps.legacy_client();
        Self {
            legacy_client,
            modern_liquids: caps.modern_liquid_rules(),
            negligible_momentum: if legacy_client { 0.005 } else { 0.003 },
            elytra: caps.has_elytra(),
            levitation: caps.has_levitation(),
            bubble_columns: caps.has_bubble_columns(),
            slow_falling: caps.has_slow_falling(),
            berry_bush: caps.has_berry_bush(),
            honey: caps.has_honey(),
            powder_snow: caps.has_powder_snow(),
            amplifier_is_byte: caps.effect_amplifier_is_byte(),
            input_packet: caps.has_input_packet(),
        }
    }

    /// Amplifier as the client will apply it.
    pub fn client_amplifier(&self, amplifier: i32) -> i32 {
        if self.amplifier_is_byte {
            i32::from(amplifier as i8)
        } else {
            amplifier
        }
    }
}

impl Default for PhysicsPolicy {
    fn default() -> Self {
        Self::resolve(&Capabilities::default())
    }
}
