// https://wiki.vg/Protocol_version_numbers#Versions_after_the_Netty_rewrite

pub const PROTOCOL_1_8: i32 = 47;
pub const PROTOCOL_1_9: i32 = 107;
pub const PROTOCOL_1_13: i32 = 393;
pub const PROTOCOL_1_14: i32 = 477;
pub const PROTOCOL_1_15: i32 = 573;
pub const PROTOCOL_1_17: i32 = 755;
pub const PROTOCOL_1_20_5: i32 = 766;
pub const PROTOCOL_1_21: i32 = 767;
pub const PROTOCOL_1_21_2: i32 = 768;

pub const LATEST_PROTOCOL: i32 = PROTOCOL_1_21_2;

pub fn protocol_name_to_protocol_version(s: &str) -> Option<i32> {
    let version = match s {
        "" => LATEST_PROTOCOL,
        "1.21.3" | "1.21.2" => 768,
        "1.21.1" | "1.21" => 767,
        "1.20.6" | "1.20.5" => 766,
        "1.20.4" | "1.20.3" => 765,
        "1.20.2" => 764,
        "1.20.1" | "1.20" => 763,
        "1.19.4" => 762,
        "1.19" => 759,
        "1.18.2" => 758,
        "1.18.1" | "1.18" => 757,
        "1.17.1" => 756,
        "1.17" => 755,
        "1.16.5" | "1.16.4" => 754,
        "1.16.3" => 753,
        "1.16.2" => 751,
        "1.16.1" => 736,
        "1.16" => 735,
        "1.15.2" => 578,
        "1.15.1" => 575,
        "1.15" => 573,
        "1.14.4" => 498,
        "1.14.3" => 490,
        "1.14.2" => 485,
        "1.14.1" => 480,
        "1.14" => 477,
        "1.13.2" => 404,
        "1.13" => 393,
        "1.12.2" => 340,
        "1.11.2" => 316,
        "1.11" => 315,
        "1.10.2" => 210,
        "1.9.2" => 109,
        "1.9" => 107,
        "1.8.9" | "1.8" => 47,
        "1.7.10" => 5,
        _ => return s.parse::<i32>().ok(),
    };
    Some(version)
}

/// Version facts for one player connection. The movement checks only ever read these
/// predicates; detection of the actual versions happens in the network layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub server_protocol: i32,
    pub client_protocol: i32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::uniform(LATEST_PROTOCOL)
    }
}

impl Capabilities {
    pub fn uniform(protocol: i32) -> Self {
        Self {
            server_protocol: protocol,
            client_protocol: protocol,
        }
    }

    /// A world feature only behaves like the newer version when both sides know it.
    fn both_at_least(&self, protocol: i32) -> bool {
        self.server_protocol >= protocol && self.client_protocol >= protocol
    }

    pub fn legacy_client(&self) -> bool {
        self.client_protocol < PROTOCOL_1_9
    }

    pub fn modern_liquid_rules(&self) -> bool {
        self.client_protocol >= PROTOCOL_1_13
    }

    pub fn has_elytra(&self) -> bool {
        self.both_at_least(PROTOCOL_1_9)
    }

    pub fn has_levitation(&self) -> bool {
        self.both_at_least(PROTOCOL_1_9)
    }

    pub fn has_bubble_columns(&self) -> bool {
        self.both_at_least(PROTOCOL_1_13)
    }

    pub fn has_slow_falling(&self) -> bool {
        self.both_at_least(PROTOCOL_1_13)
    }

    pub fn has_berry_bush(&self) -> bool {
        self.both_at_least(PROTOCOL_1_14)
    }

    pub fn has_honey(&self) -> bool {
        self.both_at_least(PROTOCOL_1_15)
    }

    pub fn has_powder_snow(&self) -> bool {
        self.both_at_least(PROTOCOL_1_17)
    }

    /// Effect amplifiers travel as a signed byte, so levels above 127 wrap negative.
    pub fn effect_amplifier_is_byte(&self) -> bool {
        self.client_protocol < PROTOCOL_1_20_5
    }

    /// Clients from 1.21.2 report their raw movement keys every tick.
    pub fn has_input_packet(&self) -> bool {
        self.client_protocol >= PROTOCOL_1_21_2
    }
}
