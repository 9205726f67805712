/// A boolean that may be unknown because the client never reported it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlmostBoolean {
    Yes,
    No,
    #[default]
    Maybe,
}

impl AlmostBoolean {
    /// Pessimistic reading: only a certain yes counts.
    pub fn decide(self) -> bool {
        self == Self::Yes
    }

    /// Optimistic reading: anything but a certain no counts.
    pub fn decide_optimistically(self) -> bool {
        self != Self::No
    }

    pub fn from_bool(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }

    pub fn is_certain(self) -> bool {
        self != Self::Maybe
    }
}

impl From<bool> for AlmostBoolean {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}
