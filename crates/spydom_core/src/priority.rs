use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("priority {0} is out of range (expected {min}..={max})", min = Priority::MIN.0, max = Priority::MAX.0)]
pub struct PriorityError(pub u8);

/// Execution tier of a task. Lower tiers run first.
///
/// Tier 1 is for passive checks that leave the DOM untouched, tier 2 for light
/// active checks, tier 3 for tasks that may change the page significantly.
/// Tiers 0 and 4 bracket those for user-supplied scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(0);
    pub const PASSIVE: Priority = Priority(1);
    pub const LIGHT: Priority = Priority(2);
    pub const INVASIVE: Priority = Priority(3);
    pub const MAX: Priority = Priority(4);

    pub fn new(value: u8) -> Result<Self, PriorityError> {
        if value > Self::MAX.0 {
            return Err(PriorityError(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every tier, ascending.
    pub fn tiers() -> impl Iterator<Item = Priority> {
        (Self::MIN.0..=Self::MAX.0).map(Priority)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::PASSIVE
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Priority {
    type Error = PriorityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
