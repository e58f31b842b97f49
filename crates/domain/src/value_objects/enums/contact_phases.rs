use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a shared contact.
///
/// The usual path is `Raw -> Cleaned -> Delivering -> Delivered`, after which the
/// retention sweep moves the contact back to `Cleaned`. Transitions are not validated
/// against this order; callers pick the target.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactPhase {
    #[default]
    Raw,
    Cleaned,
    Delivering,
    Delivered,
}

impl ContactPhase {
    pub const ALL: [ContactPhase; 4] = [
        ContactPhase::Raw,
        ContactPhase::Cleaned,
        ContactPhase::Delivering,
        ContactPhase::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactPhase::Raw => "RAW",
            ContactPhase::Cleaned => "CLEANED",
            ContactPhase::Delivering => "DELIVERING",
            ContactPhase::Delivered => "DELIVERED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "RAW" => Some(ContactPhase::Raw),
            "CLEANED" => Some(ContactPhase::Cleaned),
            "DELIVERING" => Some(ContactPhase::Delivering),
            "DELIVERED" => Some(ContactPhase::Delivered),
            _ => None,
        }
    }

    /// Computes `delivered_at` after moving a contact from `current` into `self`.
    ///
    /// The stamp is never cleared. Entering `Delivered` stamps `now` when there is no
    /// previous stamp or when the contact is coming back from another phase; staying in
    /// `Delivered` keeps the existing stamp.
    pub fn delivered_at_after_transition(
        self,
        current: ContactPhase,
        existing: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if self != ContactPhase::Delivered {
            return existing;
        }

        match existing {
            Some(stamp) if current == ContactPhase::Delivered => Some(stamp),
            _ => Some(now),
        }
    }
}

impl Display for ContactPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
