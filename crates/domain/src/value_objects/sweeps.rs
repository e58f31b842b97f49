use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_RETENTION_MONTHS: u32 = 3;

/// How long a contact stays DELIVERED before it is recycled into CLEANED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub months: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            months: DEFAULT_RETENTION_MONTHS,
        }
    }
}

impl RetentionPolicy {
    /// Deliveries strictly before the cutoff are stale. Calendar months, so the cutoff
    /// for 31 May minus 3 months clamps to 28/29 February.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepItemOutcome {
    Reset(Uuid),
    /// No longer a stale delivery when the update ran.
    Skipped(Uuid),
    Failed { id: Uuid, error: String },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ContactSweepReport {
    pub scanned: usize,
    pub reset: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failed_ids: Vec<Uuid>,
}

impl ContactSweepReport {
    pub fn record(mut self, outcome: SweepItemOutcome) -> Self {
        match outcome {
            SweepItemOutcome::Reset(_) => self.reset += 1,
            SweepItemOutcome::Skipped(_) => self.skipped += 1,
            SweepItemOutcome::Failed { id, .. } => {
                self.failed += 1;
                self.failed_ids.push(id);
            }
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SubscriptionSweepReport {
    pub expired: usize,
}
