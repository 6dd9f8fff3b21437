//! The due/not-due decision, including the retry-after-failure policy.

use chrono::{DateTime, Duration, Utc};

use crate::{
    clock,
    types::{Cadence, TaskRecord},
};

impl Cadence {
    /// Minimum re-run interval. Monthly is a fixed 30 days, anacron-style,
    /// not a calendar month.
    #[must_use]
    pub fn interval(self) -> Duration {
        match self {
            Cadence::Hourly => Duration::hours(1),
            Cadence::Daily => Duration::hours(24),
            Cadence::Weekly => Duration::days(7),
            Cadence::Monthly => Duration::days(30),
        }
    }
}

/// The timestamp the due check measures from.
///
/// A task whose last attempt failed waits out a full interval from that
/// attempt before retrying, unless `rerun_onfail` puts it back on the
/// success-based schedule.
fn reference_timestamp(record: &TaskRecord, rerun_onfail: bool) -> Option<&str> {
    let failed = matches!(record.last_status, Some(code) if code != 0);
    if failed && !rerun_onfail {
        record
            .last_attempt
            .as_deref()
            .or(record.last_success.as_deref())
    } else {
        record.last_success.as_deref()
    }
}

/// True if enough time has elapsed for this cadence. An absent or
/// unparsable reference always means due; the boundary (elapsed ==
/// interval) is due.
#[must_use]
pub fn is_due(
    record: &TaskRecord,
    cadence: Cadence,
    rerun_onfail: bool,
    now: DateTime<Utc>,
) -> bool {
    let Some(reference) = reference_timestamp(record, rerun_onfail) else {
        return true;
    };
    match clock::parse_iso(reference) {
        Some(last) => now - last >= cadence.interval(),
        None => true,
    }
}
