//!  Storage is organized through [usage_store::UsageStore].
//!  The basic idea is:
//!   - There is one row per `(name, source, day)` holding accumulated minutes.
//!   - Every producer goes through [UsageLedger::record], which is a single atomic upsert.
//!   - Reports read a whole day at once, ordered by minutes.

pub mod entities;
pub mod migrations;
pub mod usage_store;

use async_trait::async_trait;
use chrono::NaiveDate;

use entities::{UsageEvent, UsageRecord};

/// Contract shared by the window poller, the ingestion gateway and report readers.
/// Implementations absorb their own failures: a failed write is logged and dropped.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Adds `event.minutes_delta` to the record of the event key, creating it when absent.
    async fn record(&self, event: UsageEvent);

    /// Every record of `day`, most used first. Equal values keep their insertion order.
    async fn daily_snapshot(&self, day: NaiveDate) -> Vec<UsageRecord>;
}
