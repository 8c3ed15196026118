use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    daemon::storage::entities::{is_sentinel, Source, UsageEvent},
    report::DailyReport,
    utils::time::usage_day,
};

use super::{errors::GatewayError, state::GatewayState};

const DEFAULT_SUMMARY_LIMIT: usize = 10;

/// One entry of a browser submission: time spent on a domain since the previous submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsageEntry {
    pub domain: String,
    pub minutes: f64,
}

impl UsageEntry {
    fn validate(&self) -> Result<(), &'static str> {
        if self.domain.trim().is_empty() {
            return Err("domain is empty");
        }
        if !self.minutes.is_finite() || self.minutes < 0. {
            return Err("minutes must be a non-negative number");
        }
        Ok(())
    }
}

/// Decodes and validates a whole batch. A single bad entry rejects everything so no part of a
/// batch is ever written.
pub fn parse_batch(body: &[u8]) -> Result<Vec<UsageEntry>, GatewayError> {
    let entries =
        serde_json::from_slice::<Vec<UsageEntry>>(body).map_err(GatewayError::MalformedBatch)?;
    for (index, entry) in entries.iter().enumerate() {
        entry
            .validate()
            .map_err(|reason| GatewayError::InvalidEntry { index, reason })?;
    }
    Ok(entries)
}

pub async fn submit_usage(
    State(state): State<GatewayState>,
    body: Bytes,
) -> Result<StatusCode, GatewayError> {
    let entries = parse_batch(&body).inspect_err(|e| info!("Rejected usage batch: {e}"))?;
    let occurred_at = state.clock.time();

    let mut forwarded = 0;
    for entry in entries {
        if is_sentinel(&entry.domain) {
            debug!("Skipping placeholder entry {:?}", entry.domain);
            continue;
        }
        let name = state.aliases.resolve(&entry.domain);
        debug!("Received usage: {name} -> {:.2} minutes", entry.minutes);
        state
            .ledger
            .record(UsageEvent::new(
                name,
                Source::Browser,
                entry.minutes,
                occurred_at,
            ))
            .await;
        forwarded += 1;
    }

    info!("Accepted usage batch, forwarded {forwarded} entries");
    Ok(StatusCode::OK)
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub day: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// Ranked usage of a day, top entries per source. Defaults to today.
pub async fn summary(
    State(state): State<GatewayState>,
    Query(query): Query<SummaryQuery>,
) -> Json<DailyReport> {
    let day = query.day.unwrap_or_else(|| usage_day(state.clock.time()));
    let records = state.ledger.daily_snapshot(day).await;
    Json(DailyReport::build(
        day,
        &records,
        Some(query.limit.unwrap_or(DEFAULT_SUMMARY_LIMIT)),
    ))
}
