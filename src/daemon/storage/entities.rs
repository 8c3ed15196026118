use std::{fmt::Display, str::FromStr, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Placeholder names reported by the browser when there is no real page behind a tab.
pub const SENTINEL_NAMES: &[&str] = &["unknown", "newtab"];

pub fn is_sentinel(name: &str) -> bool {
    SENTINEL_NAMES.contains(&name)
}

/// Producer of a usage event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Foreground application reported by the window poller.
    Desktop,
    /// Site reported by the browser extension.
    Browser,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Desktop => "desktop",
            Source::Browser => "browser",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown usage source {0:?}")]
pub struct UnknownSource(String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Source::Desktop),
            "browser" => Ok(Source::Browser),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

impl ToSql for Source {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Source {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A single observation: `name` was in use for `minutes_delta` minutes. Names are expected to
/// be already resolved through the alias map.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub name: Arc<str>,
    pub source: Source,
    pub minutes_delta: f64,
    pub occurred_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn new(
        name: impl Into<Arc<str>>,
        source: Source,
        minutes_delta: f64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            minutes_delta,
            occurred_at,
        }
    }
}

/// Accumulated minutes of one `(name, source, day)` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub name: String,
    pub source: Source,
    #[serde(rename = "usage_date")]
    pub day: NaiveDate,
    #[serde(rename = "minutes_used")]
    pub minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::{is_sentinel, Source};

    #[test]
    fn sources_parse_back() {
        for source in [Source::Desktop, Source::Browser] {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert!("chrome".parse::<Source>().is_err());
    }

    #[test]
    fn sentinels() {
        assert!(is_sentinel("newtab"));
        assert!(is_sentinel("unknown"));
        assert!(!is_sentinel("github.com"));
        assert!(!is_sentinel("Unknown"));
    }
}
