//! Turns a day of usage records into two ranked lists, applications and sites, and renders
//! them as a bar chart. Everything here is pure, the same input always gives the same output.

use std::fmt::Write;

use ansi_term::Colour;
use chrono::NaiveDate;
use serde::Serialize;

use crate::daemon::storage::entities::{Source, UsageRecord};

pub const BAR_WIDTH: usize = 30;
pub const NAME_WIDTH: usize = 20;
const BAR_GLYPH: &str = "▇";

/// Visual tier of a row. The first three ranks of a list get their own tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    First,
    Second,
    Third,
    Default,
}

const RANK_TIERS: [Tier; 3] = [Tier::First, Tier::Second, Tier::Third];

impl Tier {
    /// `index` is zero based.
    pub fn for_rank(index: usize) -> Tier {
        RANK_TIERS.get(index).copied().unwrap_or(Tier::Default)
    }

    pub fn colour(self) -> Colour {
        match self {
            Tier::First => Colour::Yellow,
            Tier::Second => Colour::Green,
            Tier::Third => Colour::Purple,
            Tier::Default => Colour::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub minutes: f64,
    pub bar: usize,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub day: NaiveDate,
    pub apps: Vec<RankedEntry>,
    pub sites: Vec<RankedEntry>,
}

impl DailyReport {
    /// Splits `records` by source and ranks both halves. `limit` keeps only the top entries of
    /// each list.
    pub fn build(day: NaiveDate, records: &[UsageRecord], limit: Option<usize>) -> Self {
        let (apps, sites): (Vec<_>, Vec<_>) = records
            .iter()
            .partition(|v| v.source == Source::Desktop);
        Self {
            day,
            apps: rank(apps, limit),
            sites: rank(sites, limit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.sites.is_empty()
    }

    pub fn render(&self, colours: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Productivity Report – {}\n",
            self.day.format("%B %-d, %Y")
        );
        render_section(&mut out, "App Usage (minutes):", &self.apps, colours);
        out.push('\n');
        render_section(&mut out, "Top Sites (minutes):", &self.sites, colours);
        out
    }
}

fn render_section(out: &mut String, title: &str, entries: &[RankedEntry], colours: bool) {
    let _ = writeln!(out, "{title}");
    for entry in entries {
        let name = format!("{:<NAME_WIDTH$}", entry.name);
        let bar = format!("{:<BAR_WIDTH$}", BAR_GLYPH.repeat(entry.bar));
        let (name, bar) = if colours {
            let colour = entry.tier.colour();
            (colour.paint(name).to_string(), colour.paint(bar).to_string())
        } else {
            (name, bar)
        };
        let _ = writeln!(out, "{name} {bar} {}", format_minutes(entry.minutes));
    }
}

/// Orders records by minutes, most used first, keeping the incoming order for equal values.
fn rank(mut records: Vec<&UsageRecord>, limit: Option<usize>) -> Vec<RankedEntry> {
    records.sort_by(|a, b| b.minutes.total_cmp(&a.minutes));
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    let max_minutes = records
        .iter()
        .map(|v| v.minutes)
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
        .filter(|v| *v > 0.)
        .unwrap_or(1.);

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| RankedEntry {
            name: record.name.clone(),
            minutes: record.minutes,
            bar: bar_length(record.minutes, max_minutes, BAR_WIDTH),
            tier: Tier::for_rank(index),
        })
        .collect()
}

/// Length of a bar proportional to `minutes / max_minutes`. Any positive value gets at least one
/// cell so it can't be mistaken for zero.
pub fn bar_length(minutes: f64, max_minutes: f64, width: usize) -> usize {
    if minutes <= 0. || max_minutes <= 0. {
        return 0;
    }
    let length = ((minutes / max_minutes) * width as f64) as usize;
    length.clamp(1, width)
}

/// `125` becomes `2h 5m`, `45` becomes `45m`. Fractions are rounded to whole minutes first.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round().max(0.) as u64;
    let (hours, minutes) = (total / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
