use super::super::domain::Stage;
use super::super::stats::{Conversions, Stats};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Conversions reflect only transitions on the report day.
    Daily,
    /// Daily counts plus cumulative conversions as of the report day.
    Snapshot,
}

impl ReportMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Snapshot => "Snapshot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealView {
    pub name: String,
    pub current_stage: String,
    pub stage_changes: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostDealView {
    pub name: String,
    pub lost_type: Stage,
    pub lost_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lost_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepReport {
    pub name: String,
    pub stats: Stats,
    pub deals: Vec<DealView>,
    pub lost_deals: Vec<LostDealView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Conversions>,
}

impl RepReport {
    pub fn headline_conversions(&self) -> Conversions {
        self.snapshot.unwrap_or_else(|| self.stats.conversions())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossReasonCount {
    pub reason: String,
    pub count: usize,
}

impl LossReasonCount {
    /// Sums counts per reason, then orders by descending count. Ties keep the
    /// order in which reasons were first seen.
    pub fn tally<I, S>(entries: I) -> Vec<LossReasonCount>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let mut tallied: Vec<LossReasonCount> = Vec::new();
        for (reason, count) in entries {
            let reason = reason.as_ref();
            match tallied.iter_mut().find(|entry| entry.reason == reason) {
                Some(entry) => entry.count += count,
                None => tallied.push(LossReasonCount {
                    reason: reason.to_string(),
                    count,
                }),
            }
        }
        tallied.sort_by(|a, b| b.count.cmp(&a.count));
        tallied
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConversions {
    pub as_of: NaiveDate,
    pub conversions: Conversions,
    /// Cumulative conversions for every rep in the deal history, including
    /// reps with no stage change on the report day.
    #[serde(default)]
    pub reps: BTreeMap<String, Conversions>,
}

/// One day's funnel report, ready for serialization or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub date: NaiveDate,
    pub generated_at: String,
    pub mode: ReportMode,
    pub summary: Stats,
    pub active_reps: usize,
    pub reps: Vec<RepReport>,
    pub lost_reasons: Vec<LossReasonCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotConversions>,
}

impl Report {
    /// Cumulative conversions for snapshot reports, same-day ones otherwise.
    pub fn headline_conversions(&self) -> Conversions {
        self.snapshot
            .as_ref()
            .map(|snapshot| snapshot.conversions)
            .unwrap_or_else(|| self.summary.conversions())
    }

    pub fn rep(&self, name: &str) -> Option<&RepReport> {
        self.reps.iter().find(|rep| rep.name == name)
    }

    pub fn lost_deal_count(&self) -> usize {
        self.lost_reasons.iter().map(|entry| entry.count).sum()
    }
}

/// Several daily reports merged into a single range view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollup {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: usize,
    pub generated_at: String,
    pub summary: Stats,
    pub active_reps: usize,
    pub reps: Vec<RepReport>,
    pub lost_reasons: Vec<LossReasonCount>,
}
