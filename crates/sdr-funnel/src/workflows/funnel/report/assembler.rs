use super::super::classifier::{DailyDeal, StageMembership};
use super::super::domain::NO_LOSS_REASON;
use super::super::snapshot::Snapshot;
use super::super::stats::calculate;
use super::views::{
    DealView, LossReasonCount, LostDealView, RepReport, Report, ReportMode, SnapshotConversions,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Builds a [`Report`] from the deals that moved on the report day.
#[derive(Debug, Clone)]
pub struct ReportAssembler<'a> {
    date: NaiveDate,
    generated_at: NaiveDateTime,
    snapshot: Option<&'a Snapshot>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(date: NaiveDate, generated_at: NaiveDateTime) -> Self {
        Self {
            date,
            generated_at,
            snapshot: None,
        }
    }

    /// Attach cumulative conversions, turning the output into a snapshot report.
    pub fn with_snapshot(mut self, snapshot: &'a Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn assemble(&self, deals: Vec<DailyDeal>) -> Report {
        let summary = calculate(&deals);
        let lost_reasons = LossReasonCount::tally(
            deals
                .iter()
                .filter(|deal| deal.has_lost_stage())
                .map(|deal| (loss_reason(deal), 1)),
        );

        let reps: Vec<RepReport> = group_by_rep(deals)
            .into_iter()
            .map(|(name, deals)| self.rep_report(name, deals))
            .collect();

        Report {
            date: self.date,
            generated_at: self.generated_at.format(GENERATED_AT_FORMAT).to_string(),
            mode: if self.snapshot.is_some() {
                ReportMode::Snapshot
            } else {
                ReportMode::Daily
            },
            summary,
            active_reps: reps.len(),
            reps,
            lost_reasons,
            snapshot: self.snapshot.map(|snapshot| SnapshotConversions {
                as_of: snapshot.as_of,
                conversions: snapshot.conversions(),
                reps: snapshot
                    .per_rep
                    .iter()
                    .map(|(rep, stats)| (rep.clone(), stats.conversions()))
                    .collect(),
            }),
        }
    }

    fn rep_report(&self, name: String, deals: Vec<DailyDeal>) -> RepReport {
        let stats = calculate(&deals);
        let snapshot = self
            .snapshot
            .and_then(|snapshot| snapshot.rep_conversions(&name));

        let lost_deals = deals
            .iter()
            .filter_map(|deal| {
                deal.lost_type().map(|lost_type| LostDealView {
                    name: deal.name.clone(),
                    lost_type,
                    lost_reason: loss_reason(deal).to_string(),
                    lost_description: deal
                        .lost_description
                        .clone()
                        .filter(|text| !text.trim().is_empty()),
                })
            })
            .collect();

        let deals = deals
            .into_iter()
            .map(|deal| DealView {
                current_stage: deal.current_stage.label().to_string(),
                stage_changes: deal.stage_changes.into_keys().collect(),
                name: deal.name,
            })
            .collect();

        RepReport {
            name,
            stats,
            deals,
            lost_deals,
            snapshot,
        }
    }
}

fn loss_reason(deal: &DailyDeal) -> &str {
    deal.lost_reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(NO_LOSS_REASON)
}

/// Groups deals by rep, most active first. Equal counts keep discovery order.
fn group_by_rep(deals: Vec<DailyDeal>) -> Vec<(String, Vec<DailyDeal>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<DailyDeal>)> = Vec::new();

    for deal in deals {
        match positions.get(&deal.rep) {
            Some(&index) => groups[index].1.push(deal),
            None => {
                positions.insert(deal.rep.clone(), groups.len());
                groups.push((deal.rep.clone(), vec![deal]));
            }
        }
    }

    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    groups
}
