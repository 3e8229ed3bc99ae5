use super::dates;
use super::domain::{CurrentStage, Deal, RepDirectory, RepExclusions, Stage};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Whether a classified deal counts toward a stage in its aggregation window.
pub trait StageMembership {
    fn has_stage(&self, stage: Stage) -> bool;

    fn has_lost_stage(&self) -> bool {
        self.has_stage(Stage::SalesLost) || self.has_stage(Stage::LostBeforeMql)
    }
}

/// A deal that entered at least one stage on the report day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyDeal {
    pub name: String,
    pub current_stage: CurrentStage,
    pub rep: String,
    /// Stages entered on the report day, in pipeline order.
    pub stage_changes: BTreeMap<Stage, String>,
    pub lost_reason: Option<String>,
    pub lost_description: Option<String>,
}

impl DailyDeal {
    /// Sales Lost takes precedence when a deal hit both lost branches.
    pub fn lost_type(&self) -> Option<Stage> {
        if self.has_stage(Stage::SalesLost) {
            Some(Stage::SalesLost)
        } else if self.has_stage(Stage::LostBeforeMql) {
            Some(Stage::LostBeforeMql)
        } else {
            None
        }
    }
}

impl StageMembership for DailyDeal {
    fn has_stage(&self, stage: Stage) -> bool {
        self.stage_changes.contains_key(&stage)
    }
}

/// A deal's stage membership as it stood on an as-of date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeDeal {
    pub rep: String,
    pub entered: BTreeSet<Stage>,
}

impl StageMembership for CumulativeDeal {
    fn has_stage(&self, stage: Stage) -> bool {
        self.entered.contains(&stage)
    }
}

/// Deals that transitioned into any stage on `day`, excluded reps removed.
pub fn classify_day(
    deals: &[Deal],
    reps: &RepDirectory,
    exclusions: &RepExclusions,
    day: NaiveDate,
) -> Vec<DailyDeal> {
    included(deals, reps, exclusions)
        .filter_map(|(deal, rep)| {
            let stage_changes: BTreeMap<Stage, String> = Stage::ordered()
                .into_iter()
                .filter_map(|stage| {
                    let timestamp = deal.entered_at(stage);
                    dates::matches(timestamp, day)
                        .then(|| (stage, timestamp.unwrap_or_default().to_string()))
                })
                .collect();

            if stage_changes.is_empty() {
                return None;
            }

            Some(DailyDeal {
                name: deal.name.clone(),
                current_stage: deal.current_stage.clone(),
                rep: rep.to_string(),
                stage_changes,
                lost_reason: deal.lost_reason.clone(),
                lost_description: deal.lost_description.clone(),
            })
        })
        .collect()
}

/// Stage membership of every deal as of `as_of`, excluded reps removed.
/// Deals that had not entered any stage yet are skipped.
pub fn classify_as_of(
    deals: &[Deal],
    reps: &RepDirectory,
    exclusions: &RepExclusions,
    as_of: NaiveDate,
) -> Vec<CumulativeDeal> {
    included(deals, reps, exclusions)
        .filter_map(|(deal, rep)| {
            let entered: BTreeSet<Stage> = Stage::ordered()
                .into_iter()
                .filter(|stage| dates::entered_by(deal.entered_at(*stage), as_of))
                .collect();

            (!entered.is_empty()).then(|| CumulativeDeal {
                rep: rep.to_string(),
                entered,
            })
        })
        .collect()
}

fn included<'a>(
    deals: &'a [Deal],
    reps: &'a RepDirectory,
    exclusions: &'a RepExclusions,
) -> impl Iterator<Item = (&'a Deal, &'a str)> {
    deals
        .iter()
        .map(move |deal| (deal, reps.resolve(deal.owner_id.as_deref())))
        .filter(move |(_, rep)| !exclusions.contains(rep))
}
