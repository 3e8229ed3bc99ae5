use super::classifier::{classify_as_of, CumulativeDeal};
use super::domain::{Deal, RepDirectory, RepExclusions};
use super::stats::{calculate, Conversions, Stats};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Funnel state as it stood at the end of `as_of`, over the whole deal history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub as_of: NaiveDate,
    pub totals: Stats,
    pub per_rep: BTreeMap<String, Stats>,
}

impl Snapshot {
    pub fn conversions(&self) -> Conversions {
        self.totals.conversions()
    }

    pub fn rep_conversions(&self, rep: &str) -> Option<Conversions> {
        self.per_rep.get(rep).map(Stats::conversions)
    }
}

/// Cumulative counts and conversions using "entered on or before `as_of`".
///
/// Unlike the daily calculation this looks at every deal ever seen, so a deal
/// that reached MQL weeks earlier still counts toward the MQL total.
pub fn snapshot(
    all_deals: &[Deal],
    reps: &RepDirectory,
    exclusions: &RepExclusions,
    as_of: NaiveDate,
) -> Snapshot {
    let members = classify_as_of(all_deals, reps, exclusions, as_of);
    let totals = calculate(&members);

    let mut by_rep: BTreeMap<String, Vec<CumulativeDeal>> = BTreeMap::new();
    for member in members {
        by_rep.entry(member.rep.clone()).or_default().push(member);
    }

    let per_rep = by_rep
        .into_iter()
        .map(|(rep, deals)| (rep, calculate(&deals)))
        .collect();

    Snapshot {
        as_of,
        totals,
        per_rep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::funnel::classifier::classify_day;
    use crate::workflows::funnel::domain::{CurrentStage, Stage};

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
    }

    fn deal(owner: &str, entered: &[(Stage, &str)]) -> Deal {
        Deal {
            id: owner.to_string(),
            name: owner.to_string(),
            current_stage: CurrentStage::Known(Stage::Mql),
            owner_id: Some(owner.to_string()),
            entered: entered
                .iter()
                .map(|(stage, ts)| (*stage, ts.to_string()))
                .collect(),
            lost_reason: None,
            lost_description: None,
        }
    }

    fn reps() -> RepDirectory {
        [("ann", "Ann"), ("bob", "Bob")].into_iter().collect()
    }

    #[test]
    fn earlier_mql_counts_cumulatively_but_not_daily() {
        let deals = vec![deal(
            "ann",
            &[
                (Stage::NewLead, "2026-02-05T09:00:00Z"),
                (Stage::Mql, "2026-02-05T10:00:00Z"),
            ],
        )];
        let as_of = day("2026-02-10");

        let snap = snapshot(&deals, &reps(), &RepExclusions::none(), as_of);
        assert_eq!(snap.totals.mql, 1);
        assert_eq!(snap.conversions().lead_mql.display(), "1/1 (100%)");

        let daily = classify_day(&deals, &reps(), &RepExclusions::none(), as_of);
        let daily_stats = calculate(&daily);
        assert_eq!(daily_stats.mql, 0);
        assert_eq!(daily_stats.lead_mql.display(), "-");
    }

    #[test]
    fn reps_come_from_full_history() {
        let deals = vec![
            deal("ann", &[(Stage::NewLead, "2026-01-05T09:00:00Z")]),
            deal(
                "bob",
                &[
                    (Stage::NewLead, "2026-02-01T09:00:00Z"),
                    (Stage::Mql, "2026-02-02T09:00:00Z"),
                ],
            ),
        ];

        let snap = snapshot(&deals, &reps(), &RepExclusions::none(), day("2026-02-01"));
        assert_eq!(snap.per_rep.len(), 2);
        assert_eq!(
            snap.rep_conversions("Bob").map(|c| c.lead_mql.display()),
            Some("0/1 (0%)".to_string())
        );
        assert_eq!(
            snap.rep_conversions("Ann").map(|c| c.mql_sql.display()),
            Some("-".to_string())
        );
        assert!(snap.rep_conversions("Carol").is_none());
    }

    #[test]
    fn cumulative_counts_never_decrease_over_time() {
        let deals = vec![
            deal(
                "ann",
                &[
                    (Stage::NewLead, "2026-02-01T09:00:00Z"),
                    (Stage::Mql, "2026-02-03T09:00:00Z"),
                    (Stage::Sql, "2026-02-06T09:00:00Z"),
                ],
            ),
            deal("bob", &[(Stage::NewLead, "2026-02-04T09:00:00Z")]),
        ];

        let mut previous = Stats::default();
        for offset in 0..8 {
            let as_of = day("2026-02-01") + chrono::Duration::days(offset);
            let snap = snapshot(&deals, &reps(), &RepExclusions::none(), as_of);
            assert!(snap.totals.new_lead >= previous.new_lead);
            assert!(snap.totals.mql >= previous.mql);
            assert!(snap.totals.sql >= previous.sql);
            previous = snap.totals;
        }
        assert_eq!(previous.lead_sql.display(), "1/2 (50%)");
    }

    #[test]
    fn empty_history_is_valid() {
        let snap = snapshot(&[], &reps(), &RepExclusions::none(), day("2026-02-01"));
        assert!(snap.per_rep.is_empty());
        assert_eq!(snap.conversions().lead_mql.display(), "-");
    }
}
