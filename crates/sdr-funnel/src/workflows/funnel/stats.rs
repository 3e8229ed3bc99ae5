use super::classifier::StageMembership;
use super::domain::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered in place of a ratio whose denominator is zero.
pub const NO_DATA: &str = "-";

/// Share of deals reaching a source stage that also reached a target stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ConversionRecord", from = "ConversionRecord")]
pub struct Conversion {
    pub numerator: usize,
    pub denominator: usize,
}

impl Conversion {
    pub const fn new(numerator: usize, denominator: usize) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Percentage as a float, `None` when there is nothing to divide by.
    pub fn ratio_pct(&self) -> Option<f64> {
        (self.denominator > 0).then(|| self.numerator as f64 / self.denominator as f64 * 100.0)
    }

    /// `"n/d (p%)"`, or [`NO_DATA`] when `d` is zero. A zero numerator over a
    /// non-zero denominator still renders as `"0/d (0%)"`.
    pub fn display(&self) -> String {
        self.to_string()
    }

    pub fn merge(&mut self, other: &Conversion) {
        self.numerator += other.numerator;
        self.denominator += other.denominator;
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ratio_pct() {
            Some(pct) => write!(f, "{}/{} ({:.0}%)", self.numerator, self.denominator, pct),
            None => f.write_str(NO_DATA),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ConversionRecord {
    numerator: usize,
    denominator: usize,
    #[serde(default, skip_deserializing)]
    display: String,
}

impl From<Conversion> for ConversionRecord {
    fn from(value: Conversion) -> Self {
        Self {
            numerator: value.numerator,
            denominator: value.denominator,
            display: value.display(),
        }
    }
}

impl From<ConversionRecord> for Conversion {
    fn from(value: ConversionRecord) -> Self {
        Self::new(value.numerator, value.denominator)
    }
}

/// The three named conversion pairs tracked by the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversions {
    pub lead_mql: Conversion,
    pub mql_sql: Conversion,
    pub lead_sql: Conversion,
}

/// Funnel counts and conversions for one scope (everyone, or a single rep).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub new_lead: usize,
    pub mql: usize,
    pub sql: usize,
    pub won: usize,
    pub lost_before_mql: usize,
    pub sales_lost: usize,
    pub lost_total: usize,
    pub lead_mql: Conversion,
    pub mql_sql: Conversion,
    pub lead_sql: Conversion,
}

impl Stats {
    pub fn conversions(&self) -> Conversions {
        Conversions {
            lead_mql: self.lead_mql,
            mql_sql: self.mql_sql,
            lead_sql: self.lead_sql,
        }
    }

    /// Adds another scope's counts. Conversions keep raw numerators and
    /// denominators so ratios stay exact across merges.
    pub fn merge(&mut self, other: &Stats) {
        self.total += other.total;
        self.new_lead += other.new_lead;
        self.mql += other.mql;
        self.sql += other.sql;
        self.won += other.won;
        self.lost_before_mql += other.lost_before_mql;
        self.sales_lost += other.sales_lost;
        self.lost_total += other.lost_total;
        self.lead_mql.merge(&other.lead_mql);
        self.mql_sql.merge(&other.mql_sql);
        self.lead_sql.merge(&other.lead_sql);
    }
}

/// Stage counts and conversion pairs over `deals`.
///
/// Counting is by stage presence, so a deal that moved through several
/// stages in the window counts toward each of them.
pub fn calculate<D: StageMembership>(deals: &[D]) -> Stats {
    let count = |stage: Stage| deals.iter().filter(|deal| deal.has_stage(stage)).count();
    let pair = |from: Stage, to: Stage| {
        let denominator = count(from);
        let numerator = deals
            .iter()
            .filter(|deal| deal.has_stage(from) && deal.has_stage(to))
            .count();
        Conversion::new(numerator, denominator)
    };

    let lost_before_mql = count(Stage::LostBeforeMql);
    let sales_lost = count(Stage::SalesLost);

    Stats {
        total: deals.len(),
        new_lead: count(Stage::NewLead),
        mql: count(Stage::Mql),
        sql: count(Stage::Sql),
        won: count(Stage::SalesWon),
        lost_before_mql,
        sales_lost,
        lost_total: lost_before_mql + sales_lost,
        lead_mql: pair(Stage::NewLead, Stage::Mql),
        mql_sql: pair(Stage::Mql, Stage::Sql),
        lead_sql: pair(Stage::NewLead, Stage::Sql),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    struct Member(BTreeSet<Stage>);

    impl StageMembership for Member {
        fn has_stage(&self, stage: Stage) -> bool {
            self.0.contains(&stage)
        }
    }

    fn member(stages: &[Stage]) -> Member {
        Member(stages.iter().copied().collect())
    }

    #[test]
    fn lead_and_mql_same_day_converts_fully() {
        let stats = calculate(&[member(&[Stage::NewLead, Stage::Mql])]);
        assert_eq!(stats.new_lead, 1);
        assert_eq!(stats.mql, 1);
        assert_eq!(stats.lead_mql.display(), "1/1 (100%)");
    }

    #[test]
    fn zero_numerator_differs_from_zero_denominator() {
        let stats = calculate(&[member(&[Stage::NewLead])]);
        assert_eq!(stats.lead_mql.display(), "0/1 (0%)");
        assert_eq!(stats.mql_sql.display(), "-");
        assert_eq!(stats.lead_sql.display(), "0/1 (0%)");
    }

    #[test]
    fn empty_input_yields_zero_counts_and_sentinels() {
        let stats = calculate::<Member>(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.lost_total, 0);
        for conversion in [stats.lead_mql, stats.mql_sql, stats.lead_sql] {
            assert_eq!(conversion.display(), NO_DATA);
            assert_eq!(conversion.ratio_pct(), None);
        }
    }

    #[test]
    fn numerators_never_exceed_either_stage_count() {
        let deals = vec![
            member(&[Stage::NewLead, Stage::Mql, Stage::Sql]),
            member(&[Stage::Mql, Stage::Sql]),
            member(&[Stage::Sql]),
            member(&[Stage::NewLead, Stage::LostBeforeMql]),
            member(&[Stage::SalesLost]),
        ];
        let stats = calculate(&deals);

        assert!(stats.lead_mql.numerator <= stats.new_lead.min(stats.mql));
        assert!(stats.mql_sql.numerator <= stats.mql.min(stats.sql));
        assert!(stats.lead_sql.numerator <= stats.new_lead.min(stats.sql));
        assert_eq!(stats.mql_sql.display(), "2/2 (100%)");
        assert_eq!(stats.lead_sql.display(), "1/2 (50%)");
        assert_eq!(stats.lost_total, 2);
    }

    #[test]
    fn percentages_round_to_whole_numbers() {
        assert_eq!(Conversion::new(1, 3).display(), "1/3 (33%)");
        assert_eq!(Conversion::new(2, 3).display(), "2/3 (67%)");
    }

    #[test]
    fn calculation_is_repeatable() {
        let deals = vec![member(&[Stage::NewLead, Stage::Mql]), member(&[Stage::Sql])];
        assert_eq!(calculate(&deals), calculate(&deals));
    }

    #[test]
    fn conversion_serializes_with_display() {
        let value = serde_json::to_value(Conversion::new(0, 0)).expect("serialize");
        assert_eq!(value["display"], "-");
        let parsed: Conversion =
            serde_json::from_value(serde_json::json!({"numerator": 2, "denominator": 4}))
                .expect("deserialize");
        assert_eq!(parsed.display(), "2/4 (50%)");
    }

    #[test]
    fn merge_sums_counts_and_ratios() {
        let mut left = calculate(&[member(&[Stage::NewLead, Stage::Mql])]);
        let right = calculate(&[member(&[Stage::NewLead])]);
        left.merge(&right);
        assert_eq!(left.total, 2);
        assert_eq!(left.lead_mql.display(), "1/2 (50%)");
    }
}
