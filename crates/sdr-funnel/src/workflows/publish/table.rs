use super::PublishError;
use crate::workflows::funnel::report::Report;
use crate::workflows::funnel::stats::{Conversions, Stats};
use serde::Serialize;
use std::io::Write;

const TOTALS_LABEL: &str = "Total";

#[derive(Debug, Serialize)]
struct RepRow<'a> {
    #[serde(rename = "SDR")]
    rep: &'a str,
    #[serde(rename = "Deals")]
    total: usize,
    #[serde(rename = "New Lead")]
    new_lead: usize,
    #[serde(rename = "MQL")]
    mql: usize,
    #[serde(rename = "SQL")]
    sql: usize,
    #[serde(rename = "Won")]
    won: usize,
    #[serde(rename = "Lost Before MQL")]
    lost_before_mql: usize,
    #[serde(rename = "Sales Lost")]
    sales_lost: usize,
    #[serde(rename = "Lead to MQL")]
    lead_mql: String,
    #[serde(rename = "MQL to SQL")]
    mql_sql: String,
    #[serde(rename = "Lead to SQL")]
    lead_sql: String,
}

impl<'a> RepRow<'a> {
    fn new(rep: &'a str, stats: &Stats, conversions: Conversions) -> Self {
        Self {
            rep,
            total: stats.total,
            new_lead: stats.new_lead,
            mql: stats.mql,
            sql: stats.sql,
            won: stats.won,
            lost_before_mql: stats.lost_before_mql,
            sales_lost: stats.sales_lost,
            lead_mql: conversions.lead_mql.display(),
            mql_sql: conversions.mql_sql.display(),
            lead_sql: conversions.lead_sql.display(),
        }
    }
}

/// One CSV row per rep in report order, then a totals row.
pub fn write_rep_csv<W: Write>(report: &Report, writer: W) -> Result<(), PublishError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for rep in &report.reps {
        csv_writer.serialize(RepRow::new(&rep.name, &rep.stats, rep.headline_conversions()))?;
    }
    csv_writer.serialize(RepRow::new(
        TOTALS_LABEL,
        &report.summary,
        report.headline_conversions(),
    ))?;

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
