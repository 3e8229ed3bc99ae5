use super::PublishError;
use crate::workflows::funnel::report::{RepReport, Report, ReportMode};
use crate::workflows::funnel::stats::{Conversions, Stats};
use askama::Template;

const LOST_NAME_CHARS: usize = 60;
const DEAL_NAME_CHARS: usize = 50;
const DESCRIPTION_CHARS: usize = 120;

/// Dashboard page for one report. User text is escaped by the template.
#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    report: &'a Report,
    date: String,
    scope: String,
    kpis: Vec<KpiCard>,
    conversions: Vec<ConversionCard>,
    reps: Vec<RepCard<'a>>,
    cumulative_reps: Vec<CumulativeRow<'a>>,
    loss_reasons: Vec<ReasonBar<'a>>,
}

struct KpiCard {
    color: &'static str,
    value: usize,
    label: &'static str,
}

struct ConversionCard {
    label: &'static str,
    value: String,
}

struct RepCard<'a> {
    name: &'a str,
    stats: &'a Stats,
    conversions: Vec<ConversionCard>,
    lost_deals: Vec<LostItem<'a>>,
    deals: Vec<DealItem<'a>>,
}

struct CumulativeRow<'a> {
    name: &'a str,
    conversions: Vec<ConversionCard>,
}

struct LostItem<'a> {
    name: String,
    lost_type: &'static str,
    reason: &'a str,
    description: Option<String>,
}

struct DealItem<'a> {
    name: String,
    current_stage: &'a str,
    stages: String,
}

struct ReasonBar<'a> {
    reason: &'a str,
    count: usize,
    width: String,
    share: String,
}

/// Self-contained HTML dashboard for one report.
pub fn render_dashboard(report: &Report) -> Result<String, PublishError> {
    Ok(DashboardTemplate::new(report).render()?)
}

impl<'a> DashboardTemplate<'a> {
    fn new(report: &'a Report) -> Self {
        let scope = match (&report.snapshot, report.mode) {
            (Some(snapshot), ReportMode::Snapshot) => {
                format!("cumulative as of {}", snapshot.as_of.format("%Y-%m-%d"))
            }
            _ => "same day".to_string(),
        };

        let cumulative_reps = report
            .snapshot
            .iter()
            .flat_map(|snapshot| snapshot.reps.iter())
            .map(|(name, conversions)| CumulativeRow {
                name,
                conversions: conversion_cards(conversions),
            })
            .collect();

        Self {
            report,
            date: report.date.format("%Y-%m-%d").to_string(),
            scope,
            kpis: kpi_cards(report),
            conversions: conversion_cards(&report.headline_conversions()),
            reps: report.reps.iter().map(RepCard::new).collect(),
            cumulative_reps,
            loss_reasons: reason_bars(report),
        }
    }
}

impl<'a> RepCard<'a> {
    fn new(rep: &'a RepReport) -> Self {
        let lost_deals = rep
            .lost_deals
            .iter()
            .map(|lost| LostItem {
                name: truncate(&lost.name, LOST_NAME_CHARS),
                lost_type: lost.lost_type.label(),
                reason: &lost.lost_reason,
                description: lost
                    .lost_description
                    .as_deref()
                    .map(|text| truncate(text, DESCRIPTION_CHARS)),
            })
            .collect();

        let deals = rep
            .deals
            .iter()
            .map(|deal| DealItem {
                name: truncate(&deal.name, DEAL_NAME_CHARS),
                current_stage: &deal.current_stage,
                stages: deal
                    .stage_changes
                    .iter()
                    .map(|stage| stage.label())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect();

        Self {
            name: &rep.name,
            stats: &rep.stats,
            conversions: conversion_cards(&rep.headline_conversions()),
            lost_deals,
            deals,
        }
    }
}

fn kpi_cards(report: &Report) -> Vec<KpiCard> {
    let stats = &report.summary;
    [
        ("blue", stats.new_lead, "New Leads"),
        ("purple", stats.mql, "MQL"),
        ("green", stats.sql, "SQL (Kwalka)"),
        ("green", stats.won, "Sales Won"),
        ("orange", stats.lost_before_mql, "Lost Before MQL"),
        ("red", stats.sales_lost, "Sales Lost"),
        ("red", stats.lost_total, "Lost Total"),
        ("", report.active_reps, "Active SDRs"),
    ]
    .into_iter()
    .map(|(color, value, label)| KpiCard {
        color,
        value,
        label,
    })
    .collect()
}

fn conversion_cards(conversions: &Conversions) -> Vec<ConversionCard> {
    [
        ("Lead → MQL", conversions.lead_mql),
        ("MQL → SQL", conversions.mql_sql),
        ("Lead → SQL", conversions.lead_sql),
    ]
    .into_iter()
    .map(|(label, conversion)| ConversionCard {
        label,
        value: conversion.display(),
    })
    .collect()
}

/// Bar width is relative to the most common reason, the label to all lost deals.
fn reason_bars(report: &Report) -> Vec<ReasonBar<'_>> {
    let total_lost = report.lost_deal_count().max(1);
    let widest = report
        .lost_reasons
        .iter()
        .map(|entry| entry.count)
        .max()
        .unwrap_or(1)
        .max(1);

    report
        .lost_reasons
        .iter()
        .map(|entry| ReasonBar {
            reason: &entry.reason,
            count: entry.count,
            width: format!("{:.0}", entry.count as f64 / widest as f64 * 100.0),
            share: format!("{:.0}", entry.count as f64 / total_lost as f64 * 100.0),
        })
        .collect()
}

/// First `max_chars` characters of `text`, never splitting a code point.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
