use super::super::stats::Stats;
use super::views::{LossReasonCount, RepReport, Report, Rollup};
use std::collections::HashMap;

/// Merges daily reports into one range view (week or month dashboards).
///
/// Counts and conversion numerators are summed day by day, so a rollup shows
/// transitions within the range rather than cumulative snapshot conversions.
pub fn rollup(reports: &[Report]) -> Option<Rollup> {
    let first = reports.first()?;
    let last = reports.last()?;

    let mut summary = Stats::default();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut reps: Vec<RepReport> = Vec::new();

    for report in reports {
        summary.merge(&report.summary);

        for rep in &report.reps {
            match positions.get(&rep.name) {
                Some(&index) => {
                    let merged = &mut reps[index];
                    merged.stats.merge(&rep.stats);
                    merged.deals.extend(rep.deals.iter().cloned());
                    merged.lost_deals.extend(rep.lost_deals.iter().cloned());
                }
                None => {
                    positions.insert(rep.name.clone(), reps.len());
                    reps.push(RepReport {
                        snapshot: None,
                        ..rep.clone()
                    });
                }
            }
        }
    }

    reps.sort_by(|a, b| b.stats.total.cmp(&a.stats.total));

    let lost_reasons = LossReasonCount::tally(reports.iter().flat_map(|report| {
        report
            .lost_reasons
            .iter()
            .map(|entry| (entry.reason.as_str(), entry.count))
    }));

    let from = reports.iter().map(|report| report.date).min().unwrap_or(first.date);
    let to = reports.iter().map(|report| report.date).max().unwrap_or(last.date);

    Some(Rollup {
        from,
        to,
        days: reports.len(),
        generated_at: last.generated_at.clone(),
        summary,
        active_reps: reps.len(),
        reps,
        lost_reasons,
    })
}
