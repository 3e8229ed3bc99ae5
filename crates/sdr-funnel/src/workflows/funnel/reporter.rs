use super::classifier::classify_day;
use super::dates::active_dates;
use super::domain::RepExclusions;
use super::report::{Report, ReportAssembler};
use super::snapshot::snapshot;
use crate::workflows::hubspot::{CrmError, DealScope, DealSource};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

/// Runs report passes against a deal source.
#[derive(Debug, Clone)]
pub struct FunnelReporter<S> {
    source: S,
    exclusions: RepExclusions,
}

impl<S: DealSource> FunnelReporter<S> {
    pub fn new(source: S, exclusions: RepExclusions) -> Self {
        Self { source, exclusions }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Same-day report for `day` from deals modified on that day.
    pub async fn daily(
        &self,
        day: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> Result<Report, CrmError> {
        let reps = self.source.owners().await?;
        let deals = self.source.deals(DealScope::ModifiedOn(day)).await?;

        let moved = classify_day(&deals, &reps, &self.exclusions, day);
        info!(
            %day,
            fetched = deals.len(),
            with_changes = moved.len(),
            "classified daily stage changes"
        );

        Ok(ReportAssembler::new(day, generated_at).assemble(moved))
    }

    /// Snapshot reports for every day in `[from, to]` with stage activity.
    ///
    /// The whole pipeline is fetched once; each day gets its own daily stage
    /// changes plus cumulative conversions as of that day.
    pub async fn backfill(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> Result<Vec<Report>, CrmError> {
        if from > to {
            warn!(%from, %to, "empty backfill range");
            return Ok(Vec::new());
        }

        let reps = self.source.owners().await?;
        let deals = self.source.deals(DealScope::EntirePipeline).await?;
        let days = active_dates(&deals, from, to);
        info!(
            %from,
            %to,
            deals = deals.len(),
            active_days = days.len(),
            "starting backfill"
        );

        let reports = days
            .into_iter()
            .map(|day| {
                let cumulative = snapshot(&deals, &reps, &self.exclusions, day);
                let moved = classify_day(&deals, &reps, &self.exclusions, day);
                let report = ReportAssembler::new(day, generated_at)
                    .with_snapshot(&cumulative)
                    .assemble(moved);
                info!(
                    %day,
                    deals = report.summary.total,
                    reps = report.active_reps,
                    "assembled snapshot report"
                );
                report
            })
            .collect();

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::funnel::domain::{CurrentStage, Deal, RepDirectory, Stage};
    use crate::workflows::funnel::report::ReportMode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        deals: Vec<Deal>,
        scopes: Mutex<Vec<DealScope>>,
    }

    impl DealSource for FakeSource {
        async fn owners(&self) -> Result<RepDirectory, CrmError> {
            Ok([("1", "Ann"), ("2", "Damian Jagusiak"), ("3", "Bob")]
                .into_iter()
                .collect())
        }

        async fn deals(&self, scope: DealScope) -> Result<Vec<Deal>, CrmError> {
            self.scopes.lock().expect("scopes lock").push(scope);
            Ok(self.deals.clone())
        }
    }

    fn deal(id: &str, owner: &str, entered: &[(Stage, &str)]) -> Deal {
        Deal {
            id: id.to_string(),
            name: format!("Deal {id}"),
            current_stage: CurrentStage::Known(entered.last().map(|(s, _)| *s).unwrap_or(Stage::NewLead)),
            owner_id: Some(owner.to_string()),
            entered: entered
                .iter()
                .map(|(stage, ts)| (*stage, ts.to_string()))
                .collect(),
            lost_reason: None,
            lost_description: None,
        }
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
    }

    fn generated() -> NaiveDateTime {
        day("2026-02-10").and_hms_opt(7, 0, 0).expect("valid time")
    }

    fn reporter(deals: Vec<Deal>) -> FunnelReporter<FakeSource> {
        FunnelReporter::new(
            FakeSource {
                deals,
                ..FakeSource::default()
            },
            ["Damian Jagusiak"].into_iter().collect(),
        )
    }

    #[tokio::test]
    async fn daily_requests_modified_scope_and_drops_excluded_reps() {
        let reporter = reporter(vec![
            deal("a", "1", &[(Stage::NewLead, "2026-02-03T09:00:00Z")]),
            deal("b", "2", &[(Stage::NewLead, "2026-02-03T10:00:00Z")]),
            deal("c", "1", &[(Stage::NewLead, "2026-02-02T10:00:00Z")]),
        ]);

        let report = reporter
            .daily(day("2026-02-03"), generated())
            .await
            .expect("daily report");

        assert_eq!(report.mode, ReportMode::Daily);
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.reps[0].name, "Ann");
        assert!(report.rep("Damian Jagusiak").is_none());
        assert_eq!(
            *reporter.source().scopes.lock().expect("scopes lock"),
            vec![DealScope::ModifiedOn(day("2026-02-03"))]
        );
    }

    #[tokio::test]
    async fn backfill_builds_one_snapshot_report_per_active_day() {
        let reporter = reporter(vec![
            deal(
                "a",
                "1",
                &[
                    (Stage::NewLead, "2026-02-01T09:00:00Z"),
                    (Stage::Mql, "2026-02-03T09:00:00Z"),
                ],
            ),
            deal("b", "1", &[(Stage::NewLead, "2026-02-03T11:00:00Z")]),
            deal("c", "1", &[(Stage::NewLead, "2026-03-01T11:00:00Z")]),
        ]);

        let reports = reporter
            .backfill(day("2026-02-01"), day("2026-02-28"), generated())
            .await
            .expect("backfill");

        let dates: Vec<NaiveDate> = reports.iter().map(|report| report.date).collect();
        assert_eq!(dates, vec![day("2026-02-01"), day("2026-02-03")]);
        assert!(reports.iter().all(|report| report.mode == ReportMode::Snapshot));

        let third = &reports[1];
        assert_eq!(third.summary.total, 2);
        assert_eq!(third.headline_conversions().lead_mql.display(), "1/2 (50%)");
        assert_eq!(
            *reporter.source().scopes.lock().expect("scopes lock"),
            vec![DealScope::EntirePipeline]
        );
    }

    #[tokio::test]
    async fn backfill_keeps_cumulative_conversions_of_idle_reps() {
        let reporter = reporter(vec![
            deal(
                "a",
                "1",
                &[
                    (Stage::NewLead, "2026-02-01T09:00:00Z"),
                    (Stage::Mql, "2026-02-02T09:00:00Z"),
                ],
            ),
            deal("b", "3", &[(Stage::NewLead, "2026-02-05T11:00:00Z")]),
            deal("c", "2", &[(Stage::NewLead, "2026-02-05T12:00:00Z")]),
        ]);

        let reports = reporter
            .backfill(day("2026-02-05"), day("2026-02-05"), generated())
            .await
            .expect("backfill");

        let report = &reports[0];
        let names: Vec<&str> = report.reps.iter().map(|rep| rep.name.as_str()).collect();
        assert_eq!(names, vec!["Bob"]);

        let snapshot = report.snapshot.as_ref().expect("snapshot report");
        let reps: Vec<&str> = snapshot.reps.keys().map(String::as_str).collect();
        assert_eq!(reps, vec!["Ann", "Bob"]);
        assert_eq!(snapshot.reps["Ann"].lead_mql.display(), "1/1 (100%)");
        assert_eq!(snapshot.reps["Bob"].lead_mql.display(), "0/1 (0%)");

        let json = serde_json::to_value(report).expect("report serializes");
        assert_eq!(
            json["snapshot"]["reps"]["Ann"]["lead_mql"]["display"],
            "1/1 (100%)"
        );
        assert!(json["snapshot"]["reps"].get("Damian Jagusiak").is_none());
    }

    #[tokio::test]
    async fn inverted_range_yields_nothing() {
        let reporter = reporter(Vec::new());
        let reports = reporter
            .backfill(day("2026-02-05"), day("2026-02-01"), generated())
            .await
            .expect("backfill");
        assert!(reports.is_empty());
        assert!(reporter.source().scopes.lock().expect("scopes lock").is_empty());
    }
}
