use std::path::PathBuf;

use chrono::NaiveDate;
use sdr_funnel::workflows::funnel::{rollup, FunnelReporter, RepExclusions, StageTable};
use sdr_funnel::workflows::hubspot::FileDealSource;
use sdr_funnel::workflows::publish::{render_dashboard, write_rep_csv, ReportStore};

const EXPORT: &str = r#"{
    "owners": [
        { "id": "1", "firstName": "Ann", "lastName": "Nowak" },
        { "id": "2", "firstName": "Bob", "lastName": "Kowalski" },
        { "id": "9", "firstName": "Damian", "lastName": "Jagusiak" }
    ],
    "deals": [
        { "id": "10", "properties": {
            "dealname": "Acme", "dealstage": "344689652", "hubspot_owner_id": "1",
            "hs_lastmodifieddate": "2026-02-02T11:00:00Z",
            "hs_v2_date_entered_344689645": "2026-02-02T08:00:00Z",
            "hs_v2_date_entered_344689652": "2026-02-02T10:00:00Z"
        } },
        { "id": "11", "properties": {
            "dealname": "<script>Globex</script>", "dealstage": "344689651", "hubspot_owner_id": "2",
            "lost_reason": "No budget",
            "hs_v2_date_entered_344689645": "2026-02-02T09:00:00Z",
            "hs_v2_date_entered_344689651": "2026-02-02T15:00:00Z"
        } },
        { "id": "12", "properties": {
            "dealname": "Initech", "dealstage": "344689645", "hubspot_owner_id": "9",
            "hs_v2_date_entered_344689645": "2026-02-02T09:30:00Z"
        } },
        { "id": "13", "properties": {
            "dealname": "Hooli", "dealstage": "344689650", "hubspot_owner_id": "1",
            "hs_v2_date_entered_344689645": "2026-02-03T09:00:00Z",
            "hs_v2_date_entered_344689652": "2026-02-03T12:00:00Z",
            "hs_v2_date_entered_344689650": "2026-02-03T16:00:00Z"
        } }
    ]
}"#;

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(label: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "sdr-funnel-publish-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).expect("create workspace");
        Self { root }
    }

    fn export(&self) -> PathBuf {
        let path = self.root.join("export.json");
        std::fs::write(&path, EXPORT).expect("write export");
        path
    }

    fn store(&self) -> ReportStore {
        ReportStore::new(self.root.join("reports"))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn day(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

fn reporter(workspace: &Workspace) -> FunnelReporter<FileDealSource> {
    let source = FileDealSource::new(workspace.export(), StageTable::sdr_pipeline());
    FunnelReporter::new(source, ["Damian Jagusiak"].into_iter().collect::<RepExclusions>())
}

#[tokio::test]
async fn daily_export_is_stored_rendered_and_tabulated() {
    let workspace = Workspace::new("daily");
    let generated_at = day("2026-02-03").and_hms_opt(6, 0, 0).expect("valid time");

    let report = reporter(&workspace)
        .daily(day("2026-02-02"), generated_at)
        .await
        .expect("daily report from export");

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.active_reps, 2);
    assert_eq!(report.lost_deal_count(), 1);
    assert_eq!(report.lost_reasons[0].reason, "No budget");

    let store = workspace.store();
    store.save(&report).expect("report stored");
    assert_eq!(store.load(report.date).expect("report reloads"), report);
    assert_eq!(store.index().expect("index reads").dates(), &[day("2026-02-02")]);

    let html = render_dashboard(&report).expect("dashboard renders");
    assert!(html.contains("&lt;script&gt;Globex&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("No budget"));
    assert!(!html.contains("Damian"));

    let mut csv = Vec::new();
    write_rep_csv(&report, &mut csv).expect("csv written");
    let csv = String::from_utf8(csv).expect("utf-8 csv");
    assert!(csv.starts_with("SDR,Deals,New Lead,MQL,SQL,Won,"));
    assert!(csv.contains("Ann Nowak,1,1,1,0,0,0,0,1/1 (100%),0/1 (0%),0/1 (0%)"));
    assert!(csv.contains("Bob Kowalski,1,1,0,0,0,1,0,0/1 (0%),-,0/1 (0%)"));
    assert!(csv
        .trim_end()
        .ends_with("Total,2,2,1,0,0,1,0,1/2 (50%),0/1 (0%),0/2 (0%)"));
}

#[tokio::test]
async fn backfilled_reports_roll_up_from_the_store() {
    let workspace = Workspace::new("backfill");
    let generated_at = day("2026-02-10").and_hms_opt(6, 0, 0).expect("valid time");

    let reports = reporter(&workspace)
        .backfill(day("2026-02-01"), day("2026-02-07"), generated_at)
        .await
        .expect("backfill from export");
    assert_eq!(reports.len(), 2);

    let store = workspace.store();
    for report in &reports {
        store.save(report).expect("report stored");
    }

    let latest = reports.last().expect("latest report");
    let cumulative = latest.headline_conversions();
    assert_eq!(cumulative.lead_mql.display(), "2/3 (67%)");
    assert_eq!(cumulative.mql_sql.display(), "1/2 (50%)");
    let per_rep = &latest.snapshot.as_ref().expect("snapshot report").reps;
    assert_eq!(latest.reps.len(), 1);
    assert_eq!(per_rep["Bob Kowalski"].lead_mql.display(), "0/1 (0%)");
    assert_eq!(per_rep["Ann Nowak"].lead_mql.display(), "2/2 (100%)");

    let stored = store
        .load_range(day("2026-02-01"), day("2026-02-07"))
        .expect("range loads");
    assert_eq!(stored, reports);

    let merged = rollup(&stored).expect("rollup over stored days");
    assert_eq!(merged.days, 2);
    assert_eq!(merged.summary.total, 3);
    assert_eq!(merged.summary.sql, 1);
    assert!(merged.reps.iter().all(|rep| rep.name != "Damian Jagusiak"));
}
