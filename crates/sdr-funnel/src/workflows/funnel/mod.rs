pub mod classifier;
pub mod dates;
pub mod domain;
pub mod report;
mod reporter;
pub mod snapshot;
pub mod stats;

pub use classifier::{classify_as_of, classify_day, CumulativeDeal, DailyDeal, StageMembership};
pub use domain::{
    CurrentStage, Deal, RepDirectory, RepExclusions, Stage, StageTable, NO_LOSS_REASON,
    UNKNOWN_REP,
};
pub use report::{rollup, Report, ReportAssembler, ReportMode, Rollup};
pub use reporter::FunnelReporter;
pub use snapshot::{snapshot, Snapshot};
pub use stats::{calculate, Conversion, Conversions, Stats, NO_DATA};
