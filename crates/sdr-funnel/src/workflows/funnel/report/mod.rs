mod assembler;
mod rollup;
pub mod views;

pub use assembler::{ReportAssembler, GENERATED_AT_FORMAT};
pub use rollup::rollup;
pub use views::{
    DealView, LossReasonCount, LostDealView, RepReport, Report, ReportMode, Rollup,
    SnapshotConversions,
};
