//! 수집 파이프라인 모듈.

pub mod enrichment;
pub mod reconcile;
pub mod scheduler;

pub use enrichment::{EnrichmentPolicy, EnrichmentReport, StepOutcome};
pub use reconcile::ReconciliationEngine;
pub use scheduler::{RunMode, Scheduler, SchedulerState};
