//! CoinGecko 시세 수집기.
//!
//! 이 crate는 시가총액 상위 코인의 시세를 주기적으로 수집해 저장소에 반영합니다:
//! - 스냅샷 upsert (reconciliation)
//! - 아이콘/설명 점진적 보강 (enrichment)
//! - provider rate limit에 맞춘 요청 간격 제어
//! - 단일/반복 실행 스케줄러

pub mod config;
pub mod error;
pub mod modules;
pub mod pacing;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use pacing::{Pacer, RequestLimiter, ResourceClass, TokioPacer};
pub use stats::PassStats;
