//! 시세 스냅샷 reconciliation 모듈.
//!
//! 스냅샷 하나를 받아 항목별로 upsert한 뒤 보강 정책을 실행합니다.
//! 항목 하나의 실패는 로그만 남기고 다음 항목으로 넘어갑니다.

use std::sync::Arc;
use std::time::Instant;

use coin_data::{
    AssetStore, DataError, MarketDataSource, RawAssetItem, SnapshotEntry, UpsertOutcome,
};
use tracing::{debug, info, warn};

use super::enrichment::EnrichmentPolicy;
use crate::stats::PassStats;
use crate::Result;

/// reconciliation 엔진.
#[derive(Clone)]
pub struct ReconciliationEngine {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn AssetStore>,
    policy: EnrichmentPolicy,
}

impl ReconciliationEngine {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn AssetStore>,
        policy: EnrichmentPolicy,
    ) -> Self {
        Self {
            source,
            store,
            policy,
        }
    }

    /// pass 1회 실행.
    ///
    /// 스냅샷 조회에 실패하면 아무것도 쓰지 않고 에러를 반환합니다.
    /// 그 이후의 항목별 실패는 통계에만 반영됩니다.
    pub async fn run_pass(&self) -> Result<PassStats> {
        let start = Instant::now();
        let mut stats = PassStats::new();

        info!("CoinGecko 시세 조회 중...");
        let entries = self.source.fetch_snapshot().await?;
        stats.total = entries.len();
        info!(count = entries.len(), "시세 조회 완료");

        for entry in &entries {
            match entry {
                SnapshotEntry::Item(item) => {
                    if let Err(e) = self.process_item(item, &mut stats).await {
                        stats.failed += 1;
                        warn!(id = %item.id, name = %item.name, error = %e, "항목 처리 실패");
                    }
                }
                SnapshotEntry::Malformed { label, reason } => {
                    stats.failed += 1;
                    warn!(item = %label, error = %reason, "항목 디코딩 실패");
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// 항목 1개 upsert 후 보강.
    async fn process_item(&self, item: &RawAssetItem, stats: &mut PassStats) -> Result<()> {
        if item.id.trim().is_empty() {
            return Err(DataError::Serialization(format!("빈 ID (name: {})", item.name)).into());
        }

        let (record, outcome) = self.store.upsert(&item.to_upsert()).await?;
        match outcome {
            UpsertOutcome::Created => {
                stats.created += 1;
                info!(id = %record.id, name = %record.name, "생성됨");
            }
            UpsertOutcome::Updated => {
                stats.updated += 1;
                debug!(id = %record.id, "갱신됨");
            }
        }

        let report = self.policy.maybe_enrich(&record, item).await?;
        report.record_into(stats);
        Ok(())
    }
}
