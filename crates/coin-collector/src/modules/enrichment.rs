//! 자산 보강(enrichment) 모듈.
//!
//! 스냅샷에 없는 보조 데이터(아이콘, 설명)를 레코드별로 한 번만 채웁니다.
//!
//! ## 아이콘
//! - 참조가 비어 있거나 참조한 blob이 사라졌고, 스냅샷 항목에 아이콘 URL이 있으면 수집
//! - 수신 성공 후 짧게 대기 (기본 0.5초)
//! - 실패 시 참조를 비워 두어 다음 pass에서 재시도
//!
//! ## 설명 (write-once)
//! - 설명이 비어 있을 때만 상세 조회. 조회 전 대기 (기본 1.5초)
//! - 429 수신 시 긴 대기 (기본 10초) 후 다음 pass로 미룸
//! - 한 번 기록된 설명은 이후 어떤 pass에서도 바뀌지 않음
//!
//! 조회 실패는 해당 보강 단계 안에서 끝납니다.
//! 저장소 쓰기 실패(`DataError::Storage`)만 항목 처리 밖으로 전파됩니다.

use std::sync::Arc;

use coin_data::{AssetRecord, AssetStore, DataError, MarketDataSource, RawAssetItem, Result};
use tracing::{debug, info, warn};

use crate::pacing::{RequestLimiter, ResourceClass};
use crate::stats::PassStats;

/// 보강 단계 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepOutcome {
    /// 이미 채워져 있거나 수집할 수 없음
    #[default]
    Skipped,
    /// 수집 후 저장
    Fetched,
    /// 조회는 성공했지만 저장할 내용 없음
    Empty,
    /// 429 수신
    RateLimited,
    /// 그 밖의 실패
    Failed,
}

/// 레코드 하나에 대한 보강 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichmentReport {
    pub icon: StepOutcome,
    pub description: StepOutcome,
}

impl EnrichmentReport {
    /// pass 통계에 반영
    pub fn record_into(&self, stats: &mut PassStats) {
        match self.icon {
            StepOutcome::Fetched => stats.icons_fetched += 1,
            StepOutcome::Failed | StepOutcome::Empty => stats.icon_failures += 1,
            StepOutcome::RateLimited => {
                stats.icon_failures += 1;
                stats.rate_limited += 1;
            }
            StepOutcome::Skipped => {}
        }
        match self.description {
            StepOutcome::Fetched => stats.descriptions_fetched += 1,
            StepOutcome::Failed => stats.description_failures += 1,
            StepOutcome::RateLimited => stats.rate_limited += 1,
            StepOutcome::Empty | StepOutcome::Skipped => {}
        }
    }
}

/// 보강 정책.
#[derive(Clone)]
pub struct EnrichmentPolicy {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn AssetStore>,
    limiter: Arc<RequestLimiter>,
}

impl EnrichmentPolicy {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn AssetStore>,
        limiter: Arc<RequestLimiter>,
    ) -> Self {
        Self {
            source,
            store,
            limiter,
        }
    }

    /// 필요한 보강만 수행합니다.
    ///
    /// 수집 여부는 전달된 `record`의 현재 상태와 `item`만으로 결정합니다.
    /// 아이콘/설명 저장 실패 시 남은 단계를 건너뛰고 에러를 반환합니다.
    pub async fn maybe_enrich(
        &self,
        record: &AssetRecord,
        item: &RawAssetItem,
    ) -> Result<EnrichmentReport> {
        let icon = self.maybe_fetch_icon(record, item).await?;
        let description = self.maybe_fetch_description(record).await?;
        Ok(EnrichmentReport { icon, description })
    }

    /// 아이콘이 필요한지 판단 (참조 없음 또는 blob 소실)
    async fn needs_icon(&self, record: &AssetRecord) -> bool {
        let Some(blob_ref) = record.icon_blob_ref.as_deref().filter(|_| record.has_icon_ref())
        else {
            return true;
        };

        match self.store.icon_exists(blob_ref).await {
            Ok(true) => false,
            Ok(false) => {
                debug!(id = %record.id, blob_ref, "저장된 아이콘 없음, 재수집");
                true
            }
            Err(e) => {
                warn!(id = %record.id, error = %e, "아이콘 존재 확인 실패, 재수집");
                true
            }
        }
    }

    async fn maybe_fetch_icon(
        &self,
        record: &AssetRecord,
        item: &RawAssetItem,
    ) -> Result<StepOutcome> {
        if !self.needs_icon(record).await {
            return Ok(StepOutcome::Skipped);
        }
        let Some(url) = item.icon_url() else {
            return Ok(StepOutcome::Skipped);
        };

        info!(id = %record.id, name = %record.name, "아이콘 다운로드 중...");
        let permit = self.limiter.acquire(ResourceClass::Icon).await;

        let bytes = match self.source.fetch_icon(url).await {
            Ok(bytes) if bytes.is_empty() => {
                permit.failed();
                warn!(id = %record.id, url, "빈 아이콘 응답");
                return Ok(StepOutcome::Empty);
            }
            Ok(bytes) => bytes,
            Err(DataError::RateLimited) => {
                permit.rate_limited().await;
                return Ok(StepOutcome::RateLimited);
            }
            Err(e) => {
                permit.failed();
                warn!(id = %record.id, url, error = %e, "아이콘 다운로드 실패");
                return Ok(StepOutcome::Failed);
            }
        };

        let saved = self.store.save_icon(&record.id, &bytes).await;
        permit.succeeded().await;

        let blob_ref = saved?;
        debug!(id = %record.id, blob_ref = %blob_ref, "아이콘 저장 완료");
        Ok(StepOutcome::Fetched)
    }

    async fn maybe_fetch_description(&self, record: &AssetRecord) -> Result<StepOutcome> {
        if !record.needs_description() {
            return Ok(StepOutcome::Skipped);
        }

        info!(id = %record.id, name = %record.name, "상세 정보 조회 중...");
        let permit = self.limiter.acquire(ResourceClass::Detail).await;

        let detail = match self.source.fetch_detail(&record.id).await {
            Ok(detail) => {
                permit.succeeded().await;
                detail
            }
            Err(DataError::RateLimited) => {
                permit.rate_limited().await;
                return Ok(StepOutcome::RateLimited);
            }
            Err(DataError::NotFound(_)) => {
                permit.failed();
                warn!(id = %record.id, "Provider에 없는 ID, 설명을 비워 둠");
                return Ok(StepOutcome::Failed);
            }
            Err(e) => {
                permit.failed();
                warn!(id = %record.id, error = %e, "상세 정보 조회 실패");
                return Ok(StepOutcome::Failed);
            }
        };

        let Some(description) = detail.description else {
            debug!(id = %record.id, "설명 없음");
            return Ok(StepOutcome::Empty);
        };

        let written = self
            .store
            .set_description_if_empty(&record.id, &description)
            .await?;
        if !written {
            return Ok(StepOutcome::Skipped);
        }
        info!(id = %record.id, name = %record.name, "설명 업데이트 완료");
        Ok(StepOutcome::Fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        item, recording_limiter, FailingStore, RecordingPacer, ScriptedSource,
    };
    use coin_data::MemoryAssetStore;
    use std::time::Duration;

    struct Fixture {
        source: Arc<ScriptedSource>,
        store: MemoryAssetStore,
        pacer: Arc<RecordingPacer>,
        policy: EnrichmentPolicy,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(ScriptedSource::new());
        let store = MemoryAssetStore::new();
        let (limiter, pacer) = recording_limiter();
        let policy = EnrichmentPolicy::new(source.clone(), Arc::new(store.clone()), limiter);
        Fixture {
            source,
            store,
            pacer,
            policy,
        }
    }

    async fn create(store: &MemoryAssetStore, raw: &RawAssetItem) -> AssetRecord {
        store.upsert(&raw.to_upsert()).await.unwrap().0
    }

    #[tokio::test]
    async fn test_fetches_icon_and_description_with_pacing() {
        let f = fixture();
        let raw = item("bitcoin", 65000, 1);
        let record = create(&f.store, &raw).await;

        f.source
            .push_icon("https://assets.example.com/bitcoin.png", Ok(b"png".to_vec()))
            .push_description("bitcoin", "Bitcoin is a decentralized currency.");

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.icon, StepOutcome::Fetched);
        assert_eq!(report.description, StepOutcome::Fetched);

        let stored = f.store.get("bitcoin").await.unwrap().unwrap();
        assert_eq!(stored.icon_blob_ref.as_deref(), Some("coins/bitcoin.png"));
        assert_eq!(
            stored.description.as_deref(),
            Some("Bitcoin is a decentralized currency.")
        );
        // 아이콘 후 0.5초, 상세 전 1.5초
        assert_eq!(
            f.pacer.pauses(),
            vec![Duration::from_millis(500), Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn test_skips_when_already_enriched() {
        let f = fixture();
        let raw = item("bitcoin", 65000, 1);
        create(&f.store, &raw).await;
        f.store.save_icon("bitcoin", b"png").await.unwrap();
        f.store
            .set_description_if_empty("bitcoin", "existing")
            .await
            .unwrap();
        let record = f.store.get("bitcoin").await.unwrap().unwrap();

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report, EnrichmentReport::default());
        assert!(f.source.calls().is_empty());
        assert!(f.pacer.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_refetches_icon_when_blob_vanished() {
        let f = fixture();
        let raw = item("bitcoin", 65000, 1);
        create(&f.store, &raw).await;
        let blob_ref = f.store.save_icon("bitcoin", b"old").await.unwrap();
        f.store
            .set_description_if_empty("bitcoin", "existing")
            .await
            .unwrap();
        f.store.remove_blob(&blob_ref).await;
        let record = f.store.get("bitcoin").await.unwrap().unwrap();

        f.source
            .push_icon("https://assets.example.com/bitcoin.png", Ok(b"new".to_vec()));

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.icon, StepOutcome::Fetched);
        assert_eq!(f.store.blob(&blob_ref).await, Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_icon_failure_leaves_ref_empty() {
        let f = fixture();
        let raw = item("bitcoin", 65000, 1);
        let record = create(&f.store, &raw).await;
        f.source.push_icon(
            "https://assets.example.com/bitcoin.png",
            Err(DataError::Network("timeout".to_string())),
        );
        f.source.push_description("bitcoin", "desc");

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.icon, StepOutcome::Failed);
        // 아이콘 실패가 설명 수집을 막지 않음
        assert_eq!(report.description, StepOutcome::Fetched);

        let stored = f.store.get("bitcoin").await.unwrap().unwrap();
        assert_eq!(stored.icon_blob_ref, None);
        // 실패한 아이콘에는 성공 후 대기가 없음
        assert_eq!(f.pacer.pauses(), vec![Duration::from_millis(1500)]);
    }

    #[tokio::test]
    async fn test_no_icon_url_skips_icon() {
        let f = fixture();
        let mut raw = item("bitcoin", 65000, 1);
        raw.image = Some("  ".to_string());
        let record = create(&f.store, &raw).await;
        f.source.push_description("bitcoin", "desc");

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.icon, StepOutcome::Skipped);
        assert_eq!(f.source.count_calls("icon:"), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_description_cools_down() {
        let f = fixture();
        let mut raw = item("bitcoin", 65000, 1);
        raw.image = None;
        let record = create(&f.store, &raw).await;
        f.source.push_detail("bitcoin", Err(DataError::RateLimited));

        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.description, StepOutcome::RateLimited);
        assert_eq!(
            f.pacer.pauses(),
            vec![Duration::from_millis(1500), Duration::from_secs(10)]
        );
        let stored = f.store.get("bitcoin").await.unwrap().unwrap();
        assert!(stored.needs_description());

        let mut stats = PassStats::new();
        report.record_into(&mut stats);
        assert_eq!(stats.rate_limited, 1);
        assert_eq!(stats.description_failures, 0);
    }

    #[tokio::test]
    async fn test_not_found_and_empty_description() {
        let f = fixture();
        let mut raw = item("vanished", 1, 40);
        raw.image = None;
        let record = create(&f.store, &raw).await;

        // 스크립트가 없으면 NotFound
        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.description, StepOutcome::Failed);

        f.source.push_detail(
            "vanished",
            Ok(coin_data::RawAssetDetail {
                id: "vanished".to_string(),
                description: None,
            }),
        );
        let report = f.policy.maybe_enrich(&record, &raw).await.unwrap();
        assert_eq!(report.description, StepOutcome::Empty);
        assert!(f
            .store
            .get("vanished")
            .await
            .unwrap()
            .unwrap()
            .needs_description());
    }

    #[tokio::test]
    async fn test_stale_record_view_does_not_overwrite_description() {
        let f = fixture();
        let mut raw = item("bitcoin", 65000, 1);
        raw.image = None;
        // 설명이 채워지기 전의 레코드 스냅샷
        let stale = create(&f.store, &raw).await;
        f.store
            .set_description_if_empty("bitcoin", "first")
            .await
            .unwrap();

        f.source.push_description("bitcoin", "second");
        let report = f.policy.maybe_enrich(&stale, &raw).await.unwrap();
        assert_eq!(report.description, StepOutcome::Skipped);

        let stored = f.store.get("bitcoin").await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_icon_storage_failure_propagates() {
        let source = Arc::new(ScriptedSource::new());
        let store = FailingStore::failing_writes_on(&["bitcoin"]);
        let (limiter, pacer) = recording_limiter();
        let policy = EnrichmentPolicy::new(source.clone(), Arc::new(store.clone()), limiter);

        let raw = item("bitcoin", 65000, 1);
        let record = store.upsert(&raw.to_upsert()).await.unwrap().0;
        source
            .push_icon("https://assets.example.com/bitcoin.png", Ok(b"png".to_vec()))
            .push_description("bitcoin", "desc");

        let err = policy.maybe_enrich(&record, &raw).await.unwrap_err();
        assert!(matches!(err, DataError::Storage(_)));
        // 수신은 성공했으므로 대기는 지킴, 설명 단계는 실행하지 않음
        assert_eq!(pacer.pauses(), vec![Duration::from_millis(500)]);
        assert_eq!(source.count_calls("detail:"), 0);
        assert_eq!(store.inner.get("bitcoin").await.unwrap().unwrap().icon_blob_ref, None);
    }

    #[tokio::test]
    async fn test_description_storage_failure_propagates() {
        let source = Arc::new(ScriptedSource::new());
        let store = FailingStore::failing_writes_on(&["bitcoin"]);
        let (limiter, _) = recording_limiter();
        let policy = EnrichmentPolicy::new(source.clone(), Arc::new(store.clone()), limiter);

        let mut raw = item("bitcoin", 65000, 1);
        raw.image = None;
        let record = store.upsert(&raw.to_upsert()).await.unwrap().0;
        source.push_description("bitcoin", "desc");

        let err = policy.maybe_enrich(&record, &raw).await.unwrap_err();
        assert!(matches!(err, DataError::Storage(_)));
        assert!(store.inner.get("bitcoin").await.unwrap().unwrap().needs_description());
    }
}
