//! 테스트용 가짜 provider, 저장소, 대기 수행자.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use coin_data::{
    AssetRecord, AssetStore, AssetUpsert, DataError, MarketDataSource, MemoryAssetStore,
    RawAssetDetail, RawAssetItem, SnapshotEntry, UpsertOutcome,
};
use rust_decimal::Decimal;

use crate::config::PacingConfig;
use crate::pacing::{Pacer, RequestLimiter};

/// 대기 요청만 기록하고 즉시 반환.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// 기록용 pacer를 쓰는 기본 제한기
pub fn recording_limiter() -> (Arc<RequestLimiter>, Arc<RecordingPacer>) {
    let pacer = Arc::new(RecordingPacer::default());
    let limiter = Arc::new(RequestLimiter::new(PacingConfig::default(), pacer.clone()));
    (limiter, pacer)
}

/// 스냅샷 항목 생성
pub fn item(id: &str, price: i64, rank: i32) -> RawAssetItem {
    RawAssetItem {
        id: id.to_string(),
        symbol: id.chars().take(3).collect(),
        name: id.to_string(),
        image: Some(format!("https://assets.example.com/{}.png", id)),
        current_price: Some(Decimal::from(price)),
        market_cap: Some(Decimal::from(price) * Decimal::from(1000)),
        market_cap_rank: Some(rank),
        total_volume: Some(Decimal::from(10)),
        circulating_supply: None,
        price_change_percentage_24h: Some(Decimal::new(125, 2)),
        ..Default::default()
    }
}

/// 미리 정해 둔 응답을 순서대로 돌려주는 provider.
///
/// 응답이 소진되면 스냅샷/아이콘은 `Network`, 상세는 `NotFound`를 반환합니다.
#[derive(Default)]
pub struct ScriptedSource {
    snapshots: Mutex<VecDeque<Result<Vec<SnapshotEntry>, DataError>>>,
    details: Mutex<HashMap<String, VecDeque<Result<RawAssetDetail, DataError>>>>,
    icons: Mutex<HashMap<String, VecDeque<Result<Vec<u8>, DataError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snapshot(&self, result: Result<Vec<RawAssetItem>, DataError>) -> &Self {
        self.push_entries(result.map(|items| items.into_iter().map(SnapshotEntry::from).collect()))
    }

    pub fn push_entries(&self, result: Result<Vec<SnapshotEntry>, DataError>) -> &Self {
        self.snapshots.lock().unwrap().push_back(result);
        self
    }

    pub fn push_detail(&self, id: &str, result: Result<RawAssetDetail, DataError>) -> &Self {
        self.details
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn push_description(&self, id: &str, description: &str) -> &Self {
        self.push_detail(
            id,
            Ok(RawAssetDetail {
                id: id.to_string(),
                description: Some(description.to_string()),
            }),
        )
    }

    pub fn push_icon(&self, url: &str, result: Result<Vec<u8>, DataError>) -> &Self {
        self.icons
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// 호출 기록 (`snapshot`, `detail:<id>`, `icon:<url>`)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_snapshot(&self) -> coin_data::Result<Vec<SnapshotEntry>> {
        self.record("snapshot".to_string());
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DataError::Network("no scripted snapshot".to_string())))
    }

    async fn fetch_detail(&self, id: &str) -> coin_data::Result<RawAssetDetail> {
        self.record(format!("detail:{}", id));
        self.details
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(DataError::NotFound(id.to_string())))
    }

    async fn fetch_icon(&self, url: &str) -> coin_data::Result<Vec<u8>> {
        self.record(format!("icon:{}", url));
        self.icons
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(DataError::Network("no scripted icon".to_string())))
    }
}

/// 지정한 ID의 쓰기를 실패시키는 저장소.
///
/// `fail_upsert`는 upsert를, `fail_writes`는 아이콘/설명 저장을 실패시킵니다.
#[derive(Clone, Default)]
pub struct FailingStore {
    pub inner: MemoryAssetStore,
    fail_upsert: Arc<Mutex<HashSet<String>>>,
    fail_writes: Arc<Mutex<HashSet<String>>>,
}

fn id_set(ids: &[&str]) -> Arc<Mutex<HashSet<String>>> {
    Arc::new(Mutex::new(ids.iter().map(|s| s.to_string()).collect()))
}

impl FailingStore {
    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            fail_upsert: id_set(ids),
            ..Self::default()
        }
    }

    pub fn failing_writes_on(ids: &[&str]) -> Self {
        Self {
            fail_writes: id_set(ids),
            ..Self::default()
        }
    }

    fn check_write(&self, id: &str) -> coin_data::Result<()> {
        if self.fail_writes.lock().unwrap().contains(id) {
            return Err(DataError::Storage(format!("read-only media: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStore for FailingStore {
    async fn upsert(&self, upsert: &AssetUpsert) -> coin_data::Result<(AssetRecord, UpsertOutcome)> {
        if self.fail_upsert.lock().unwrap().contains(&upsert.id) {
            return Err(DataError::Storage(format!("disk full: {}", upsert.id)));
        }
        self.inner.upsert(upsert).await
    }

    async fn get(&self, id: &str) -> coin_data::Result<Option<AssetRecord>> {
        self.inner.get(id).await
    }

    async fn list_by_rank(&self) -> coin_data::Result<Vec<AssetRecord>> {
        self.inner.list_by_rank().await
    }

    async fn set_description_if_empty(&self, id: &str, description: &str) -> coin_data::Result<bool> {
        self.check_write(id)?;
        self.inner.set_description_if_empty(id, description).await
    }

    async fn save_icon(&self, id: &str, bytes: &[u8]) -> coin_data::Result<String> {
        self.check_write(id)?;
        self.inner.save_icon(id, bytes).await
    }

    async fn icon_exists(&self, blob_ref: &str) -> coin_data::Result<bool> {
        self.inner.icon_exists(blob_ref).await
    }
}
