//! 메모리 기반 자산 저장소.
//!
//! DB 없이 수집 파이프라인을 돌려볼 때(dry-run)와 테스트에서 사용합니다.
//! 레코드 맵에 대한 쓰기 락 안에서 레코드 하나를 통째로 교체하므로
//! 읽는 쪽은 항상 일관된 레코드만 봅니다.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::blob::IconBlobStore;
use super::AssetStore;
use crate::error::{DataError, Result};
use crate::model::{rank_order, AssetRecord, AssetUpsert, UpsertOutcome};

/// 메모리 저장소. clone은 같은 저장소를 공유합니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    records: Arc<RwLock<HashMap<String, AssetRecord>>>,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 레코드 수
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// 저장된 blob 바이트 조회
    pub async fn blob(&self, blob_ref: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(blob_ref).cloned()
    }

    /// blob 삭제 (외부에서 파일이 사라진 상황 재현용)
    pub async fn remove_blob(&self, blob_ref: &str) -> bool {
        self.blobs.write().await.remove(blob_ref).is_some()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upsert(&self, upsert: &AssetUpsert) -> Result<(AssetRecord, UpsertOutcome)> {
        let now = Utc::now();
        let mut records = self.records.write().await;

        match records.get_mut(&upsert.id) {
            Some(record) => {
                record.apply_market(&upsert.market, now);
                Ok((record.clone(), UpsertOutcome::Updated))
            }
            None => {
                let record = AssetRecord::create(upsert, now);
                records.insert(record.id.clone(), record.clone());
                Ok((record, UpsertOutcome::Created))
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<AssetRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_by_rank(&self) -> Result<Vec<AssetRecord>> {
        let mut list: Vec<AssetRecord> = self.records.read().await.values().cloned().collect();
        list.sort_by(rank_order);
        Ok(list)
    }

    async fn set_description_if_empty(&self, id: &str, description: &str) -> Result<bool> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DataError::Storage(format!("레코드 없음: {}", id)))?;

        if !record.needs_description() {
            return Ok(false);
        }
        record.description = Some(description.to_string());
        Ok(true)
    }

    async fn save_icon(&self, id: &str, bytes: &[u8]) -> Result<String> {
        let blob_ref = IconBlobStore::blob_ref(id)?;

        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DataError::Storage(format!("레코드 없음: {}", id)))?;

        self.blobs
            .write()
            .await
            .insert(blob_ref.clone(), bytes.to_vec());
        record.icon_blob_ref = Some(blob_ref.clone());
        Ok(blob_ref)
    }

    async fn icon_exists(&self, blob_ref: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(blob_ref))
    }
}
