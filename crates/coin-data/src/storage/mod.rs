//! 자산 레코드 저장소.
//!
//! - [`postgres::PgAssetStore`]: PostgreSQL 기반 영속 저장소 (아이콘은 파일로 저장)
//! - [`memory::MemoryAssetStore`]: 프로세스 내 저장소 (테스트, dry-run)
//!
//! 모든 구현은 단일 레코드 쓰기를 원자적으로 수행하며, 쓰기 중에도 동시 읽기를 허용합니다.

pub mod blob;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AssetRecord, AssetUpsert, UpsertOutcome};

pub use blob::IconBlobStore;
pub use memory::MemoryAssetStore;
pub use postgres::{DatabaseConfig, PgAssetStore};

/// 자산 레코드 저장소 인터페이스.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// ID 기준 upsert.
    ///
    /// 레코드가 없으면 식별/시장 필드로 생성하고, 있으면 시장 필드와 `last_updated`만 덮어씁니다.
    async fn upsert(&self, upsert: &AssetUpsert) -> Result<(AssetRecord, UpsertOutcome)>;

    /// ID로 단건 조회
    async fn get(&self, id: &str) -> Result<Option<AssetRecord>>;

    /// 시가총액 순위 순으로 전체 조회 (순위 없는 레코드는 마지막)
    async fn list_by_rank(&self) -> Result<Vec<AssetRecord>>;

    /// 설명이 비어 있을 때만 기록합니다. 실제로 기록했으면 `true`.
    async fn set_description_if_empty(&self, id: &str, description: &str) -> Result<bool>;

    /// 아이콘 바이트를 ID 기준으로 저장하고 레코드의 참조를 갱신합니다.
    ///
    /// 저장된 blob 참조를 반환합니다.
    async fn save_icon(&self, id: &str, bytes: &[u8]) -> Result<String>;

    /// 이전에 저장한 blob이 아직 존재하는지 확인
    async fn icon_exists(&self, blob_ref: &str) -> Result<bool>;
}
