//! 코인 시세 데이터 계층.
//!
//! 이 crate는 다음을 제공합니다:
//! - CoinGecko API 클라이언트 (시세 스냅샷, 상세 정보, 아이콘)
//! - 자산 레코드 모델
//! - 자산 레코드 저장소 (PostgreSQL, 메모리) 및 아이콘 파일 저장소

pub mod error;
pub mod model;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};
pub use model::{AssetRecord, AssetUpsert, MarketFields, UpsertOutcome};

// Provider 재내보내기
pub use provider::{
    CoinGeckoClient, CoinGeckoOptions, MarketDataSource, RawAssetDetail, RawAssetItem,
    SnapshotEntry,
};

// 저장소 재내보내기
pub use storage::{AssetStore, DatabaseConfig, IconBlobStore, MemoryAssetStore, PgAssetStore};
