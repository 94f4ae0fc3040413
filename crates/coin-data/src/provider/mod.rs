//! 외부 시세 데이터 Provider.

pub mod coingecko;

pub use coingecko::{
    CoinGeckoClient, CoinGeckoOptions, MarketDataSource, RawAssetDetail, RawAssetItem,
    SnapshotEntry,
};
