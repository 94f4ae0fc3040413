//! 자산 레코드 모델.
//!
//! 하나의 코인(자산)은 provider가 부여한 안정적인 ID(예: `"bitcoin"`)로 식별됩니다.
//! 필드는 세 그룹으로 나뉩니다:
//! - 식별 필드: `id`, `symbol`, `name` (생성 후 변경 없음)
//! - 시장 필드: 매 pass마다 갱신
//! - 보강(enrichment) 필드: 아이콘, 설명. 한 번 채워지면 유지

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 매 pass마다 갱신되는 시장 필드.
///
/// provider가 값을 생략하면 0으로 저장합니다. 시가총액 순위만 예외적으로 nullable입니다.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketFields {
    /// 현재가
    pub current_price: Decimal,
    /// 시가총액
    pub market_cap: Decimal,
    /// 시가총액 순위 (없으면 목록 정렬 시 마지막)
    pub market_cap_rank: Option<i32>,
    /// 24시간 거래량
    pub total_volume: Decimal,
    /// 유통 공급량
    pub circulating_supply: Decimal,
    /// 1시간 등락률 (%)
    pub price_change_1h: Decimal,
    /// 24시간 등락률 (%)
    pub price_change_24h: Decimal,
    /// 7일 등락률 (%)
    pub price_change_7d: Decimal,
}

/// upsert 입력.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUpsert {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market: MarketFields,
}

/// upsert 결과 구분 (관측용).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 새 레코드 생성
    Created,
    /// 기존 레코드의 시장 필드 갱신
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// 저장된 자산 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AssetRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Decimal,
    pub market_cap: Decimal,
    pub market_cap_rank: Option<i32>,
    pub total_volume: Decimal,
    pub circulating_supply: Decimal,
    pub price_change_1h: Decimal,
    pub price_change_24h: Decimal,
    pub price_change_7d: Decimal,
    /// 저장된 아이콘 blob 참조 (예: `coins/bitcoin.png`)
    pub icon_blob_ref: Option<String>,
    /// 장문 설명
    pub description: Option<String>,
    /// 마지막 upsert 시각
    pub last_updated: DateTime<Utc>,
}

impl AssetRecord {
    /// 최초 관측 시 레코드 생성.
    pub fn create(upsert: &AssetUpsert, now: DateTime<Utc>) -> Self {
        let m = &upsert.market;
        Self {
            id: upsert.id.clone(),
            symbol: upsert.symbol.clone(),
            name: upsert.name.clone(),
            current_price: m.current_price,
            market_cap: m.market_cap,
            market_cap_rank: m.market_cap_rank,
            total_volume: m.total_volume,
            circulating_supply: m.circulating_supply,
            price_change_1h: m.price_change_1h,
            price_change_24h: m.price_change_24h,
            price_change_7d: m.price_change_7d,
            icon_blob_ref: None,
            description: None,
            last_updated: now,
        }
    }

    /// 시장 필드만 덮어씁니다. 식별/보강 필드는 건드리지 않습니다.
    pub fn apply_market(&mut self, market: &MarketFields, now: DateTime<Utc>) {
        self.current_price = market.current_price;
        self.market_cap = market.market_cap;
        self.market_cap_rank = market.market_cap_rank;
        self.total_volume = market.total_volume;
        self.circulating_supply = market.circulating_supply;
        self.price_change_1h = market.price_change_1h;
        self.price_change_24h = market.price_change_24h;
        self.price_change_7d = market.price_change_7d;
        self.last_updated = now;
    }

    /// 현재 시장 필드 스냅샷.
    pub fn market(&self) -> MarketFields {
        MarketFields {
            current_price: self.current_price,
            market_cap: self.market_cap,
            market_cap_rank: self.market_cap_rank,
            total_volume: self.total_volume,
            circulating_supply: self.circulating_supply,
            price_change_1h: self.price_change_1h,
            price_change_24h: self.price_change_24h,
            price_change_7d: self.price_change_7d,
        }
    }

    /// 설명이 비어 있는지 (write-once 조건)
    pub fn needs_description(&self) -> bool {
        is_blank(self.description.as_deref())
    }

    /// 아이콘 참조가 비어 있는지
    pub fn has_icon_ref(&self) -> bool {
        !is_blank(self.icon_blob_ref.as_deref())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// 순위 정렬 비교 (순위 없는 레코드는 마지막, 동순위는 ID 순).
pub fn rank_order(a: &AssetRecord, b: &AssetRecord) -> std::cmp::Ordering {
    match (a.market_cap_rank, b.market_cap_rank) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}
