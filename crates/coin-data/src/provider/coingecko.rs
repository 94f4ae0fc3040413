//! CoinGecko API 클라이언트.
//!
//! 시가총액 상위 N개 코인의 시세 스냅샷과 코인별 상세 정보(설명), 아이콘 이미지를 조회합니다.
//!
//! # 엔드포인트
//!
//! - `GET /coins/markets`: 시가총액 순 랭킹 목록 (1h/24h/7d 등락률 포함)
//! - `GET /coins/{id}`: 상세 정보. 사용하지 않는 하위 객체(tickers, market_data 등)는 끔
//! - 아이콘: 목록 응답의 `image` URL에 대한 단순 GET
//!
//! # 오류 분류
//!
//! 전송 실패는 [`DataError::Network`], 429는 [`DataError::RateLimited`],
//! 404는 [`DataError::NotFound`], 그 외 non-2xx는 [`DataError::Provider`]로 구분합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let client = CoinGeckoClient::new(CoinGeckoOptions::default())?;
//! let items = client.fetch_snapshot().await?;
//! let detail = client.fetch_detail("bitcoin").await?;
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::model::{AssetUpsert, MarketFields};

/// 기본 API Base URL
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Demo API 키 헤더
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// 오류 메시지에 포함할 응답 본문 최대 길이
const MAX_ERROR_BODY: usize = 200;

/// 시세 데이터 소스.
///
/// 수집기는 이 trait을 통해서만 provider에 접근합니다.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 시가총액 상위 목록 (1페이지) 조회
    ///
    /// 목록 자체를 읽지 못하면 에러, 개별 항목 디코딩 실패는 [`SnapshotEntry::Malformed`].
    async fn fetch_snapshot(&self) -> Result<Vec<SnapshotEntry>>;

    /// 코인 상세 정보 조회
    async fn fetch_detail(&self, id: &str) -> Result<RawAssetDetail>;

    /// 아이콘 이미지 바이트 조회
    async fn fetch_icon(&self, url: &str) -> Result<Vec<u8>>;
}

/// 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct CoinGeckoOptions {
    /// API Base URL
    pub base_url: String,
    /// Demo API 키 (선택)
    pub api_key: Option<String>,
    /// 기준 통화
    pub vs_currency: String,
    /// 페이지 크기 (상위 N개)
    pub per_page: u32,
    /// 목록 조회 타임아웃
    pub snapshot_timeout: Duration,
    /// 상세 조회 타임아웃
    pub detail_timeout: Duration,
    /// 아이콘 조회 타임아웃
    pub icon_timeout: Duration,
}

impl Default for CoinGeckoOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            vs_currency: "usd".to_string(),
            per_page: 50,
            snapshot_timeout: Duration::from_secs(10),
            detail_timeout: Duration::from_secs(10),
            icon_timeout: Duration::from_secs(5),
        }
    }
}

/// `/coins/markets` 응답 항목.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAssetItem {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// 아이콘 URL
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub market_cap_rank: Option<i32>,
    #[serde(default)]
    pub total_volume: Option<Decimal>,
    #[serde(default)]
    pub circulating_supply: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<Decimal>,
}

impl RawAssetItem {
    /// upsert 입력으로 변환. 누락된 수치는 0으로 채웁니다 (순위 제외).
    pub fn to_upsert(&self) -> AssetUpsert {
        AssetUpsert {
            id: self.id.clone(),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            market: MarketFields {
                current_price: self.current_price.unwrap_or_default(),
                market_cap: self.market_cap.unwrap_or_default(),
                market_cap_rank: self.market_cap_rank,
                total_volume: self.total_volume.unwrap_or_default(),
                circulating_supply: self.circulating_supply.unwrap_or_default(),
                price_change_1h: self
                    .price_change_percentage_1h_in_currency
                    .unwrap_or_default(),
                price_change_24h: self
                    .price_change_percentage_24h_in_currency
                    .or(self.price_change_percentage_24h)
                    .unwrap_or_default(),
                price_change_7d: self
                    .price_change_percentage_7d_in_currency
                    .unwrap_or_default(),
            },
        }
    }

    /// 비어 있지 않은 아이콘 URL
    pub fn icon_url(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// 스냅샷 목록의 항목 하나.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEntry {
    Item(RawAssetItem),
    /// 디코딩 실패. `label`은 id, 없으면 name, 둘 다 없으면 목록 내 위치
    Malformed { label: String, reason: String },
}

impl SnapshotEntry {
    /// JSON 값 하나를 항목으로 변환.
    pub fn from_value(index: usize, value: serde_json::Value) -> Self {
        let label = ["id", "name"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index));

        match serde_json::from_value::<RawAssetItem>(value) {
            Ok(item) => Self::Item(item),
            Err(e) => Self::Malformed {
                label,
                reason: e.to_string(),
            },
        }
    }
}

impl From<RawAssetItem> for SnapshotEntry {
    fn from(item: RawAssetItem) -> Self {
        Self::Item(item)
    }
}

/// `/coins/{id}` 응답에서 사용하는 필드.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAssetDetail {
    pub id: String,
    /// 영문 설명 (비어 있으면 None)
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: String,
    #[serde(default)]
    description: HashMap<String, Option<String>>,
}

impl From<DetailResponse> for RawAssetDetail {
    fn from(resp: DetailResponse) -> Self {
        let description = resp
            .description
            .get("en")
            .cloned()
            .flatten()
            .filter(|d| !d.trim().is_empty());
        Self {
            id: resp.id,
            description,
        }
    }
}

/// CoinGecko API 클라이언트.
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    options: CoinGeckoOptions,
}

impl CoinGeckoClient {
    /// 새 클라이언트 생성.
    pub fn new(options: CoinGeckoOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coin-collector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { client, options })
    }

    /// 현재 설정
    pub fn options(&self) -> &CoinGeckoOptions {
        &self.options
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.options.base_url.trim_end_matches('/'), path)
    }

    /// GET 요청 실행 후 상태 코드 분류.
    async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        tracing::debug!(url = %url, "CoinGecko 요청");

        let mut request = self.client.get(url).query(params).timeout(timeout);
        // 아이콘 CDN 등 외부 호스트에는 키를 보내지 않음
        if let Some(key) = &self.options.api_key {
            if url.starts_with(self.options.base_url.trim_end_matches('/')) {
                request = request.header(API_KEY_HEADER, key);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(DataError::from_status(status, format!("{} - {}", url, message)))
    }

    /// 랭킹 목록의 특정 페이지 조회.
    pub async fn fetch_page(&self, page: u32) -> Result<Vec<SnapshotEntry>> {
        let per_page = self.options.per_page.to_string();
        let page = page.to_string();
        let params = [
            ("vs_currency", self.options.vs_currency.as_str()),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", page.as_str()),
            ("sparkline", "false"),
            ("price_change_percentage", "1h,24h,7d"),
        ];

        let response = self
            .get(
                &self.url("coins/markets"),
                &params,
                self.options.snapshot_timeout,
            )
            .await?;

        let values: Vec<serde_json::Value> = response.json().await?;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(index, value)| SnapshotEntry::from_value(index, value))
            .collect())
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_snapshot(&self) -> Result<Vec<SnapshotEntry>> {
        self.fetch_page(1).await
    }

    async fn fetch_detail(&self, id: &str) -> Result<RawAssetDetail> {
        // URL 경로에 그대로 들어가므로 구분 문자가 섞인 ID는 요청하지 않음
        if id.trim().is_empty() || id.contains(['/', '\\', '?', '#', '%']) || id.contains("..") {
            return Err(DataError::Serialization(format!("잘못된 자산 ID: {:?}", id)));
        }

        let params = [
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "false"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ];

        let response = self
            .get(
                &self.url(&format!("coins/{}", id)),
                &params,
                self.options.detail_timeout,
            )
            .await?;

        let detail: DetailResponse = response.json().await?;
        Ok(detail.into())
    }

    async fn fetch_icon(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url, &[], self.options.icon_timeout).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
