//! 환경변수 기반 설정 모듈.

use std::path::PathBuf;
use std::time::Duration;

use coin_data::provider::coingecko::DEFAULT_BASE_URL;
use coin_data::{CoinGeckoOptions, DatabaseConfig};

use crate::error::CollectorError;
use crate::Result;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (메모리 모드에서는 없어도 됨)
    pub database_url: Option<String>,
    /// DB 풀 최대 연결 수
    pub database_max_connections: u32,
    /// 아이콘 저장 루트
    pub media_root: PathBuf,
    /// CoinGecko 설정
    pub provider: ProviderConfig,
    /// 요청 간격 설정
    pub pacing: PacingConfig,
    /// 반복 실행 설정
    pub schedule: ScheduleConfig,
}

/// CoinGecko 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Demo API 키
    pub api_key: Option<String>,
    /// 기준 통화
    pub vs_currency: String,
    /// 상위 N개 코인
    pub per_page: u32,
    /// 목록 조회 타임아웃 (초)
    pub snapshot_timeout_secs: u64,
    /// 상세 조회 타임아웃 (초)
    pub detail_timeout_secs: u64,
    /// 아이콘 조회 타임아웃 (초)
    pub icon_timeout_secs: u64,
}

/// 요청 간격 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// 아이콘 수신 성공 후 대기 (밀리초)
    pub icon_pause_ms: u64,
    /// 상세 조회 전 대기 (밀리초)
    pub detail_cooldown_ms: u64,
    /// 429 수신 후 대기 (초)
    pub rate_limit_cooldown_secs: u64,
}

/// 반복 실행 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// pass 사이 대기 (초)
    pub loop_interval_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            icon_pause_ms: 500,
            detail_cooldown_ms: 1500,
            rate_limit_cooldown_secs: 10,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키-값 조회 함수에서 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let per_page: u32 = parse_or(&lookup, "COLLECTOR_PER_PAGE", 50);
        if per_page == 0 || per_page > 250 {
            return Err(CollectorError::Config(format!(
                "COLLECTOR_PER_PAGE는 1~250 범위여야 합니다 (현재: {})",
                per_page
            )));
        }

        Ok(Self {
            database_url: non_empty(&lookup, "DATABASE_URL"),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5),
            media_root: non_empty(&lookup, "MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./media")),
            provider: ProviderConfig {
                base_url: non_empty(&lookup, "COINGECKO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key: non_empty(&lookup, "COINGECKO_API_KEY"),
                vs_currency: non_empty(&lookup, "COLLECTOR_VS_CURRENCY")
                    .unwrap_or_else(|| "usd".to_string()),
                per_page,
                snapshot_timeout_secs: parse_or(&lookup, "COLLECTOR_SNAPSHOT_TIMEOUT_SECS", 10),
                detail_timeout_secs: parse_or(&lookup, "COLLECTOR_DETAIL_TIMEOUT_SECS", 10),
                icon_timeout_secs: parse_or(&lookup, "COLLECTOR_ICON_TIMEOUT_SECS", 5),
            },
            pacing: PacingConfig {
                icon_pause_ms: parse_or(&lookup, "COLLECTOR_ICON_PAUSE_MS", 500),
                detail_cooldown_ms: parse_or(&lookup, "COLLECTOR_DETAIL_COOLDOWN_MS", 1500),
                rate_limit_cooldown_secs: parse_or(
                    &lookup,
                    "COLLECTOR_RATE_LIMIT_COOLDOWN_SECS",
                    10,
                ),
            },
            schedule: ScheduleConfig {
                loop_interval_secs: parse_or(&lookup, "COLLECTOR_LOOP_INTERVAL_SECS", 60),
            },
        })
    }

    /// DB 설정. `DATABASE_URL`이 없으면 에러
    pub fn database(&self) -> Result<DatabaseConfig> {
        let url = self.database_url.clone().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;
        Ok(DatabaseConfig {
            max_connections: self.database_max_connections,
            ..DatabaseConfig::new(url)
        })
    }
}

impl ProviderConfig {
    /// 클라이언트 옵션으로 변환
    pub fn to_options(&self) -> CoinGeckoOptions {
        CoinGeckoOptions {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            vs_currency: self.vs_currency.clone(),
            per_page: self.per_page,
            snapshot_timeout: Duration::from_secs(self.snapshot_timeout_secs),
            detail_timeout: Duration::from_secs(self.detail_timeout_secs),
            icon_timeout: Duration::from_secs(self.icon_timeout_secs),
        }
    }
}

impl PacingConfig {
    pub fn icon_pause(&self) -> Duration {
        Duration::from_millis(self.icon_pause_ms)
    }

    pub fn detail_cooldown(&self) -> Duration {
        Duration::from_millis(self.detail_cooldown_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

impl ScheduleConfig {
    /// pass 사이 대기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_secs)
    }
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "설정값 파싱 실패, 기본값 사용");
            default
        }),
        None => default,
    }
}

/// 비어 있지 않은 문자열 값
fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
