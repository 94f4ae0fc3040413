//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
///
/// Provider 호출 실패와 로컬 저장소 실패를 하나의 분류 체계로 표현합니다.
/// 호출자는 `is_rate_limited()` 등으로 재시도 정책을 결정합니다.
#[derive(Debug, Error)]
pub enum DataError {
    /// 전송 계층 오류 (DNS, 연결 실패, 타임아웃)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider가 429를 반환함
    #[error("Rate limited by provider")]
    RateLimited,

    /// 429 이외의 non-2xx 응답
    #[error("Provider error [{status}]: {message}")]
    Provider { status: u16, message: String },

    /// Provider가 알지 못하는 ID
    #[error("Not found: {0}")]
    NotFound(String),

    /// 로컬 저장소 오류
    #[error("Storage error: {0}")]
    Storage(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// 429 응답 여부
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// HTTP 상태 코드를 오류로 분류합니다.
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(message.into()),
            _ => Self::Provider {
                status: status.as_u16(),
                message: message.into(),
            },
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return DataError::Serialization(err.to_string());
        }
        match err.status() {
            Some(status) => DataError::from_status(status, err.to_string()),
            None => DataError::Network(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
