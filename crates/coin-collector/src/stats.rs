//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// reconciliation pass 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassStats {
    /// 스냅샷 항목 수
    pub total: usize,
    /// 새로 생성된 레코드 수
    pub created: usize,
    /// 갱신된 레코드 수
    pub updated: usize,
    /// 처리 실패 항목 수
    pub failed: usize,
    /// 저장된 아이콘 수
    pub icons_fetched: usize,
    /// 아이콘 수집 실패 수
    pub icon_failures: usize,
    /// 채워진 설명 수
    pub descriptions_fetched: usize,
    /// 설명 수집 실패 수 (429 제외)
    pub description_failures: usize,
    /// 429 응답 수
    pub rate_limited: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PassStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.created + self.updated) as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            created = self.created,
            updated = self.updated,
            failed = self.failed,
            icons = self.icons_fetched,
            icon_failures = self.icon_failures,
            descriptions = self.descriptions_fetched,
            description_failures = self.description_failures,
            rate_limited = self.rate_limited,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
