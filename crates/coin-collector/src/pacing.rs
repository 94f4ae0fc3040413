//! Provider 요청 간격 제어.
//!
//! CoinGecko 무료 API는 비공식적인 rate limit이 있어 요청 사이에 대기가 필요합니다.
//! 리소스 종류(아이콘, 상세)별로 게이트를 두고, 요청이 진행 중인 동안 게이트를 잡아
//! 여러 항목을 동시에 처리하더라도 요청마다 대기가 적용되도록 합니다.
//!
//! | 종류 | 요청 전 | 성공 후 | 429 수신 후 |
//! |------|---------|---------|-------------|
//! | 아이콘 | - | `icon_pause` | `rate_limit_cooldown` |
//! | 상세 | `detail_cooldown` | - | `rate_limit_cooldown` |
//!
//! 실제 대기는 [`Pacer`]에 위임하므로 테스트에서는 시간을 흘려보내지 않고 대기 요청만 기록합니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::PacingConfig;

/// 대기 수행자.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// tokio 타이머 기반 대기.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// 요청 리소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// 아이콘 이미지
    Icon,
    /// 코인 상세 (설명)
    Detail,
}

impl ResourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icon => "icon",
            Self::Detail => "detail",
        }
    }
}

/// 리소스 종류별 요청 간격 제한기.
pub struct RequestLimiter {
    config: PacingConfig,
    pacer: Arc<dyn Pacer>,
    icon_gate: Mutex<()>,
    detail_gate: Mutex<()>,
}

impl RequestLimiter {
    pub fn new(config: PacingConfig, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            config,
            pacer,
            icon_gate: Mutex::new(()),
            detail_gate: Mutex::new(()),
        }
    }

    fn gate(&self, class: ResourceClass) -> &Mutex<()> {
        match class {
            ResourceClass::Icon => &self.icon_gate,
            ResourceClass::Detail => &self.detail_gate,
        }
    }

    /// tokio 타이머를 사용하는 제한기
    pub fn with_tokio(config: PacingConfig) -> Self {
        Self::new(config, Arc::new(TokioPacer))
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// 요청 허가 획득.
    ///
    /// 같은 종류의 다른 요청이 끝날 때까지 기다린 뒤 요청 전 대기를 수행합니다.
    /// 반환된 [`Permit`]을 가진 동안 같은 종류의 다음 요청은 시작되지 않습니다.
    pub async fn acquire(&self, class: ResourceClass) -> Permit<'_> {
        let guard = self.gate(class).lock().await;

        let before = match class {
            ResourceClass::Icon => Duration::ZERO,
            ResourceClass::Detail => self.config.detail_cooldown(),
        };
        if !before.is_zero() {
            tracing::trace!(class = class.as_str(), wait_ms = before.as_millis() as u64, "요청 전 대기");
            self.pacer.pause(before).await;
        }

        Permit {
            limiter: self,
            class,
            _guard: guard,
        }
    }
}

/// 진행 중인 요청에 대한 허가.
pub struct Permit<'a> {
    limiter: &'a RequestLimiter,
    class: ResourceClass,
    _guard: MutexGuard<'a, ()>,
}

impl Permit<'_> {
    /// 요청 성공. 성공 후 대기가 있으면 수행합니다.
    pub async fn succeeded(self) {
        let after = match self.class {
            ResourceClass::Icon => self.limiter.config.icon_pause(),
            ResourceClass::Detail => Duration::ZERO,
        };
        if !after.is_zero() {
            self.limiter.pacer.pause(after).await;
        }
    }

    /// 429 수신. 긴 대기를 수행합니다.
    pub async fn rate_limited(self) {
        let cooldown = self.limiter.config.rate_limit_cooldown();
        tracing::warn!(
            class = self.class.as_str(),
            cooldown_secs = cooldown.as_secs(),
            "Rate limit 도달, 대기 중..."
        );
        self.limiter.pacer.pause(cooldown).await;
    }

    /// 그 밖의 실패. 추가 대기 없이 허가를 반납합니다.
    pub fn failed(self) {}
}
