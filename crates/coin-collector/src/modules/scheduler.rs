//! pass 실행 스케줄러.
//!
//! - 단일 실행: pass 1회 후 종료 (pass 실패와 무관)
//! - 반복 실행: pass → 고정 간격 대기 → 반복. 대기는 backoff가 아니라 단순 지연입니다.
//!
//! 진행 중인 pass를 중간에 취소하지 않습니다. 반복 실행은 프로세스 종료로만 멈춥니다.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::reconcile::ReconciliationEngine;
use crate::pacing::Pacer;

/// 실행 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// pass 1회
    Once,
    /// pass 사이에 `interval`만큼 대기하며 무한 반복
    Loop { interval: Duration },
}

/// 스케줄러 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    SleepWait,
    Terminated,
}

/// 스케줄러.
pub struct Scheduler {
    engine: ReconciliationEngine,
    mode: RunMode,
    pacer: Arc<dyn Pacer>,
    state: SchedulerState,
    passes: u64,
    failed_passes: u64,
}

impl Scheduler {
    pub fn new(engine: ReconciliationEngine, mode: RunMode, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            engine,
            mode,
            pacer,
            state: SchedulerState::Idle,
            passes: 0,
            failed_passes: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// 실행한 pass 수
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// 스냅샷 조회에 실패한 pass 수
    pub fn failed_passes(&self) -> u64 {
        self.failed_passes
    }

    /// 모드에 따라 실행합니다. 반복 모드에서는 반환하지 않습니다.
    pub async fn run(&mut self) {
        self.run_bounded(None).await;
    }

    /// 최대 `max_passes`회까지만 실행합니다 (`None`이면 모드대로).
    pub async fn run_bounded(&mut self, max_passes: Option<u64>) {
        loop {
            self.run_one().await;

            let interval = match self.mode {
                RunMode::Once => break,
                RunMode::Loop { interval } => interval,
            };
            if max_passes.is_some_and(|max| self.passes >= max) {
                break;
            }

            self.state = SchedulerState::SleepWait;
            info!(wait_secs = interval.as_secs(), "다음 업데이트까지 대기 중...");
            self.pacer.pause(interval).await;
        }

        self.state = SchedulerState::Terminated;
    }

    async fn run_one(&mut self) {
        self.state = SchedulerState::Running;
        self.passes += 1;
        info!(pass = self.passes, "=== 코인 업데이트 시작 ===");

        match self.engine.run_pass().await {
            Ok(stats) => stats.log_summary("코인 업데이트"),
            Err(e) => {
                self.failed_passes += 1;
                error!(pass = self.passes, error = %e, "시세 조회 실패, 다음 pass에서 재시도");
            }
        }
    }
}
