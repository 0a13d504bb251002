//! 연결 상태 추적.
//!
//! 연속 실패 횟수와 재시도 정책을 관리하고,
//! 상태 변경을 `watch` 채널로 브로드캐스트한다.

use camdeck_core::models::connection::ConnectionStatus;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 재연결 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 실패 후 다음 시도까지 대기 시간
    pub delay: Duration,
    /// 최대 재연결 시도 횟수 (None = 무제한)
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

/// 실패 기록 후 다음 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// `delay` 후 `attempt`번째 재연결 시도
    Retry { attempt: u32, delay: Duration },
    /// 최대 시도 초과
    GiveUp { attempts: u32 },
}

/// 연결 상태 추적기
///
/// 재연결 시도 횟수는 연결이 열리거나 명시적 연결 요청이 있을 때 리셋된다.
pub struct ConnectivityTracker {
    policy: RetryPolicy,
    /// 마지막 open 이후 예약된 재연결 시도 횟수
    attempts: AtomicU32,
    status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl ConnectivityTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Idle);
        Self {
            policy,
            attempts: AtomicU32::new(0),
            status_tx,
            status_rx,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 현재 연결 상태
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// 상태 변경 수신기 생성
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// 재연결 시도 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// 명시적 연결 시작 기록 (시도 횟수 리셋)
    pub fn record_connecting(&self) {
        self.attempts.store(0, Ordering::Relaxed);
        self.set_status(ConnectionStatus::Connecting);
    }

    /// 재연결 시도 시작 기록
    pub fn record_reconnecting(&self) {
        let attempt = self.attempts();
        self.set_status(ConnectionStatus::Reconnecting { attempt });
    }

    /// 연결 성공 기록
    pub fn record_open(&self) {
        let previous = self.attempts.swap(0, Ordering::Relaxed);
        if previous > 0 {
            info!("서버 연결 복구됨 ({previous}회 재시도 후)");
        }
        self.set_status(ConnectionStatus::Connected);
    }

    /// 연결 실패/종료 기록
    pub fn record_failure(&self) -> RetryDecision {
        let attempts = self.attempts();

        if let Some(max) = self.policy.max_attempts {
            if attempts >= max {
                warn!("재연결 {attempts}회 실패 - 재시도 중단");
                self.set_status(ConnectionStatus::GaveUp { attempts });
                return RetryDecision::GiveUp { attempts };
            }
        }

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "연결 실패 기록 - {}ms 후 재연결 #{attempt}",
            self.policy.delay.as_millis()
        );
        self.set_status(ConnectionStatus::Disconnected);
        RetryDecision::Retry {
            attempt,
            delay: self.policy.delay,
        }
    }

    /// 사용자 연결 종료 기록
    pub fn record_idle(&self) {
        self.attempts.store(0, Ordering::Relaxed);
        self.set_status(ConnectionStatus::Idle);
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

impl Default for ConnectivityTracker {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
