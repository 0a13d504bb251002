//! 연결/스트림 상태 모델.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 연결 관리자 내부 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// UI에 보고되는 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// 연결 시도 중 (최초 또는 명시적 연결)
    Connecting,
    /// 연결됨
    Connected,
    /// 연결 끊김, 재연결 대기
    Disconnected,
    /// 재연결 시도 중
    Reconnecting { attempt: u32 },
    /// 최대 재시도 초과, 사용자 조치 필요
    GaveUp { attempts: u32 },
    /// 사용자가 연결 종료
    Idle,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "Connecting"),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Reconnecting { attempt } => write!(f, "Reconnecting (#{attempt})"),
            ConnectionStatus::GaveUp { attempts } => {
                write!(f, "Gave up after {attempts} attempts")
            }
            ConnectionStatus::Idle => write!(f, "Idle"),
        }
    }
}

/// 스트림 표시 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    /// 로딩/플레이스홀더 표시
    Loading,
    /// 프레임 표시 중
    Streaming,
}
