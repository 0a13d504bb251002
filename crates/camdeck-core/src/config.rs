//! 애플리케이션 설정 구조체.
//!
//! 서버 주소, 연결 타임아웃/재연결 정책, 카메라 선택 유예 시간,
//! 설정 저장 키, 스트림 출력 경로 등 런타임 설정을 정의한다.
//! `ConfigManager`를 통해 JSON 파일에서 로드된다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 서버 연결 설정
    pub server: ServerConfig,
    /// 카메라 선택 설정
    #[serde(default)]
    pub selection: SelectionConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 스트림 표시 설정
    #[serde(default)]
    pub stream: StreamConfig,
}

// ============================================================
// 서버 설정
// ============================================================

/// 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 호스트 (예: "192.168.0.156")
    pub host: String,
    /// 서버 포트 (문자열 그대로 보관, 연결 시 검증)
    pub port: String,
    /// 연결 수립 타임아웃 (밀리초)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// 메시지 한 건 전송 타임아웃 (밀리초)
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// 재연결 대기 시간 (밀리초)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// 최대 재연결 시도 횟수 (None이면 무제한)
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    /// 시작 시 자동 연결
    #[serde(default = "default_true")]
    pub auto_connect: bool,
}

// ============================================================
// 카메라 선택 설정
// ============================================================

/// 카메라 선택 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// 선택된 카메라 연결 끊김 후 선택 해제까지 유예 시간 (밀리초, 0이면 즉시)
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// 카메라 선택 시 서버에 설정 요청
    #[serde(default = "default_true")]
    pub request_settings_on_select: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            request_settings_on_select: true,
        }
    }
}

// ============================================================
// 저장소/스트림 설정
// ============================================================

/// 로컬 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite DB 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// 카메라 설정 저장 키
    #[serde(default = "default_settings_key")]
    pub settings_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            settings_key: default_settings_key(),
        }
    }
}

/// 스트림 표시 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    /// 최신 프레임을 기록할 파일 경로 (None이면 기록하지 않음)
    #[serde(default)]
    pub frame_output: Option<PathBuf>,
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                host: "192.168.0.156".to_string(),
                port: "5000".to_string(),
                connect_timeout_ms: default_connect_timeout_ms(),
                send_timeout_ms: default_send_timeout_ms(),
                retry_delay_ms: default_retry_delay_ms(),
                max_reconnect_attempts: None,
                auto_connect: true,
            },
            selection: SelectionConfig::default(),
            storage: StorageConfig::default(),
            stream: StreamConfig::default(),
        }
    }

    /// 연결 타임아웃을 Duration으로 반환
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.connect_timeout_ms)
    }

    /// 전송 타임아웃을 Duration으로 반환
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.server.send_timeout_ms)
    }

    /// 재연결 대기 시간을 Duration으로 반환
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.server.retry_delay_ms)
    }

    /// 선택 해제 유예 시간을 Duration으로 반환
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.selection.grace_period_ms)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_send_timeout_ms() -> u64 {
    5_000
}
fn default_retry_delay_ms() -> u64 {
    5_000
}
fn default_grace_period_ms() -> u64 {
    5_000
}
fn default_settings_key() -> String {
    "cameraSettings".to_string()
}
