//! CAMDECK 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입을 그대로 반환하거나 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 전송 계층 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 네트워크 에러 (연결 실패, 소켓 에러)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 연결 타임아웃
    #[error("연결 타임아웃: {timeout_ms}ms 초과")]
    Timeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 소켓이 열려 있지 않음
    #[error("소켓 미연결 상태")]
    NotConnected,

    /// 카메라 대상 명령인데 선택된 카메라가 없음
    #[error("선택된 카메라 없음")]
    NoCameraSelected,

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 필드 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 전제조건 위반 여부 (로그 후 조용히 건너뛰는 에러)
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotConnected | Self::NoCameraSelected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = CoreError::validation("host", "비어 있음");
        assert_eq!(err.to_string(), "유효성 검증 실패 — host: 비어 있음");
    }

    #[test]
    fn precondition_classification() {
        assert!(CoreError::NotConnected.is_precondition());
        assert!(CoreError::NoCameraSelected.is_precondition());
        assert!(!CoreError::Timeout { timeout_ms: 5_000 }.is_precondition());
    }
}
