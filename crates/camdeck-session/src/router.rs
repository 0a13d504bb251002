//! 수신 메시지 라우팅.
//!
//! 텍스트 프레임을 구조화 메시지로 분류하고, 설정 push의 대상 카메라를 결정한다.
//! 바이너리 프레임은 그대로 `frame` 모듈로 간다.

use camdeck_core::models::message::InboundMessage;
use tracing::{debug, warn};

/// 텍스트 메시지 분류
///
/// 잘못된 JSON과 처리 대상이 아닌 종류는 로그 후 None.
pub fn route_text(text: &str) -> Option<InboundMessage> {
    match InboundMessage::parse(text) {
        Ok(InboundMessage::Unrecognized { kind }) => {
            debug!("처리하지 않는 메시지 종류: {kind:?}");
            None
        }
        Ok(message) => Some(message),
        Err(e) => {
            warn!("메시지 파싱 실패: {e}");
            debug!("원본 메시지: {text}");
            None
        }
    }
}

/// 설정 push 대상 카메라
///
/// 명시적 `camera_id`가 우선이고, 없으면 현재 선택 카메라.
pub fn settings_target(explicit: Option<&str>, selected: Option<&str>) -> Option<String> {
    explicit
        .filter(|id| !id.is_empty())
        .or(selected)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_and_unknown_are_dropped() {
        assert_eq!(route_text("{oops"), None);
        assert_eq!(route_text(r#"{"type":"telemetry","data":{}}"#), None);
        assert_eq!(route_text(r#"{"message":"pong"}"#), None);
    }

    #[test]
    fn status_and_name_updates_are_routed() {
        let status = route_text(r#"{"type":"status","data":{"cameras":{"c1":{"connected":true}}}}"#);
        assert!(matches!(status, Some(InboundMessage::Status(_))));

        let renamed = route_text(
            r#"{"type":"camera","message":"name_updated","camera_id":"c1","camera_name":"Porch"}"#,
        );
        assert_eq!(
            renamed,
            Some(InboundMessage::NameUpdated {
                camera_id: "c1".to_string(),
                camera_name: "Porch".to_string()
            })
        );
    }

    #[test]
    fn name_update_without_id_is_dropped() {
        assert_eq!(
            route_text(r#"{"type":"camera","message":"name_updated","camera_name":"x"}"#),
            None
        );
    }

    #[test]
    fn explicit_target_wins_over_selection() {
        assert_eq!(settings_target(Some("c2"), Some("c1")).as_deref(), Some("c2"));
        assert_eq!(settings_target(None, Some("c1")).as_deref(), Some("c1"));
        assert_eq!(settings_target(Some(""), Some("c1")).as_deref(), Some("c1"));
        assert_eq!(settings_target(None, None), None);
    }
}
