//! # camdeck-core
//!
//! CAMDECK 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 카메라 설정, 디렉토리, 소켓 메시지 봉투, 명령 토큰
//! - [`ports`] — Hexagonal Architecture 포트 인터페이스
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 애플리케이션 설정 구조체
//! - [`config_manager`] — 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::message::{InboundMessage, OutboundMessage};
    use crate::models::settings::CameraSettings;

    #[test]
    fn server_settings_echo_applies_to_record() {
        // 서버가 받은 settings를 그대로 다시 브로드캐스트하는 경우
        let mut sent = CameraSettings::default();
        sent.camera.quality = 30;
        let text = OutboundMessage::Settings {
            camera_id: Some("cam".to_string()),
            settings: sent.clone(),
        }
        .to_text()
        .unwrap();
        let echoed = text.replace(r#""type":"web","action":"settings""#, r#""type":"settings""#);

        let InboundMessage::Settings { camera_id, patch } = InboundMessage::parse(&echoed).unwrap()
        else {
            panic!("settings 메시지여야 함");
        };
        let mut local = CameraSettings::default();
        local.apply(&patch).unwrap();

        assert_eq!(camera_id.as_deref(), Some("cam"));
        assert_eq!(local, sent);
    }

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.server.connect_timeout_ms, 5_000);
        assert_eq!(config.server.retry_delay_ms, 5_000);
        assert_eq!(config.selection.grace_period_ms, 5_000);
        assert!(config.selection.request_settings_on_select);
    }
}
