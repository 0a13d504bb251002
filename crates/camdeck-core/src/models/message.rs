//! 소켓 메시지 봉투 (envelope).
//!
//! 송수신 모두 `{type, action?, message?, command?, camera_id?, camera_name?, data?}`
//! 형태의 JSON 객체를 사용한다. 목적별로 사용하는 필드 조합이 다르다.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::models::command::CommandToken;
use crate::models::directory::StatusPayload;
use crate::models::settings::{CameraSettings, SettingsPatch};

/// 와이어 봉투
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(
        default,
        deserialize_with = "opaque_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub camera_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// 카메라 ID는 문자열 또는 숫자로 올 수 있다
fn opaque_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================
// 송신 메시지
// ============================================================

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// 웹 클라이언트 식별
    Init,
    /// 설정 전송 (camera_id가 없으면 서버의 선택 카메라에 적용)
    Settings {
        camera_id: Option<String>,
        settings: CameraSettings,
    },
    /// 카메라 선택
    SelectCamera { camera_id: String },
    /// 카메라 설정 요청
    GetSettings { camera_id: String },
    /// 모터/버튼/LED 명령
    Command {
        camera_id: String,
        token: CommandToken,
    },
    /// 카메라 이름 변경
    UpdateName {
        camera_id: String,
        camera_name: String,
    },
}

impl OutboundMessage {
    /// 로그용 메시지 종류
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Init => "init",
            OutboundMessage::Settings { .. } => "settings",
            OutboundMessage::SelectCamera { .. } => "select_camera",
            OutboundMessage::GetSettings { .. } => "get_settings",
            OutboundMessage::Command { .. } => "command",
            OutboundMessage::UpdateName { .. } => "update_name",
        }
    }

    /// 특정 카메라를 대상으로 하는 메시지면 그 ID
    pub fn target_camera(&self) -> Option<&str> {
        match self {
            OutboundMessage::Init => None,
            OutboundMessage::Settings { camera_id, .. } => camera_id.as_deref(),
            OutboundMessage::SelectCamera { camera_id }
            | OutboundMessage::GetSettings { camera_id }
            | OutboundMessage::Command { camera_id, .. }
            | OutboundMessage::UpdateName { camera_id, .. } => Some(camera_id),
        }
    }

    /// 카메라 ID가 반드시 필요한 메시지인지
    pub fn requires_camera(&self) -> bool {
        !matches!(
            self,
            OutboundMessage::Init | OutboundMessage::Settings { .. }
        )
    }

    /// 와이어 봉투로 변환
    pub fn to_envelope(&self) -> Result<Envelope, CoreError> {
        let envelope = match self {
            OutboundMessage::Init => Envelope {
                message: Some("init".to_string()),
                ..Envelope::default()
            },
            OutboundMessage::Settings {
                camera_id,
                settings,
            } => Envelope {
                kind: Some("web".to_string()),
                action: Some("settings".to_string()),
                camera_id: camera_id.clone(),
                data: Some(serde_json::to_value(settings)?),
                ..Envelope::default()
            },
            OutboundMessage::SelectCamera { camera_id } => Envelope {
                kind: Some("web".to_string()),
                action: Some("select_camera".to_string()),
                camera_id: Some(camera_id.clone()),
                ..Envelope::default()
            },
            OutboundMessage::GetSettings { camera_id } => Envelope {
                kind: Some("web".to_string()),
                action: Some("get_settings".to_string()),
                camera_id: Some(camera_id.clone()),
                ..Envelope::default()
            },
            OutboundMessage::Command { camera_id, token } => {
                let token = Some(token.as_str().to_string());
                let (message, command) = if self.is_led_command() {
                    (token, None)
                } else {
                    (None, token)
                };
                Envelope {
                    kind: Some("command".to_string()),
                    message,
                    command,
                    camera_id: Some(camera_id.clone()),
                    ..Envelope::default()
                }
            }
            OutboundMessage::UpdateName {
                camera_id,
                camera_name,
            } => Envelope {
                kind: Some("camera".to_string()),
                action: Some("update_name".to_string()),
                camera_id: Some(camera_id.clone()),
                camera_name: Some(camera_name.clone()),
                ..Envelope::default()
            },
        };
        Ok(envelope)
    }

    /// JSON 텍스트로 직렬화
    pub fn to_text(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(&self.to_envelope()?)?)
    }

    fn is_led_command(&self) -> bool {
        matches!(self, OutboundMessage::Command { token, .. } if token.is_led())
    }
}

// ============================================================
// 수신 메시지
// ============================================================

/// 서버 → 클라이언트 구조화 메시지
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// 전체 카메라 상태
    Status(StatusPayload),
    /// 설정 갱신 (camera_id가 없으면 현재 선택 카메라)
    Settings {
        camera_id: Option<String>,
        patch: SettingsPatch,
    },
    /// 카메라 이름 변경 완료
    NameUpdated {
        camera_id: String,
        camera_name: String,
    },
    /// 처리 대상이 아닌 메시지
    Unrecognized { kind: Option<String> },
}

impl InboundMessage {
    /// JSON 텍스트 파싱
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    /// 봉투를 메시지 종류별로 분류
    pub fn from_envelope(envelope: Envelope) -> Result<Self, CoreError> {
        match envelope.kind.as_deref() {
            Some("status") => {
                let payload = match envelope.data {
                    Some(data) => serde_json::from_value(data)?,
                    None => StatusPayload::default(),
                };
                Ok(InboundMessage::Status(payload))
            }
            Some("settings") => {
                let patch = match envelope.data {
                    Some(data) => serde_json::from_value(data)?,
                    None => SettingsPatch::default(),
                };
                Ok(InboundMessage::Settings {
                    camera_id: envelope.camera_id,
                    patch,
                })
            }
            Some("camera") if envelope.message.as_deref() == Some("name_updated") => {
                let camera_id = envelope
                    .camera_id
                    .ok_or_else(|| CoreError::validation("camera_id", "name_updated에 누락"))?;
                let camera_name = envelope
                    .camera_name
                    .ok_or_else(|| CoreError::validation("camera_name", "name_updated에 누락"))?;
                Ok(InboundMessage::NameUpdated {
                    camera_id,
                    camera_name,
                })
            }
            _ => Ok(InboundMessage::Unrecognized {
                kind: envelope.kind,
            }),
        }
    }
}
