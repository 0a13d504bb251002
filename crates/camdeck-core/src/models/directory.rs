//! 카메라 디렉토리 모델.
//!
//! 서버 status push마다 통째로 재구성되는 카메라 목록과
//! 그로부터 계산되는 상태 배지.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// 카메라 한 대의 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEntry {
    /// 카메라 식별자
    pub id: String,
    /// 표시 이름
    pub name: String,
    /// 서버 연결 여부
    pub connected: bool,
    /// 서버가 보고한 FPS 추정치
    pub fps: Option<f64>,
    /// 마지막 수신 시각
    pub last_seen: Option<DateTime<Utc>>,
}

/// status push의 `data` 필드
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// 카메라 ID → 상태 (없으면 "사용 가능한 카메라 없음")
    #[serde(default)]
    pub cameras: Option<Map<String, Value>>,
    /// 접속 중인 웹 클라이언트 수
    #[serde(default)]
    pub web_clients: Option<u32>,
}

/// 카메라 상태 와이어 포맷 (서버 측 device_status 항목)
#[derive(Debug, Deserialize)]
struct CameraStatusWire {
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    last_seen: Option<f64>,
}

/// 카메라 디렉토리 (서버 보고 순서 유지)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraDirectory {
    entries: Vec<CameraEntry>,
    web_clients: u32,
    available: bool,
}

impl CameraDirectory {
    /// status push로부터 디렉토리 재구성
    ///
    /// 형식이 잘못된 항목은 경고 후 건너뛴다.
    pub fn from_status(payload: &StatusPayload) -> Self {
        let Some(cameras) = &payload.cameras else {
            return Self {
                entries: Vec::new(),
                web_clients: payload.web_clients.unwrap_or(0),
                available: false,
            };
        };

        let entries = cameras
            .iter()
            .filter_map(|(id, raw)| {
                match serde_json::from_value::<CameraStatusWire>(raw.clone()) {
                    Ok(wire) => Some(CameraEntry {
                        id: id.clone(),
                        name: wire.name.unwrap_or_else(|| format!("Camera {id}")),
                        connected: wire.connected,
                        fps: wire.fps,
                        last_seen: wire.last_seen.and_then(unix_seconds_to_utc),
                    }),
                    Err(e) => {
                        warn!("카메라 상태 항목 파싱 실패: {id}: {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            entries,
            web_clients: payload.web_clients.unwrap_or(0),
            available: true,
        }
    }

    /// 연결 끊김 상태 (카메라 정보 없음)
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// status push에 카메라 목록이 포함되어 있었는지
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn get(&self, id: &str) -> Option<&CameraEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// 해당 카메라가 존재하고 연결되어 있는지
    pub fn is_connected(&self, id: &str) -> bool {
        self.get(id).is_some_and(|e| e.connected)
    }

    /// 보고 순서상 첫 번째 연결된 카메라
    pub fn first_connected(&self) -> Option<&CameraEntry> {
        self.entries.iter().find(|e| e.connected)
    }

    pub fn connected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.connected).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CameraEntry> {
        self.entries.iter()
    }

    pub fn web_clients(&self) -> u32 {
        self.web_clients
    }

    /// 표시 이름 제자리 갱신. 항목이 없으면 false.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.name = name.to_string();
                true
            }
            None => false,
        }
    }
}

fn unix_seconds_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    Utc.timestamp_opt(whole, nanos).single()
}

/// 배지 수준
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeLevel {
    Success,
    Warning,
    Danger,
}

/// 카메라 상태 배지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBadge {
    pub text: String,
    pub level: BadgeLevel,
}

impl StatusBadge {
    /// 디렉토리와 현재 선택으로부터 배지 계산
    pub fn evaluate(directory: &CameraDirectory, selected: Option<&str>) -> Self {
        if !directory.is_available() {
            return Self {
                text: "No Cameras Available".to_string(),
                level: BadgeLevel::Danger,
            };
        }

        let selected_disconnected = selected
            .and_then(|id| directory.get(id))
            .is_some_and(|e| !e.connected);
        if selected_disconnected {
            return Self {
                text: "Camera Disconnected - Attempting to reconnect...".to_string(),
                level: BadgeLevel::Warning,
            };
        }

        let connected = directory.connected_count();
        let total = directory.len();
        if connected == 0 {
            return Self {
                text: "No Cameras Connected".to_string(),
                level: BadgeLevel::Danger,
            };
        }

        Self {
            text: format!("Cameras: {connected}/{total} Connected"),
            level: if connected == total {
                BadgeLevel::Success
            } else {
                BadgeLevel::Warning
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> StatusPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn builds_directory_in_server_order() {
        let dir = CameraDirectory::from_status(&payload(json!({
            "cameras": {
                "zeta": {"connected": false, "name": "Garage"},
                "alpha": {"connected": true, "name": "Porch", "last_seen": 1700000000.5}
            },
            "web_clients": 2
        })));

        let ids: Vec<&str> = dir.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(dir.first_connected().unwrap().id, "alpha");
        assert_eq!(dir.connected_count(), 1);
        assert_eq!(dir.web_clients(), 2);
        assert!(dir.get("alpha").unwrap().last_seen.is_some());
    }

    #[test]
    fn missing_name_uses_server_default() {
        let dir = CameraDirectory::from_status(&payload(json!({
            "cameras": {"7": {"connected": true}}
        })));
        assert_eq!(dir.get("7").unwrap().name, "Camera 7");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let dir = CameraDirectory::from_status(&payload(json!({
            "cameras": {"a": {"connected": "yes"}, "b": {"connected": true}}
        })));
        assert_eq!(dir.len(), 1);
        assert!(dir.contains("b"));
    }

    #[test]
    fn no_cameras_field_means_unavailable() {
        let dir = CameraDirectory::from_status(&payload(json!({"web_clients": 1})));
        assert!(!dir.is_available());
        assert!(dir.is_empty());
    }

    #[test]
    fn rename_in_place() {
        let mut dir = CameraDirectory::from_status(&payload(json!({
            "cameras": {"a": {"connected": true, "name": "Old"}}
        })));
        assert!(dir.rename("a", "New"));
        assert_eq!(dir.get("a").unwrap().name, "New");
        assert!(!dir.rename("missing", "X"));
    }

    #[test]
    fn badge_states() {
        let dir = CameraDirectory::from_status(&payload(json!({
            "cameras": {"a": {"connected": true}, "b": {"connected": false}}
        })));
        let badge = StatusBadge::evaluate(&dir, Some("a"));
        assert_eq!(badge.text, "Cameras: 1/2 Connected");
        assert_eq!(badge.level, BadgeLevel::Warning);

        let badge = StatusBadge::evaluate(&dir, Some("b"));
        assert_eq!(badge.level, BadgeLevel::Warning);
        assert!(badge.text.starts_with("Camera Disconnected"));

        let none = CameraDirectory::from_status(&payload(json!({"cameras": {"a": {"connected": false}}})));
        assert_eq!(StatusBadge::evaluate(&none, None).text, "No Cameras Connected");

        let unavailable = CameraDirectory::disconnected();
        assert_eq!(StatusBadge::evaluate(&unavailable, None).level, BadgeLevel::Danger);
    }
}
