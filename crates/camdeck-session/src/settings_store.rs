//! 카메라별 설정 저장소.
//!
//! 키-값 저장소의 고정 키 하나에 `{ [cameraId]: { camera, motion } }` JSON으로 보관한다.
//! 레코드는 카메라가 처음 참조될 때 기본값으로 생성된다.

use camdeck_core::error::CoreError;
use camdeck_core::models::settings::{CameraParams, CameraSettings, MotionParams, SettingsPatch};
use camdeck_core::ports::kv_store::KeyValueStore;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 단일 카메라 시절 포맷을 옮겨 담을 카메라 ID
pub const LEGACY_CAMERA_ID: &str = "default";

/// `load()` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// 저장된 레코드 복원 (`replaced`: 기본값으로 대체된 레코드 수)
    Restored { cameras: usize, replaced: usize },
    /// 단일 카메라 포맷을 `default` 카메라로 이전
    Migrated,
    /// 저장값 없음 또는 파싱 실패 → 기본값 저장
    Defaulted,
}

/// 카메라별 설정 저장소
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    records: BTreeMap<String, CameraSettings>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            records: BTreeMap::new(),
        }
    }

    /// 저장소에서 복원
    ///
    /// 누락 필드만 기본값으로 채운다 (명시적 0은 유지).
    /// 디코딩에 실패한 카메라 레코드는 경고 후 기본값으로 대체한다.
    pub async fn load(&mut self) -> LoadOutcome {
        let raw = match self.kv.get(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("설정 조회 실패, 기본값 사용: {e}");
                None
            }
        };

        let parsed = raw.as_deref().map(serde_json::from_str::<Value>);
        let outcome = match parsed {
            Some(Ok(Value::Object(obj))) if is_legacy(&obj) => {
                let record = decode_record(&Value::Object(obj)).unwrap_or_else(|e| {
                    warn!("단일 카메라 설정 디코딩 실패, 기본값 사용: {e}");
                    CameraSettings::default()
                });
                self.records = BTreeMap::from([(LEGACY_CAMERA_ID.to_string(), record)]);
                info!("단일 카메라 설정을 '{LEGACY_CAMERA_ID}' 카메라로 이전");
                LoadOutcome::Migrated
            }
            Some(Ok(Value::Object(obj))) => {
                let mut replaced = 0;
                self.records = obj
                    .into_iter()
                    .map(|(camera_id, value)| {
                        let record = decode_record(&value).unwrap_or_else(|e| {
                            warn!("카메라 설정 디코딩 실패, 기본값으로 대체: {camera_id}: {e}");
                            replaced += 1;
                            CameraSettings::default()
                        });
                        (camera_id, record)
                    })
                    .collect();
                LoadOutcome::Restored {
                    cameras: self.records.len(),
                    replaced,
                }
            }
            Some(Ok(other)) => {
                warn!("설정 형식 오류 (객체 아님): {other}");
                self.records.clear();
                LoadOutcome::Defaulted
            }
            Some(Err(e)) => {
                warn!("설정 파싱 실패, 기본값 사용: {e}");
                self.records.clear();
                LoadOutcome::Defaulted
            }
            None => {
                debug!("저장된 설정 없음, 기본값 사용");
                self.records.clear();
                LoadOutcome::Defaulted
            }
        };

        if !matches!(outcome, LoadOutcome::Restored { replaced: 0, .. }) {
            self.save().await;
        }
        info!("카메라 설정 로드: {outcome:?}");
        outcome
    }

    /// 저장소에 기록. 실패는 로그만 남긴다.
    pub async fn save(&self) {
        let json = match serde_json::to_string(&self.records) {
            Ok(json) => json,
            Err(e) => {
                warn!("설정 직렬화 실패: {e}");
                return;
            }
        };

        if let Err(e) = self.kv.set(&self.key, &json).await {
            warn!("설정 저장 실패: {e}");
        }
    }

    /// 카메라 레코드 조회 (없으면 None)
    pub fn get(&self, camera_id: &str) -> Option<&CameraSettings> {
        self.records.get(camera_id)
    }

    /// 카메라 레코드 조회, 없으면 기본값으로 생성
    pub fn entry(&mut self, camera_id: &str) -> &CameraSettings {
        self.records
            .entry(camera_id.to_string())
            .or_insert_with(|| {
                debug!("카메라 설정 레코드 생성: {camera_id}");
                CameraSettings::default()
            })
    }

    /// 부분 설정 병합
    ///
    /// 레코드가 없으면 기본값으로 먼저 만든다. 타입 오류면 레코드는 그대로다.
    pub fn apply(
        &mut self,
        camera_id: &str,
        patch: &SettingsPatch,
    ) -> Result<&CameraSettings, CoreError> {
        self.entry(camera_id);
        let record = self
            .records
            .get_mut(camera_id)
            .ok_or_else(|| CoreError::Internal(format!("설정 레코드 없음: {camera_id}")))?;
        record.apply(patch)?;
        Ok(record)
    }

    pub fn camera_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// `{camera, motion}` 단일 레코드 포맷인지
fn is_legacy(obj: &Map<String, Value>) -> bool {
    let has_known = |group: &str, known: fn(&str) -> bool| {
        obj.get(group)
            .and_then(Value::as_object)
            .is_some_and(|fields| fields.keys().any(|k| known(k)))
    };

    !obj.is_empty()
        && obj.keys().all(|k| k == "camera" || k == "motion")
        && (has_known("camera", CameraParams::has_field) || has_known("motion", MotionParams::has_field))
}

/// 저장된 레코드 하나를 기본값 위에 병합
fn decode_record(value: &Value) -> Result<CameraSettings, CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::validation("record", "객체가 아님"))?;

    let group = |name: &str| -> Result<Option<Map<String, Value>>, CoreError> {
        match obj.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(fields)) => Ok(Some(fields.clone())),
            Some(_) => Err(CoreError::validation(name, "객체가 아님")),
        }
    };

    let patch = SettingsPatch {
        camera: group("camera")?,
        motion: group("motion")?,
    };
    let mut record = CameraSettings::default();
    record.apply(&patch)?;
    Ok(record)
}
