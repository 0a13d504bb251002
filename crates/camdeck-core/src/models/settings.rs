//! 카메라별 설정 모델.
//!
//! 센서 튜닝(`camera`)과 모션 감지 파라미터(`motion`) 두 그룹으로 구성된다.
//! 모든 값은 정수이며 불리언 필드는 0/1로 인코딩한다.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::CoreError;

/// 최대 JPEG 품질 값 (낮을수록 고품질)
pub const MAX_QUALITY: i32 = 63;

/// 센서 해상도 (프레임 크기)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resolution {
    /// 1600x1200
    #[default]
    Uxga,
    /// 1280x1024
    Sxga,
    /// 1280x720
    Hd,
    /// 1024x768
    Xga,
    /// 800x600
    Svga,
    /// 640x480
    Vga,
    /// 480x320
    Hvga,
    /// 400x296
    Cif,
    /// 320x240
    Qvga,
    /// 240x176
    Hqvga,
    /// 160x120
    Qqvga,
}

impl Resolution {
    /// 전체 해상도 목록 (큰 순서)
    pub const ALL: [Resolution; 11] = [
        Resolution::Uxga,
        Resolution::Sxga,
        Resolution::Hd,
        Resolution::Xga,
        Resolution::Svga,
        Resolution::Vga,
        Resolution::Hvga,
        Resolution::Cif,
        Resolution::Qvga,
        Resolution::Hqvga,
        Resolution::Qqvga,
    ];

    /// 와이어 표기 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Uxga => "UXGA",
            Resolution::Sxga => "SXGA",
            Resolution::Hd => "HD",
            Resolution::Xga => "XGA",
            Resolution::Svga => "SVGA",
            Resolution::Vga => "VGA",
            Resolution::Hvga => "HVGA",
            Resolution::Cif => "CIF",
            Resolution::Qvga => "QVGA",
            Resolution::Hqvga => "HQVGA",
            Resolution::Qqvga => "QQVGA",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::validation("resolution", format!("알 수 없는 해상도: {s}")))
    }
}

/// 센서 튜닝 파라미터
///
/// 누락된 필드는 기본값으로 채워진다 (0 값은 그대로 보존).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub resolution: Resolution,
    /// JPEG 품질 (0–63)
    pub quality: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub special_effect: i32,
    pub whitebal: i32,
    pub awb_gain: i32,
    pub wb_mode: i32,
    pub exposure_ctrl: i32,
    pub aec2: i32,
    pub ae_level: i32,
    pub aec_value: i32,
    pub gain_ctrl: i32,
    pub agc_gain: i32,
    pub gainceiling: i32,
    pub bpc: i32,
    pub wpc: i32,
    pub raw_gma: i32,
    pub lenc: i32,
    pub hmirror: i32,
    pub vflip: i32,
}

impl CameraParams {
    /// 0/1로 인코딩되는 불리언 필드
    pub const FLAG_FIELDS: [&'static str; 11] = [
        "whitebal",
        "awb_gain",
        "exposure_ctrl",
        "aec2",
        "gain_ctrl",
        "bpc",
        "wpc",
        "raw_gma",
        "lenc",
        "hmirror",
        "vflip",
    ];

    /// 정수 필드 (resolution 제외)
    pub const NUMERIC_FIELDS: [&'static str; 21] = [
        "quality",
        "brightness",
        "contrast",
        "saturation",
        "special_effect",
        "whitebal",
        "awb_gain",
        "wb_mode",
        "exposure_ctrl",
        "aec2",
        "ae_level",
        "aec_value",
        "gain_ctrl",
        "agc_gain",
        "gainceiling",
        "bpc",
        "wpc",
        "raw_gma",
        "lenc",
        "hmirror",
        "vflip",
    ];

    /// 알려진 필드 여부
    pub fn has_field(name: &str) -> bool {
        name == "resolution" || Self::NUMERIC_FIELDS.contains(&name)
    }

    fn normalize(&mut self) {
        self.quality = self.quality.clamp(0, MAX_QUALITY);
        for flag in [
            &mut self.whitebal,
            &mut self.awb_gain,
            &mut self.exposure_ctrl,
            &mut self.aec2,
            &mut self.gain_ctrl,
            &mut self.bpc,
            &mut self.wpc,
            &mut self.raw_gma,
            &mut self.lenc,
            &mut self.hmirror,
            &mut self.vflip,
        ] {
            *flag = i32::from(*flag != 0);
        }
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            resolution: Resolution::Uxga,
            quality: 12,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            special_effect: 0,
            whitebal: 1,
            awb_gain: 1,
            wb_mode: 0,
            exposure_ctrl: 1,
            aec2: 0,
            ae_level: 0,
            aec_value: 300,
            gain_ctrl: 1,
            agc_gain: 0,
            gainceiling: 0,
            bpc: 0,
            wpc: 1,
            raw_gma: 1,
            lenc: 1,
            hmirror: 0,
            vflip: 0,
        }
    }
}

/// 모션 감지 파라미터 (서버 측 감지기에 전달만 함)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MotionParams {
    /// 최소 윤곽 면적 (픽셀)
    pub min_area: i32,
    /// 프레임 차분 임계값
    pub threshold: i32,
    /// 가우시안 블러 커널 크기 (홀수)
    pub blur_size: i32,
    /// 팽창 반복 횟수
    pub dilation: i32,
}

impl MotionParams {
    pub const FIELDS: [&'static str; 4] = ["minArea", "threshold", "blurSize", "dilation"];

    pub fn has_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    fn normalize(&mut self) {
        if self.blur_size < 1 {
            self.blur_size = 1;
        } else if self.blur_size % 2 == 0 {
            self.blur_size += 1;
        }
    }
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            min_area: 4000,
            threshold: 25,
            blur_size: 31,
            dilation: 3,
        }
    }
}

/// 카메라 한 대의 전체 설정 레코드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub camera: CameraParams,
    pub motion: MotionParams,
}

impl CameraSettings {
    /// 부분 설정을 필드 단위로 병합
    ///
    /// 지정되지 않은 필드는 유지된다. 값의 타입이 맞지 않으면 레코드를
    /// 변경하지 않고 에러를 반환한다. 같은 패치를 여러 번 적용해도 결과는 같다.
    pub fn apply(&mut self, patch: &SettingsPatch) -> Result<(), CoreError> {
        let mut merged = self.clone();
        if let Some(fields) = &patch.camera {
            merged.camera = merge_group(&merged.camera, fields, "camera")?;
        }
        if let Some(fields) = &patch.motion {
            merged.motion = merge_group(&merged.motion, fields, "motion")?;
        }
        merged.normalize();
        *self = merged;
        Ok(())
    }

    /// 범위/형식 보정 (quality 클램프, 플래그 0/1, blurSize 홀수)
    pub fn normalize(&mut self) {
        self.camera.normalize();
        self.motion.normalize();
    }
}

/// 설정 부분 갱신 (서버 push 또는 사용자 편집)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<Map<String, Value>>,
}

impl SettingsPatch {
    /// `camera` 그룹 단일 필드 패치
    pub fn camera_field(name: &str, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(name.to_string(), value.into());
        Self {
            camera: Some(fields),
            motion: None,
        }
    }

    /// `motion` 그룹 단일 필드 패치
    pub fn motion_field(name: &str, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(name.to_string(), value.into());
        Self {
            camera: None,
            motion: Some(fields),
        }
    }

    /// 두 그룹 모두 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.camera.as_ref().map_or(true, Map::is_empty)
            && self.motion.as_ref().map_or(true, Map::is_empty)
    }
}

/// 현재 그룹 값 위에 패치 필드를 덮어쓴 뒤 다시 역직렬화
fn merge_group<T>(current: &T, fields: &Map<String, Value>, group: &str) -> Result<T, CoreError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(current)?;
    if let Value::Object(obj) = &mut value {
        for (key, incoming) in fields {
            if !obj.contains_key(key) {
                debug!("알 수 없는 설정 필드 무시: {group}.{key}");
                continue;
            }
            let incoming = match incoming {
                Value::Bool(b) => Value::from(i32::from(*b)),
                other => other.clone(),
            };
            obj.insert(key.clone(), incoming);
        }
    }
    serde_json::from_value(value)
        .map_err(|e| CoreError::validation(group, format!("설정 값 형식 오류: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> SettingsPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = CameraSettings::default();
        assert_eq!(s.camera.resolution, Resolution::Uxga);
        assert_eq!(s.camera.quality, 12);
        assert_eq!(s.camera.aec_value, 300);
        assert_eq!(s.camera.wpc, 1);
        assert_eq!(s.motion.min_area, 4000);
        assert_eq!(s.motion.blur_size, 31);
    }

    #[test]
    fn wire_names_are_preserved() {
        let value = serde_json::to_value(CameraSettings::default()).unwrap();
        assert_eq!(value["camera"]["resolution"], "UXGA");
        assert_eq!(value["camera"]["special_effect"], 0);
        assert_eq!(value["motion"]["minArea"], 4000);
        assert_eq!(value["motion"]["blurSize"], 31);
    }

    #[test]
    fn apply_merges_without_removing_fields() {
        let mut s = CameraSettings::default();
        s.apply(&patch(json!({"camera": {"quality": 20}, "motion": {"threshold": 40}})))
            .unwrap();

        assert_eq!(s.camera.quality, 20);
        assert_eq!(s.camera.aec_value, 300);
        assert_eq!(s.motion.threshold, 40);
        assert_eq!(s.motion.min_area, 4000);
    }

    #[test]
    fn apply_is_idempotent() {
        let p = patch(json!({"camera": {"brightness": -2, "resolution": "VGA"}, "motion": {"dilation": 5}}));
        let mut once = CameraSettings::default();
        once.apply(&p).unwrap();
        let mut twice = once.clone();
        twice.apply(&p).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_preserves_explicit_zero() {
        let mut s = CameraSettings::default();
        s.apply(&patch(json!({"camera": {"aec_value": 0, "wpc": 0}}))).unwrap();
        assert_eq!(s.camera.aec_value, 0);
        assert_eq!(s.camera.wpc, 0);
    }

    #[test]
    fn apply_rejects_wrong_types_atomically() {
        let mut s = CameraSettings::default();
        let result = s.apply(&patch(json!({"camera": {"quality": 30, "resolution": "NOPE"}})));
        assert!(matches!(result, Err(CoreError::Validation { .. })));
        assert_eq!(s, CameraSettings::default());
    }

    #[test]
    fn apply_normalizes_ranges() {
        let mut s = CameraSettings::default();
        s.apply(&patch(json!({
            "camera": {"quality": 99, "hmirror": 5, "vflip": true},
            "motion": {"blurSize": 30}
        })))
        .unwrap();
        assert_eq!(s.camera.quality, MAX_QUALITY);
        assert_eq!(s.camera.hmirror, 1);
        assert_eq!(s.camera.vflip, 1);
        assert_eq!(s.motion.blur_size, 31);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut s = CameraSettings::default();
        s.apply(&patch(json!({"camera": {"zoom": 3}}))).unwrap();
        assert_eq!(s, CameraSettings::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: CameraSettings =
            serde_json::from_value(json!({"camera": {"quality": 0}, "motion": {}})).unwrap();
        assert_eq!(s.camera.quality, 0);
        assert_eq!(s.camera.aec_value, 300);
        assert_eq!(s.motion.threshold, 25);
    }

    #[test]
    fn resolution_parse() {
        assert_eq!("svga".parse::<Resolution>().unwrap(), Resolution::Svga);
        assert_eq!(Resolution::Qqvga.to_string(), "QQVGA");
        assert!("8K".parse::<Resolution>().is_err());
    }

    #[test]
    fn patch_helpers() {
        assert!(SettingsPatch::default().is_empty());
        let p = SettingsPatch::motion_field("minArea", 100);
        assert!(!p.is_empty());
        assert!(p.camera.is_none());
        assert!(CameraParams::has_field("gainceiling"));
        assert!(!CameraParams::has_field("minArea"));
        assert!(MotionParams::has_field("minArea"));
    }
}
