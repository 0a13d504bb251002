//! 대시보드 표시 포트.
//!
//! 세션 컨트롤러가 상태 변화를 렌더링 표면에 알리는 인터페이스.
//! 구현: `camdeck-app` crate (터미널 출력)

use crate::models::connection::{ConnectionStatus, StreamState};
use crate::models::directory::{CameraDirectory, StatusBadge};
use crate::models::settings::CameraSettings;

/// 대시보드 렌더링 인터페이스
pub trait DashboardView: Send + Sync {
    /// 연결 상태 변경
    fn connection_status(&self, status: ConnectionStatus);

    /// 연결 폼 에러 (호스트/포트 입력 오류, 재시도 포기 등)
    fn form_error(&self, message: &str);

    /// 스트림 표시 상태 변경
    fn stream_state(&self, state: StreamState);

    /// 카메라 목록 및 상태 배지 갱신
    fn directory(&self, directory: &CameraDirectory, selected: Option<&str>, badge: &StatusBadge);

    /// 선택 카메라 변경 (`name_editable`: 이름 편집 가능 여부)
    fn selection(&self, selected: Option<&str>, name_editable: bool);

    /// 선택 카메라 설정 표시
    fn settings(&self, camera_id: &str, settings: &CameraSettings);

    /// 표시 FPS 갱신
    fn fps(&self, fps: f64);
}
