//! 카메라 선택과 상태 표시.
//!
//! status push마다 디렉토리를 재구성하고 현재 선택을 조정한다.
//!
//! - 연결 수명(lifetime)마다 첫 status에서 한 번만 자동 선택
//! - 선택 카메라가 사라지거나 끊기면 유예 시간 후 선택 해제
//! - `cameras` 필드가 없는 status는 즉시 해제

use camdeck_core::error::CoreError;
use camdeck_core::models::directory::{CameraDirectory, StatusBadge, StatusPayload};
use std::time::Duration;
use tracing::{debug, info};

/// 유예 해제 타이머 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceTimer {
    pub camera_id: String,
    pub token: u64,
    pub delay: Duration,
}

/// status push 처리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOutcome {
    /// 자동 선택할 카메라 (이번 수명의 첫 선택)
    pub auto_select: Option<String>,
    /// 선택 카메라가 없거나 끊김 → 스트림을 로딩 상태로
    pub selection_lost: bool,
    /// 선택이 즉시 해제됨
    pub cleared: bool,
    /// 시작해야 할 유예 타이머
    pub grace_timer: Option<GraceTimer>,
}

/// 카메라 선택 상태
pub struct CameraSelection {
    directory: CameraDirectory,
    selected: Option<String>,
    /// 이번 연결 수명에서 자동/수동 선택이 있었는지
    initial_selection_done: bool,
    grace_period: Duration,
    /// 대기 중인 유예 타이머 (카메라 ID, 토큰)
    pending_grace: Option<(String, u64)>,
    next_token: u64,
}

impl CameraSelection {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            directory: CameraDirectory::disconnected(),
            selected: None,
            initial_selection_done: false,
            grace_period,
            pending_grace: None,
            next_token: 0,
        }
    }

    pub fn directory(&self) -> &CameraDirectory {
        &self.directory
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// 현재 상태 배지
    pub fn badge(&self) -> StatusBadge {
        StatusBadge::evaluate(&self.directory, self.selected())
    }

    /// 새 연결 수명 시작 (소켓 open마다)
    pub fn reset_lifetime(&mut self) {
        self.initial_selection_done = false;
    }

    /// 연결 끊김: 디렉토리 비움. 선택은 재연결 시 다시 보내기 위해 유지한다.
    pub fn connection_lost(&mut self) {
        self.directory = CameraDirectory::disconnected();
        self.pending_grace = None;
    }

    /// 사용자 선택
    pub fn select(&mut self, camera_id: &str) -> Result<(), CoreError> {
        let camera_id = camera_id.trim();
        if camera_id.is_empty() {
            return Err(CoreError::validation("camera_id", "카메라 ID가 비어 있음"));
        }

        if !self.directory.contains(camera_id) {
            debug!("디렉토리에 없는 카메라 선택: {camera_id}");
        }
        self.selected = Some(camera_id.to_string());
        self.initial_selection_done = true;
        self.pending_grace = None;
        info!("카메라 선택: {camera_id}");
        Ok(())
    }

    /// status push 반영
    pub fn apply_status(&mut self, payload: &StatusPayload) -> StatusOutcome {
        self.directory = CameraDirectory::from_status(payload);
        let mut outcome = StatusOutcome::default();

        if !self.directory.is_available() {
            self.pending_grace = None;
            if self.selected.take().is_some() {
                info!("사용 가능한 카메라 없음 - 선택 해제");
            }
            outcome.selection_lost = true;
            outcome.cleared = true;
            return outcome;
        }

        match self.selected.clone() {
            Some(id) if self.directory.is_connected(&id) => {
                if self.pending_grace.take().is_some() {
                    info!("선택 카메라 재연결: {id}");
                }
            }
            Some(id) => {
                outcome.selection_lost = true;
                if self.grace_period.is_zero() {
                    info!("선택 카메라 끊김 - 즉시 해제: {id}");
                    self.selected = None;
                    self.pending_grace = None;
                    outcome.cleared = true;
                } else if self
                    .pending_grace
                    .as_ref()
                    .map_or(true, |(pending, _)| *pending != id)
                {
                    info!(
                        "선택 카메라 끊김 - {}ms 후 해제 예정: {id}",
                        self.grace_period.as_millis()
                    );
                    self.next_token += 1;
                    self.pending_grace = Some((id.clone(), self.next_token));
                    outcome.grace_timer = Some(GraceTimer {
                        camera_id: id,
                        token: self.next_token,
                        delay: self.grace_period,
                    });
                }
            }
            None if !self.initial_selection_done => {
                outcome.auto_select = self.directory.first_connected().map(|e| e.id.clone());
                if let Some(id) = &outcome.auto_select {
                    debug!("자동 선택 후보: {id}");
                }
            }
            None => {}
        }

        outcome
    }

    /// 유예 타이머 만료
    ///
    /// 최신 디렉토리에서도 선택 카메라가 없거나 끊겨 있으면 해제하고 true.
    pub fn grace_expired(&mut self, camera_id: &str, token: u64) -> bool {
        match &self.pending_grace {
            Some((pending, pending_token)) if pending == camera_id && *pending_token == token => {}
            _ => return false,
        }
        self.pending_grace = None;

        if self.selected.as_deref() != Some(camera_id) || self.directory.is_connected(camera_id) {
            return false;
        }

        info!("유예 시간 경과 - 카메라 선택 해제: {camera_id}");
        self.selected = None;
        true
    }

    /// 이름 변경 반영. 항목이 없으면 false.
    pub fn rename(&mut self, camera_id: &str, name: &str) -> bool {
        self.directory.rename(camera_id, name)
    }
}
