//! 터미널 대시보드.
//!
//! 세션이 보고하는 상태 변화를 줄 단위로 출력하고, 콘솔 `cameras`/`status`
//! 명령을 위해 마지막 상태를 보관한다.

use camdeck_core::models::connection::{ConnectionStatus, StreamState};
use camdeck_core::models::directory::{BadgeLevel, CameraDirectory, StatusBadge};
use camdeck_core::models::settings::CameraSettings;
use camdeck_core::ports::view::DashboardView;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::io::{self, Write};
use tracing::{debug, warn};

/// 마지막으로 보고된 상태
#[derive(Debug, Default)]
struct Snapshot {
    status: Option<ConnectionStatus>,
    stream: Option<StreamState>,
    directory: CameraDirectory,
    selected: Option<String>,
    badge: Option<StatusBadge>,
    fps: f64,
}

/// 터미널 출력 뷰
pub struct TerminalView<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
    snapshot: Mutex<Snapshot>,
}

impl TerminalView<io::Stdout> {
    /// 표준 출력 뷰
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl<W: Write + Send> TerminalView<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    /// 카메라 목록 (`cameras` 명령)
    pub fn render_cameras(&self) -> String {
        let snapshot = self.snapshot.lock();
        if !snapshot.directory.is_available() {
            return "사용 가능한 카메라 없음".to_string();
        }

        let mut text = String::new();
        for entry in snapshot.directory.iter() {
            let marker = if snapshot.selected.as_deref() == Some(entry.id.as_str()) {
                '*'
            } else {
                ' '
            };
            let state = if entry.connected { "connected" } else { "disconnected" };
            let _ = write!(text, "{marker} {} ({}) {state}", entry.id, entry.name);
            if let Some(fps) = entry.fps {
                let _ = write!(text, " {fps:.1}fps");
            }
            text.push('\n');
        }
        let _ = write!(text, "web clients: {}", snapshot.directory.web_clients());
        text
    }

    /// 상태 요약 (`status` 명령)
    pub fn render_status(&self) -> String {
        let snapshot = self.snapshot.lock();
        let status = snapshot
            .status
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let stream = match snapshot.stream {
            Some(StreamState::Streaming) => "streaming",
            _ => "loading",
        };
        let badge = snapshot.badge.as_ref().map_or("-", |b| b.text.as_str());
        format!(
            "연결: {status} | 선택: {} | 스트림: {stream} ({:.1}fps) | {badge}",
            snapshot.selected.as_deref().unwrap_or("-"),
            snapshot.fps,
        )
    }

    /// 임의 메시지 출력 (콘솔 응답)
    pub fn print(&self, line: &str) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!("터미널 출력 실패: {e}");
        }
    }
}

impl TerminalView<Vec<u8>> {
    /// 지금까지 출력된 내용
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.out.lock()).into_owned()
    }
}

fn badge_prefix(level: BadgeLevel) -> &'static str {
    match level {
        BadgeLevel::Success => "[ok]",
        BadgeLevel::Warning => "[warn]",
        BadgeLevel::Danger => "[!!]",
    }
}

impl<W: Write + Send> DashboardView for TerminalView<W> {
    fn connection_status(&self, status: ConnectionStatus) {
        self.snapshot.lock().status = Some(status);
        self.print(&format!("● {status}"));
    }

    fn form_error(&self, message: &str) {
        self.print(&format!("✖ {message}"));
    }

    fn stream_state(&self, state: StreamState) {
        let previous = self.snapshot.lock().stream.replace(state);
        if previous == Some(state) {
            return;
        }
        match state {
            StreamState::Loading => self.print("스트림: 로딩 중..."),
            StreamState::Streaming => self.print("스트림: 수신 중"),
        }
    }

    fn directory(&self, directory: &CameraDirectory, selected: Option<&str>, badge: &StatusBadge) {
        let changed = {
            let mut snapshot = self.snapshot.lock();
            let changed = snapshot.badge.as_ref() != Some(badge);
            snapshot.directory = directory.clone();
            snapshot.selected = selected.map(str::to_string);
            snapshot.badge = Some(badge.clone());
            changed
        };
        if changed {
            self.print(&format!("{} {}", badge_prefix(badge.level), badge.text));
        }
    }

    fn selection(&self, selected: Option<&str>, name_editable: bool) {
        self.snapshot.lock().selected = selected.map(str::to_string);
        match selected {
            Some(id) if name_editable => self.print(&format!("선택: {id}")),
            Some(id) => self.print(&format!("선택: {id} (오프라인)")),
            None => self.print("선택 해제"),
        }
    }

    fn settings(&self, camera_id: &str, settings: &CameraSettings) {
        let camera = &settings.camera;
        let motion = &settings.motion;
        self.print(&format!(
            "설정 [{camera_id}] {} q={} bright={} contrast={} sat={} hmirror={} vflip={} | motion minArea={} threshold={} blur={} dilation={}",
            camera.resolution,
            camera.quality,
            camera.brightness,
            camera.contrast,
            camera.saturation,
            camera.hmirror,
            camera.vflip,
            motion.min_area,
            motion.threshold,
            motion.blur_size,
            motion.dilation,
        ));
    }

    fn fps(&self, fps: f64) {
        self.snapshot.lock().fps = fps;
        debug!("표시 FPS: {fps:.1}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camdeck_core::models::directory::StatusPayload;
    use serde_json::json;

    fn directory() -> CameraDirectory {
        let payload: StatusPayload = serde_json::from_value(json!({
            "cameras": {
                "A": {"connected": true, "name": "Front", "fps": 9.5},
                "B": {"connected": false, "name": "Back"}
            },
            "web_clients": 2
        }))
        .unwrap();
        CameraDirectory::from_status(&payload)
    }

    #[test]
    fn badge_printed_only_on_change() {
        let view = TerminalView::with_writer(Vec::new());
        let dir = directory();
        let badge = StatusBadge::evaluate(&dir, Some("A"));

        view.directory(&dir, Some("A"), &badge);
        view.directory(&dir, Some("A"), &badge);

        let output = view.output();
        assert_eq!(output.matches("Cameras: 1/2 Connected").count(), 1);
        assert!(output.starts_with("[warn]"));
    }

    #[test]
    fn camera_listing_marks_selection() {
        let view = TerminalView::with_writer(Vec::new());
        assert_eq!(view.render_cameras(), "사용 가능한 카메라 없음");

        let dir = directory();
        view.directory(&dir, Some("B"), &StatusBadge::evaluate(&dir, Some("B")));
        let listing = view.render_cameras();

        assert!(listing.contains("  A (Front) connected 9.5fps"));
        assert!(listing.contains("* B (Back) disconnected"));
        assert!(listing.ends_with("web clients: 2"));
    }

    #[test]
    fn status_summary_tracks_latest_reports() {
        let view = TerminalView::with_writer(Vec::new());
        view.connection_status(ConnectionStatus::Reconnecting { attempt: 2 });
        view.stream_state(StreamState::Streaming);
        view.stream_state(StreamState::Streaming);
        view.fps(12.0);

        assert_eq!(
            view.render_status(),
            "연결: Reconnecting (#2) | 선택: - | 스트림: streaming (12.0fps) | -"
        );
        assert_eq!(view.output().matches("스트림: 수신 중").count(), 1);
    }
}
