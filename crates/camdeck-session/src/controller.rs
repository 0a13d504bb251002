//! 세션 컨트롤러.
//!
//! 하나의 태스크가 세 채널을 순서대로 처리한다.
//! - 연결 이벤트 (`ConnectionManager`의 시도 태스크/재시도 타이머)
//! - 사용자 명령 (`SessionHandle`)
//! - 내부 타이머 (선택 해제 유예)
//!
//! 소켓, 카메라 디렉토리/선택, 설정 저장소, 프레임 표시 상태는 모두 이 태스크가 소유한다.

use camdeck_core::config::AppConfig;
use camdeck_core::error::CoreError;
use camdeck_core::models::command::CommandToken;
use camdeck_core::models::connection::{ConnectionStatus, StreamState};
use camdeck_core::models::message::{InboundMessage, OutboundMessage};
use camdeck_core::models::settings::SettingsPatch;
use camdeck_core::ports::frame_surface::FrameSurface;
use camdeck_core::ports::kv_store::KeyValueStore;
use camdeck_core::ports::transport::SocketConnector;
use camdeck_core::ports::view::DashboardView;
use camdeck_network::connection::{ConnectionEvent, ConnectionManager, ConnectionUpdate};
use camdeck_network::connectivity::{RetryDecision, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::frame::FrameDisplay;
use crate::input::{GamepadButton, Key, KeyPhase};
use crate::router;
use crate::selection::{CameraSelection, GraceTimer, StatusOutcome};
use crate::settings_store::SettingsStore;

/// 채널 버퍼 크기
const CHANNEL_CAPACITY: usize = 64;

/// 사용자 명령
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// 서버 연결 (호스트/포트 폼 제출)
    Connect { host: String, port: String },
    /// 서버 연결 종료
    Disconnect,
    /// 카메라 선택
    SelectCamera(String),
    /// 선택 카메라 설정 요청
    RequestSettings,
    /// 선택 카메라 설정 로컬 편집 (저장만, 전송 안 함)
    EditSettings(SettingsPatch),
    /// 선택 카메라 설정 저장 후 서버로 전송
    ApplySettings,
    /// 모터/버튼/LED 명령
    Command(CommandToken),
    /// 키 입력
    Key { key: Key, phase: KeyPhase },
    /// 게임패드 버튼 입력
    Gamepad {
        button: GamepadButton,
        phase: KeyPhase,
    },
    /// 선택 카메라 이름 변경
    RenameCamera(String),
    /// 세션 종료
    Shutdown,
}

/// 내부 타이머 이벤트
#[derive(Debug)]
enum TimerEvent {
    GraceExpired { camera_id: String, token: u64 },
}

/// 세션 동작 설정
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub connect_timeout: Duration,
    /// 메시지 한 건 전송 상한 (넘기면 연결 손실로 처리)
    pub send_timeout: Duration,
    pub retry: RetryPolicy,
    pub grace_period: Duration,
    pub request_settings_on_select: bool,
    pub settings_key: String,
    /// 시작 시 자동 연결할 주소
    pub initial_endpoint: Option<(String, String)>,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            send_timeout: config.send_timeout(),
            retry: RetryPolicy {
                delay: config.retry_delay(),
                max_attempts: config.server.max_reconnect_attempts,
            },
            grace_period: config.grace_period(),
            request_settings_on_select: config.selection.request_settings_on_select,
            settings_key: config.storage.settings_key.clone(),
            initial_endpoint: config
                .server
                .auto_connect
                .then(|| (config.server.host.clone(), config.server.port.clone())),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default_config())
    }
}

/// 세션 외부 인터페이스 (복제 가능)
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<UserCommand>,
}

impl SessionHandle {
    /// 명령 전달
    pub async fn send(&self, command: UserCommand) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::Internal("세션이 종료됨".to_string()))
    }

    /// 세션 종료 요청
    pub async fn shutdown(&self) {
        let _ = self.commands.send(UserCommand::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// 세션
pub struct Session {
    state: SessionState,
    connection_events: mpsc::Receiver<ConnectionEvent>,
    commands: mpsc::Receiver<UserCommand>,
    timers: mpsc::Receiver<TimerEvent>,
    initial_endpoint: Option<(String, String)>,
}

/// 세션 태스크가 소유하는 상태
struct SessionState {
    connection: ConnectionManager,
    store: SettingsStore,
    selection: CameraSelection,
    frames: FrameDisplay,
    view: Arc<dyn DashboardView>,
    timer_tx: mpsc::Sender<TimerEvent>,
    grace_task: Option<JoinHandle<()>>,
    request_settings_on_select: bool,
    reported_status: Option<ConnectionStatus>,
}

impl Session {
    /// 새 세션 생성
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        kv: Arc<dyn KeyValueStore>,
        view: Arc<dyn DashboardView>,
        surface: Arc<dyn FrameSurface>,
        options: SessionOptions,
    ) -> (Self, SessionHandle) {
        let (event_tx, connection_events) = mpsc::channel(CHANNEL_CAPACITY);
        let (command_tx, commands) = mpsc::channel(CHANNEL_CAPACITY);
        let (timer_tx, timers) = mpsc::channel(CHANNEL_CAPACITY);

        let connection =
            ConnectionManager::new(connector, options.retry, options.connect_timeout, event_tx)
                .with_send_timeout(options.send_timeout);

        let state = SessionState {
            connection,
            store: SettingsStore::new(kv, options.settings_key),
            selection: CameraSelection::new(options.grace_period),
            frames: FrameDisplay::new(surface),
            view,
            timer_tx,
            grace_task: None,
            request_settings_on_select: options.request_settings_on_select,
            reported_status: None,
        };

        (
            Self {
                state,
                connection_events,
                commands,
                timers,
                initial_endpoint: options.initial_endpoint,
            },
            SessionHandle {
                commands: command_tx,
            },
        )
    }

    /// 세션 루프 실행 (종료 신호 또는 `Shutdown` 명령까지)
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), CoreError> {
        let Session {
            mut state,
            mut connection_events,
            mut commands,
            mut timers,
            initial_endpoint,
        } = self;

        state.store.load().await;
        state.view.stream_state(StreamState::Loading);
        state.refresh_directory();

        if let Some((host, port)) = initial_endpoint {
            info!("자동 연결: {host}:{port}");
            state.connect(&host, &port).await;
        } else {
            state.sync_status();
        }

        info!("세션 시작");
        loop {
            tokio::select! {
                Some(event) = connection_events.recv() => {
                    state.on_connection_event(event).await;
                }
                command = commands.recv() => match command {
                    Some(UserCommand::Shutdown) | None => break,
                    Some(command) => state.on_command(command).await,
                },
                Some(timer) = timers.recv() => {
                    state.on_timer(timer);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        state.close().await;
        info!("세션 종료");
        Ok(())
    }
}

impl SessionState {
    // ── 연결 ──

    async fn connect(&mut self, host: &str, port: &str) {
        match self.connection.connect(host, port).await {
            Ok(()) => {
                self.on_stream_lost();
                self.selection.connection_lost();
                self.cancel_grace();
                self.refresh_directory();
            }
            Err(e) => {
                warn!("연결 요청 거부: {e}");
                self.view.form_error(&e.to_string());
            }
        }
        self.sync_status();
    }

    async fn disconnect(&mut self) {
        self.connection.disconnect().await;
        self.on_stream_lost();
        self.selection.connection_lost();
        self.cancel_grace();
        self.refresh_directory();
        self.sync_status();
    }

    async fn on_connection_event(&mut self, event: ConnectionEvent) {
        let Some(update) = self.connection.handle(event).await else {
            return;
        };

        match update {
            ConnectionUpdate::Opened => self.on_opened().await,
            ConnectionUpdate::Text(text) => self.on_text(&text).await,
            ConnectionUpdate::Binary(data) => self.on_frame(&data),
            ConnectionUpdate::Lost { reason, decision } => {
                debug!("연결 손실 처리: {reason}");
                self.on_stream_lost();
                self.selection.connection_lost();
                self.cancel_grace();
                self.refresh_directory();
                self.sync_status();
                if let RetryDecision::GiveUp { attempts } = decision {
                    self.view
                        .form_error(&format!("서버에 연결할 수 없습니다 ({attempts}회 재시도 실패)"));
                }
            }
            ConnectionUpdate::Retrying { attempt } => {
                debug!("재연결 시도 #{attempt}");
            }
        }
        self.sync_status();
    }

    /// 소켓 open: init → 선택 카메라 → 그 카메라 설정 순으로 전송
    async fn on_opened(&mut self) {
        self.selection.reset_lifetime();
        self.sync_status();

        self.send_logged(&OutboundMessage::Init).await;

        if let Some(camera_id) = self.selection.selected().map(str::to_string) {
            self.send_logged(&OutboundMessage::SelectCamera {
                camera_id: camera_id.clone(),
            })
            .await;
            let settings = self.store.entry(&camera_id).clone();
            self.send_logged(&OutboundMessage::Settings {
                camera_id: Some(camera_id.clone()),
                settings,
            })
            .await;
            self.view.selection(Some(&camera_id), true);
        }
    }

    // ── 수신 ──

    async fn on_text(&mut self, text: &str) {
        let Some(message) = router::route_text(text) else {
            return;
        };

        match message {
            InboundMessage::Status(payload) => {
                let outcome = self.selection.apply_status(&payload);
                self.on_status(outcome).await;
            }
            InboundMessage::Settings { camera_id, patch } => {
                let Some(target) =
                    router::settings_target(camera_id.as_deref(), self.selection.selected())
                else {
                    warn!("대상 카메라 없는 설정 push 무시");
                    return;
                };
                self.apply_settings(&target, &patch).await;
            }
            InboundMessage::NameUpdated {
                camera_id,
                camera_name,
            } => {
                if self.selection.rename(&camera_id, &camera_name) {
                    info!("카메라 이름 변경됨: {camera_id} → {camera_name}");
                    self.refresh_directory();
                } else {
                    debug!("디렉토리에 없는 카메라 이름 변경: {camera_id}");
                }
            }
            InboundMessage::Unrecognized { .. } => {}
        }
    }

    async fn on_status(&mut self, outcome: StatusOutcome) {
        if outcome.selection_lost {
            self.on_stream_lost();
        }
        if outcome.cleared {
            self.cancel_grace();
            self.view.selection(None, false);
        }
        if let Some(timer) = outcome.grace_timer {
            self.start_grace(timer);
        }

        match outcome.auto_select {
            Some(camera_id) => {
                info!("카메라 자동 선택: {camera_id}");
                if let Err(e) = self.select_camera(&camera_id).await {
                    warn!("자동 선택 실패: {e}");
                }
            }
            None => self.refresh_directory(),
        }
    }

    fn on_frame(&mut self, data: &[u8]) {
        let outcome = self.frames.on_frame(data, Instant::now());
        if outcome.started {
            info!("스트림 시작");
            self.view.stream_state(StreamState::Streaming);
        }
        if let Some(fps) = outcome.fps {
            self.view.fps(fps);
        }
    }

    fn on_stream_lost(&mut self) {
        if self.frames.reset() {
            self.view.stream_state(StreamState::Loading);
        }
    }

    // ── 사용자 명령 ──

    async fn on_command(&mut self, command: UserCommand) {
        debug!("사용자 명령: {command:?}");
        let result = match command {
            UserCommand::Connect { host, port } => {
                self.connect(&host, &port).await;
                Ok(())
            }
            UserCommand::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
            UserCommand::SelectCamera(camera_id) => self.select_camera(&camera_id).await,
            UserCommand::RequestSettings => self.request_settings().await,
            UserCommand::EditSettings(patch) => self.edit_settings(&patch).await,
            UserCommand::ApplySettings => self.push_settings().await,
            UserCommand::Command(token) => self.send_command(token).await,
            UserCommand::Key { key, phase } => self.send_command(key.command(phase)).await,
            UserCommand::Gamepad { button, phase } => {
                self.send_command(button.command(phase)).await
            }
            UserCommand::RenameCamera(name) => self.rename_camera(&name).await,
            UserCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            if e.is_precondition() {
                warn!("명령 건너뜀: {e}");
            } else {
                warn!("명령 실패: {e}");
            }
        }
    }

    /// 카메라 선택
    ///
    /// 로컬 선택(설정 레코드 생성) → `select_camera` 전송 → 설정 요청 → 표시 갱신
    async fn select_camera(&mut self, camera_id: &str) -> Result<(), CoreError> {
        self.selection.select(camera_id)?;
        self.cancel_grace();
        let camera_id = camera_id.trim().to_string();
        self.store.entry(&camera_id);

        let open = self.connection.is_open();
        if open {
            self.send_logged(&OutboundMessage::SelectCamera {
                camera_id: camera_id.clone(),
            })
            .await;
            if self.request_settings_on_select {
                self.send_logged(&OutboundMessage::GetSettings {
                    camera_id: camera_id.clone(),
                })
                .await;
            }
        } else {
            debug!("소켓 미연결 - 선택은 연결 시 전송: {camera_id}");
        }

        self.view.selection(Some(&camera_id), open);
        if let Some(settings) = self.store.get(&camera_id) {
            self.view.settings(&camera_id, settings);
        }
        self.refresh_directory();
        Ok(())
    }

    async fn request_settings(&mut self) -> Result<(), CoreError> {
        let camera_id = self.require_selection()?;
        self.connection
            .send(&OutboundMessage::GetSettings { camera_id })
            .await
    }

    async fn edit_settings(&mut self, patch: &SettingsPatch) -> Result<(), CoreError> {
        let camera_id = self.require_selection()?;
        self.apply_settings(&camera_id, patch).await;
        Ok(())
    }

    async fn push_settings(&mut self) -> Result<(), CoreError> {
        let camera_id = self.require_selection()?;
        self.store.save().await;
        let settings = self.store.entry(&camera_id).clone();
        self.connection
            .send(&OutboundMessage::Settings {
                camera_id: Some(camera_id),
                settings,
            })
            .await
    }

    async fn send_command(&mut self, token: CommandToken) -> Result<(), CoreError> {
        if !self.connection.is_open() {
            return Err(CoreError::NotConnected);
        }
        let camera_id = self.require_selection()?;
        self.connection
            .send(&OutboundMessage::Command { camera_id, token })
            .await
    }

    async fn rename_camera(&mut self, name: &str) -> Result<(), CoreError> {
        if !self.connection.is_open() {
            return Err(CoreError::NotConnected);
        }
        let camera_id = self.require_selection()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("camera_name", "이름이 비어 있음"));
        }
        let current = self
            .selection
            .directory()
            .get(&camera_id)
            .map(|entry| entry.name.as_str());
        if current == Some(name) {
            debug!("이름 변경 없음: {camera_id}");
            return Ok(());
        }

        self.connection
            .send(&OutboundMessage::UpdateName {
                camera_id,
                camera_name: name.to_string(),
            })
            .await
    }

    // ── 설정 ──

    /// 설정 병합 → 저장 → 선택 카메라면 표시 갱신
    async fn apply_settings(&mut self, camera_id: &str, patch: &SettingsPatch) {
        if let Err(e) = self.store.apply(camera_id, patch) {
            warn!("설정 병합 실패 ({camera_id}): {e}");
            return;
        }
        self.store.save().await;

        if self.selection.selected() == Some(camera_id) {
            if let Some(settings) = self.store.get(camera_id) {
                self.view.settings(camera_id, settings);
            }
        }
    }

    // ── 타이머 ──

    fn start_grace(&mut self, timer: GraceTimer) {
        self.cancel_grace();
        let timer_tx = self.timer_tx.clone();
        self.grace_task = Some(tokio::spawn(async move {
            tokio::time::sleep(timer.delay).await;
            let _ = timer_tx
                .send(TimerEvent::GraceExpired {
                    camera_id: timer.camera_id,
                    token: timer.token,
                })
                .await;
        }));
    }

    fn cancel_grace(&mut self) {
        if let Some(task) = self.grace_task.take() {
            task.abort();
        }
    }

    fn on_timer(&mut self, timer: TimerEvent) {
        match timer {
            TimerEvent::GraceExpired { camera_id, token } => {
                self.grace_task = None;
                if self.selection.grace_expired(&camera_id, token) {
                    self.view.selection(None, false);
                    self.refresh_directory();
                }
            }
        }
    }

    // ── 공통 ──

    fn require_selection(&self) -> Result<String, CoreError> {
        self.selection
            .selected()
            .map(str::to_string)
            .ok_or(CoreError::NoCameraSelected)
    }

    async fn send_logged(&mut self, message: &OutboundMessage) {
        if let Err(e) = self.connection.send(message).await {
            warn!("{} 전송 실패: {e}", message.kind());
        }
    }

    fn refresh_directory(&self) {
        let badge = self.selection.badge();
        self.view
            .directory(self.selection.directory(), self.selection.selected(), &badge);
    }

    /// 연결 상태가 바뀌었으면 표시
    fn sync_status(&mut self) {
        let status = self.connection.status();
        if self.reported_status != Some(status) {
            info!("연결 상태: {status}");
            self.reported_status = Some(status);
            self.view.connection_status(status);
        }
    }

    async fn close(&mut self) {
        self.cancel_grace();
        self.connection.disconnect().await;
        self.frames.reset();
        self.store.save().await;
    }
}
