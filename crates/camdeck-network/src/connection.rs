//! 연결 관리자.
//!
//! 소켓 하나의 수명 주기를 소유하는 상태 머신.
//! `Disconnected → Connecting → Open → (Closing | 에러 | 타임아웃) → Disconnected (재시도)`
//!
//! 연결 시도마다 세대(generation) 번호를 붙인다. 시도 태스크와 재시도 타이머는
//! 자기 세대를 태그한 `ConnectionEvent`를 채널로 보내고, 관리자는 현재 세대가 아닌
//! 이벤트를 버린다. 새 연결/명시적 종료는 세대를 올려 이전 태스크를 무효화한다.

use camdeck_core::error::CoreError;
use camdeck_core::models::connection::{ConnectionPhase, ConnectionStatus};
use camdeck_core::models::message::OutboundMessage;
use camdeck_core::ports::transport::{SocketConnector, SocketMessage, SocketSink};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::connectivity::{ConnectivityTracker, RetryDecision, RetryPolicy};

/// 종료 프레임 전송 대기 상한
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// 메시지 한 건 전송 대기 상한 (기본값)
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// 검증된 서버 주소
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    url: Url,
}

impl Endpoint {
    /// 호스트/포트 입력 검증 후 `ws://host:port` 주소 생성
    pub fn parse(host: &str, port: &str) -> Result<Self, CoreError> {
        let host = host.trim();
        let port = port.trim();

        if host.is_empty() {
            return Err(CoreError::validation("host", "호스트를 입력하세요"));
        }
        if port.is_empty() {
            return Err(CoreError::validation("port", "포트를 입력하세요"));
        }

        let port: u16 = port
            .parse()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| CoreError::validation("port", format!("잘못된 포트: {port}")))?;

        let url = Url::parse(&format!("ws://{host}:{port}"))
            .map_err(|e| CoreError::validation("host", format!("잘못된 주소 ({host}): {e}")))?;
        if url.host_str().is_none() || url.path() != "/" {
            return Err(CoreError::validation(
                "host",
                format!("잘못된 주소: {host}"),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            url,
        })
    }

    /// 소켓 URL
    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 열린 소켓의 송신 측
#[derive(Clone)]
pub struct OpenedSocket(Arc<dyn SocketSink>);

impl fmt::Debug for OpenedSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpenedSocket")
    }
}

/// 시도 태스크/타이머가 관리자에게 보내는 이벤트
#[derive(Debug)]
pub struct ConnectionEvent {
    pub generation: u64,
    pub kind: ConnectionEventKind,
}

#[derive(Debug)]
pub enum ConnectionEventKind {
    /// 소켓 열림
    Opened(OpenedSocket),
    /// 열린 소켓에서 수신 (종료/에러 포함)
    Socket(SocketMessage),
    /// 연결 수립 실패
    ConnectFailed(String),
    /// 연결 타임아웃
    TimedOut,
    /// 열린 소켓으로의 전송 실패/타임아웃
    SendFailed(String),
    /// 재시도 대기 완료
    RetryDue,
}

/// 이벤트 처리 결과 (세션이 반응해야 하는 변화)
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionUpdate {
    /// 연결 열림 (초기 메시지 전송 시점)
    Opened,
    /// 텍스트 메시지 수신
    Text(String),
    /// 바이너리 프레임 수신
    Binary(Vec<u8>),
    /// 연결 끊김 또는 시도 실패
    Lost {
        reason: String,
        decision: RetryDecision,
    },
    /// 재연결 시도 시작
    Retrying { attempt: u32 },
}

/// 연결 관리자
///
/// 소켓 핸들을 단독 소유하며 동시에 살아 있는 연결은 최대 하나다.
pub struct ConnectionManager {
    connector: Arc<dyn SocketConnector>,
    events: mpsc::Sender<ConnectionEvent>,
    connect_timeout: Duration,
    send_timeout: Duration,
    tracker: ConnectivityTracker,
    endpoint: Option<Endpoint>,
    generation: u64,
    phase: ConnectionPhase,
    sink: Option<Arc<dyn SocketSink>>,
    attempt_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// 새 연결 관리자 생성
    ///
    /// `events`: 시도 태스크와 타이머가 이벤트를 보낼 채널. 수신 측은 세션 루프가
    /// 소유하고 받은 이벤트를 [`ConnectionManager::handle`]에 넘긴다.
    pub fn new(
        connector: Arc<dyn SocketConnector>,
        policy: RetryPolicy,
        connect_timeout: Duration,
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Self {
        Self {
            connector,
            events,
            connect_timeout,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            tracker: ConnectivityTracker::new(policy),
            endpoint: None,
            generation: 0,
            phase: ConnectionPhase::Disconnected,
            sink: None,
            attempt_task: None,
            retry_task: None,
        }
    }

    /// 전송 타임아웃 지정
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open && self.sink.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// 재연결 시도 횟수
    pub fn attempts(&self) -> u32 {
        self.tracker.attempts()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.tracker.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.tracker.subscribe()
    }

    /// 명시적 연결
    ///
    /// 입력 검증 실패 시 소켓을 열지 않고 `Validation` 에러를 반환한다.
    /// 이전 연결과 대기 중인 타임아웃/재시도는 모두 취소된다.
    pub async fn connect(&mut self, host: &str, port: &str) -> Result<(), CoreError> {
        let endpoint = Endpoint::parse(host, port)?;

        self.teardown().await;
        info!("서버 연결 요청: {endpoint}");
        self.endpoint = Some(endpoint);
        self.tracker.record_connecting();
        self.start_attempt();
        Ok(())
    }

    /// 명시적 연결 종료 (재시도 없음)
    pub async fn disconnect(&mut self) {
        self.generation += 1;
        self.teardown().await;
        self.tracker.record_idle();
        info!("서버 연결 종료");
    }

    /// 이벤트 처리
    ///
    /// 현재 세대가 아닌 이벤트는 무시한다.
    pub async fn handle(&mut self, event: ConnectionEvent) -> Option<ConnectionUpdate> {
        if event.generation != self.generation {
            debug!(
                "이전 세대 이벤트 무시: gen={} (현재 {})",
                event.generation, self.generation
            );
            if let ConnectionEventKind::Opened(OpenedSocket(sink)) = event.kind {
                tokio::spawn(async move {
                    let _ = sink.close().await;
                });
            }
            return None;
        }

        match event.kind {
            ConnectionEventKind::Opened(OpenedSocket(sink)) => {
                if self.phase != ConnectionPhase::Connecting {
                    return None;
                }
                self.phase = ConnectionPhase::Open;
                self.sink = Some(sink);
                self.tracker.record_open();
                info!(
                    "서버 연결됨: {}",
                    self.endpoint.as_ref().map(|e| e.url()).unwrap_or_default()
                );
                Some(ConnectionUpdate::Opened)
            }
            ConnectionEventKind::Socket(SocketMessage::Text(text)) if self.is_open() => {
                Some(ConnectionUpdate::Text(text))
            }
            ConnectionEventKind::Socket(SocketMessage::Binary(data)) if self.is_open() => {
                Some(ConnectionUpdate::Binary(data))
            }
            ConnectionEventKind::Socket(SocketMessage::Text(_))
            | ConnectionEventKind::Socket(SocketMessage::Binary(_)) => None,
            ConnectionEventKind::Socket(SocketMessage::Closed { code, reason }) => {
                self.on_lost(format!("연결 종료 (code={code:?}, reason={reason})"))
            }
            ConnectionEventKind::Socket(SocketMessage::Error(e)) => {
                self.on_lost(format!("소켓 에러: {e}"))
            }
            ConnectionEventKind::ConnectFailed(e) => self.on_lost(e),
            ConnectionEventKind::SendFailed(e) => self.on_lost(format!("전송 실패: {e}")),
            ConnectionEventKind::TimedOut => self.on_lost(format!(
                "연결 타임아웃: {}ms 초과",
                self.connect_timeout.as_millis()
            )),
            ConnectionEventKind::RetryDue => {
                self.retry_task = None;
                if self.phase != ConnectionPhase::Disconnected || self.endpoint.is_none() {
                    return None;
                }
                let attempt = self.tracker.attempts();
                info!("재연결 시도 #{attempt}");
                self.tracker.record_reconnecting();
                self.start_attempt();
                Some(ConnectionUpdate::Retrying { attempt })
            }
        }
    }

    /// 메시지 전송
    ///
    /// 소켓이 열려 있지 않거나 카메라 대상 메시지의 ID가 비어 있으면 거부한다.
    /// 전송은 `send_timeout` 안에 끝나야 한다. 실패하거나 시간을 넘기면 소켓을 더 쓰지
    /// 않고, 같은 세대의 `SendFailed` 이벤트를 보내 재시도 경로로 넘긴다.
    pub async fn send(&mut self, message: &OutboundMessage) -> Result<(), CoreError> {
        let sink = match (&self.sink, self.phase) {
            (Some(sink), ConnectionPhase::Open) => sink.clone(),
            _ => return Err(CoreError::NotConnected),
        };

        let target = message.target_camera();
        let missing_target = match target {
            Some(id) => id.is_empty(),
            None => message.requires_camera(),
        };
        if missing_target {
            return Err(CoreError::NoCameraSelected);
        }

        let text = message.to_text()?;
        let result = match tokio::time::timeout(self.send_timeout, sink.send_text(&text)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: self.send_timeout.as_millis() as u64,
            }),
        };
        if let Err(e) = result {
            self.on_send_failed(&e);
            return Err(e);
        }
        debug!("메시지 전송: {} (camera={:?})", message.kind(), target);
        Ok(())
    }

    /// 전송 실패: 이후 전송은 `NotConnected`, 손실 처리는 이벤트 루프에서
    fn on_send_failed(&mut self, error: &CoreError) {
        warn!("소켓 전송 실패: {error}");
        self.sink = None;
        let event = ConnectionEvent {
            generation: self.generation,
            kind: ConnectionEventKind::SendFailed(error.to_string()),
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            let _ = events.send(event).await;
        });
    }

    /// 새 세대로 연결 시도 태스크 시작
    fn start_attempt(&mut self) {
        let Some(endpoint) = self.endpoint.as_ref() else {
            return;
        };

        self.generation += 1;
        self.phase = ConnectionPhase::Connecting;

        let task = tokio::spawn(run_attempt(
            self.connector.clone(),
            endpoint.url().to_string(),
            self.generation,
            self.connect_timeout,
            self.events.clone(),
        ));
        self.attempt_task = Some(task);
    }

    /// 연결 손실 처리 후 재시도 예약
    fn on_lost(&mut self, reason: String) -> Option<ConnectionUpdate> {
        if !matches!(
            self.phase,
            ConnectionPhase::Connecting | ConnectionPhase::Open
        ) {
            return None;
        }

        warn!("서버 연결 끊김: {reason}");
        self.sink = None;
        if let Some(task) = self.attempt_task.take() {
            task.abort();
        }
        self.phase = ConnectionPhase::Disconnected;

        let decision = self.tracker.record_failure();
        if let RetryDecision::Retry { delay, .. } = decision {
            self.schedule_retry(delay);
        }

        Some(ConnectionUpdate::Lost { reason, decision })
    }

    fn schedule_retry(&mut self, delay: Duration) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }

        let generation = self.generation;
        let events = self.events.clone();
        self.retry_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events
                .send(ConnectionEvent {
                    generation,
                    kind: ConnectionEventKind::RetryDue,
                })
                .await;
        }));
    }

    /// 대기 중인 태스크 취소 및 기존 소켓 종료
    async fn teardown(&mut self) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
        if let Some(task) = self.attempt_task.take() {
            task.abort();
        }

        if let Some(sink) = self.sink.take() {
            self.phase = ConnectionPhase::Closing;
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
                Ok(Ok(())) => debug!("기존 소켓 종료"),
                Ok(Err(e)) => debug!("기존 소켓 종료 실패: {e}"),
                Err(_) => debug!("기존 소켓 종료 타임아웃"),
            }
        }
        self.phase = ConnectionPhase::Disconnected;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
        if let Some(task) = self.attempt_task.take() {
            task.abort();
        }
    }
}

/// 한 세대의 연결 시도 + 수신 전달 루프
async fn run_attempt(
    connector: Arc<dyn SocketConnector>,
    url: String,
    generation: u64,
    connect_timeout: Duration,
    events: mpsc::Sender<ConnectionEvent>,
) {
    let emit = |kind| ConnectionEvent { generation, kind };

    let (sink, mut inbound) =
        match tokio::time::timeout(connect_timeout, connector.connect(&url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                let _ = events
                    .send(emit(ConnectionEventKind::ConnectFailed(e.to_string())))
                    .await;
                return;
            }
            Err(_) => {
                let _ = events.send(emit(ConnectionEventKind::TimedOut)).await;
                return;
            }
        };

    let opened = ConnectionEventKind::Opened(OpenedSocket(Arc::from(sink)));
    if events.send(emit(opened)).await.is_err() {
        return;
    }

    while let Some(message) = inbound.recv().await {
        let terminal = matches!(
            message,
            SocketMessage::Closed { .. } | SocketMessage::Error(_)
        );
        if events
            .send(emit(ConnectionEventKind::Socket(message)))
            .await
            .is_err()
            || terminal
        {
            return;
        }
    }

    let _ = events
        .send(emit(ConnectionEventKind::Socket(SocketMessage::Closed {
            code: None,
            reason: "stream ended".to_string(),
        })))
        .await;
}
