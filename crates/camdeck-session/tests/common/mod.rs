//! 세션 테스트용 목(mock) 어댑터.

#![allow(dead_code)]

use async_trait::async_trait;
use camdeck_core::error::CoreError;
use camdeck_core::models::connection::{ConnectionStatus, StreamState};
use camdeck_core::models::directory::{CameraDirectory, StatusBadge};
use camdeck_core::models::settings::CameraSettings;
use camdeck_core::ports::frame_surface::{FrameHandle, FrameSurface};
use camdeck_core::ports::kv_store::KeyValueStore;
use camdeck_core::ports::transport::{SocketConnector, SocketMessage, SocketSink};
use camdeck_core::ports::view::DashboardView;
use camdeck_session::controller::{Session, SessionHandle, SessionOptions};
use camdeck_storage::memory::MemoryKvStore;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

// ── 소켓 ──

pub enum Behavior {
    Accept,
    Refuse,
}

#[derive(Default)]
pub struct SinkLog {
    pub sent: Mutex<Vec<String>>,
    pub closed: Mutex<bool>,
    /// true면 이후 전송이 끝나지 않음 (멈춘 피어)
    pub stalled: Mutex<bool>,
}

struct MockSink(Arc<SinkLog>);

#[async_trait]
impl SocketSink for MockSink {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        if *self.0.stalled.lock() {
            return std::future::pending().await;
        }
        self.0.sent.lock().push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        *self.0.closed.lock() = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Behavior>>,
    urls: Mutex<Vec<String>>,
    sinks: Mutex<Vec<Arc<SinkLog>>>,
    servers: Mutex<Vec<mpsc::Sender<SocketMessage>>>,
}

impl MockConnector {
    pub fn scripted(script: Vec<Behavior>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    pub fn sink(&self, index: usize) -> Arc<SinkLog> {
        self.sinks.lock()[index].clone()
    }

    /// `index`번째 연결로 보낸 메시지 (JSON)
    pub fn sent(&self, index: usize) -> Vec<Value> {
        self.sink(index)
            .sent
            .lock()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// `index`번째 연결의 서버 측에서 메시지 push
    pub async fn push(&self, index: usize, message: SocketMessage) {
        let server = self.servers.lock()[index].clone();
        server.send(message).await.unwrap();
    }

    pub async fn push_json(&self, index: usize, value: Value) {
        self.push(index, SocketMessage::Text(value.to_string())).await;
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, mpsc::Receiver<SocketMessage>), CoreError> {
        self.urls.lock().push(url.to_string());
        let behavior = self.script.lock().pop_front().unwrap_or(Behavior::Refuse);
        match behavior {
            Behavior::Accept => {
                let log = Arc::new(SinkLog::default());
                let (tx, rx) = mpsc::channel(16);
                self.sinks.lock().push(log.clone());
                self.servers.lock().push(tx);
                Ok((Box::new(MockSink(log)), rx))
            }
            Behavior::Refuse => Err(CoreError::Network("connection refused".to_string())),
        }
    }
}

// ── 화면 ──

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Status(ConnectionStatus),
    FormError(String),
    Stream(StreamState),
    Directory {
        ids: Vec<String>,
        names: Vec<String>,
        selected: Option<String>,
        badge: String,
    },
    Selection {
        selected: Option<String>,
        name_editable: bool,
    },
    Settings(String, CameraSettings),
    Fps(f64),
}

pub struct RecordingView {
    tx: mpsc::UnboundedSender<ViewEvent>,
}

impl DashboardView for RecordingView {
    fn connection_status(&self, status: ConnectionStatus) {
        let _ = self.tx.send(ViewEvent::Status(status));
    }

    fn form_error(&self, message: &str) {
        let _ = self.tx.send(ViewEvent::FormError(message.to_string()));
    }

    fn stream_state(&self, state: StreamState) {
        let _ = self.tx.send(ViewEvent::Stream(state));
    }

    fn directory(&self, directory: &CameraDirectory, selected: Option<&str>, badge: &StatusBadge) {
        let _ = self.tx.send(ViewEvent::Directory {
            ids: directory.iter().map(|e| e.id.clone()).collect(),
            names: directory.iter().map(|e| e.name.clone()).collect(),
            selected: selected.map(str::to_string),
            badge: badge.text.clone(),
        });
    }

    fn selection(&self, selected: Option<&str>, name_editable: bool) {
        let _ = self.tx.send(ViewEvent::Selection {
            selected: selected.map(str::to_string),
            name_editable,
        });
    }

    fn settings(&self, camera_id: &str, settings: &CameraSettings) {
        let _ = self
            .tx
            .send(ViewEvent::Settings(camera_id.to_string(), settings.clone()));
    }

    fn fps(&self, fps: f64) {
        let _ = self.tx.send(ViewEvent::Fps(fps));
    }
}

// ── 프레임 표면 ──

#[derive(Default)]
pub struct CountingSurface {
    next_id: Mutex<u64>,
    pub presented: Mutex<Vec<u64>>,
    pub released: Mutex<Vec<u64>>,
}

impl FrameSurface for CountingSurface {
    fn create(&self, data: &[u8]) -> Result<FrameHandle, CoreError> {
        let mut next = self.next_id.lock();
        *next += 1;
        Ok(FrameHandle::new(*next, 320, 240, data.len()))
    }

    fn present(&self, handle: &FrameHandle) {
        self.presented.lock().push(handle.id());
    }

    fn release(&self, handle: FrameHandle) {
        self.released.lock().push(handle.id());
    }
}

// ── 하네스 ──

pub struct Harness {
    pub handle: SessionHandle,
    pub connector: Arc<MockConnector>,
    pub kv: Arc<MemoryKvStore>,
    pub surface: Arc<CountingSurface>,
    view_rx: mpsc::UnboundedReceiver<ViewEvent>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), CoreError>>,
}

/// 기본 옵션: 127.0.0.1:5000 자동 연결, 재시도/유예 5초
pub fn options() -> SessionOptions {
    SessionOptions {
        initial_endpoint: Some(("127.0.0.1".to_string(), "5000".to_string())),
        ..SessionOptions::default()
    }
}

pub fn start(script: Vec<Behavior>, options: SessionOptions) -> Harness {
    start_with_store(script, options, Arc::new(MemoryKvStore::new()))
}

pub fn start_with_store(
    script: Vec<Behavior>,
    options: SessionOptions,
    kv: Arc<MemoryKvStore>,
) -> Harness {
    let connector = MockConnector::scripted(script);
    let surface = Arc::new(CountingSurface::default());
    let (view_tx, view_rx) = mpsc::unbounded_channel();
    let view = Arc::new(RecordingView { tx: view_tx });

    let (session, handle) = Session::new(
        connector.clone(),
        kv.clone(),
        view,
        surface.clone(),
        options,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(session.run(shutdown_rx));

    Harness {
        handle,
        connector,
        kv,
        surface,
        view_rx,
        shutdown_tx,
        task,
    }
}

impl Harness {
    /// 조건에 맞는 화면 이벤트까지 대기 (그 사이 이벤트는 버림)
    pub async fn expect<F>(&mut self, mut matches: F) -> ViewEvent
    where
        F: FnMut(&ViewEvent) -> bool,
    {
        let wait = async {
            loop {
                let event = self.view_rx.recv().await.expect("화면 채널 닫힘");
                if matches(&event) {
                    return event;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(120), wait)
            .await
            .expect("기대한 화면 이벤트가 오지 않음")
    }

    pub async fn expect_status(&mut self, status: ConnectionStatus) {
        self.expect(|e| *e == ViewEvent::Status(status)).await;
    }

    pub async fn expect_selection(&mut self, selected: Option<&str>) {
        self.expect(|e| {
            matches!(e, ViewEvent::Selection { selected: s, .. } if s.as_deref() == selected)
        })
        .await;
    }

    /// 저장소의 설정 JSON
    pub async fn persisted(&self) -> Value {
        let raw = self
            .kv
            .get("cameraSettings")
            .await
            .unwrap()
            .expect("저장된 설정 없음");
        serde_json::from_str(&raw).unwrap()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        self.task.await.unwrap().unwrap();
    }
}
