//! # camdeck-app
//!
//! CAMDECK 클라이언트 바이너리 진입점.
//! 설정 로드, 어댑터 와이어링, 콘솔 입력, 라이프사이클 관리.

mod console;
mod frame_surface;
#[cfg(feature = "gamepad")]
mod gamepad;
mod lifecycle;
mod view;

use anyhow::{anyhow, Result};
use camdeck_core::config::AppConfig;
use camdeck_core::config_manager::ConfigManager;
use camdeck_core::ports::kv_store::KeyValueStore;
use camdeck_network::ws_client::WsClient;
use camdeck_session::controller::{Session, SessionHandle, SessionOptions};
use camdeck_storage::memory::MemoryKvStore;
use camdeck_storage::sqlite::SqliteKvStore;
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::{ConsoleCommand, HELP};
use crate::frame_surface::ImageFrameSurface;
use crate::lifecycle::LifecycleManager;
use crate::view::TerminalView;

/// CAMDECK 카메라 대시보드 클라이언트
///
/// WebSocket 서버에 연결해 카메라 상태/영상 스트림을 표시하고 설정/명령을 전송한다.
#[derive(Parser, Debug)]
#[command(name = "camdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 서버 호스트 (설정 파일 값 대체)
    #[arg(long, short = 'H')]
    host: Option<String>,

    /// 서버 포트 (설정 파일 값 대체)
    #[arg(long, short = 'p')]
    port: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (설정 DB 위치)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 카메라 설정을 디스크에 저장하지 않음 (인메모리)
    #[arg(long)]
    ephemeral: bool,

    /// 최신 프레임을 기록할 파일 경로
    #[arg(long)]
    frame_out: Option<PathBuf>,

    /// 시작 시 자동 연결하지 않음
    #[arg(long)]
    no_connect: bool,
}

/// 설정 DB 경로 결정 (CLI 인자 → 설정 파일 → 플랫폼 기본 경로)
///
/// # 플랫폼별 기본 경로:
/// - macOS: `~/Library/Application Support/dev.camdeck.camdeck/camdeck.db`
/// - Windows: `%APPDATA%\camdeck\camdeck\data\camdeck.db`
/// - Linux: `~/.local/share/camdeck/camdeck.db`
fn resolve_db_path(data_dir: Option<&Path>, config: &AppConfig) -> PathBuf {
    data_dir
        .map(|d| d.join("camdeck.db"))
        .or_else(|| config.storage.db_path.clone())
        .or_else(|| ConfigManager::data_dir().ok().map(|d| d.join("camdeck.db")))
        .unwrap_or_else(|| PathBuf::from("./camdeck.db"))
}

/// CLI 인자로 설정 오버라이드
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = &args.port {
        config.server.port = port.clone();
    }
    if let Some(path) = &args.frame_out {
        config.stream.frame_output = Some(path.clone());
    }
    if args.no_connect {
        config.server.auto_connect = false;
    }
}

fn print_banner() {
    println!();
    println!("┌──────────────────────────────────────────┐");
    println!("│  CAMDECK · multi-camera dashboard        │");
    println!("│  `help` 입력 시 명령 목록                 │");
    println!("└──────────────────────────────────────────┘");
    println!();
}

/// 표준 입력 전용 스레드
///
/// tokio stdin은 런타임 종료를 막을 수 있으므로 별도 OS 스레드에서 읽는다.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// 콘솔 입력 루프 (종료 신호 또는 `quit`까지)
async fn run_console(
    handle: SessionHandle,
    view: Arc<TerminalView>,
    lifecycle: Arc<LifecycleManager>,
) {
    let mut lines = spawn_stdin_reader();
    let mut shutdown = lifecycle.subscribe();

    loop {
        let line = tokio::select! {
            line = lines.recv() => line,
            _ = shutdown.changed() => break,
        };
        let Some(line) = line else {
            // 입력이 닫혀도 시그널 종료까지는 세션 유지
            info!("표준 입력 종료, 시그널 대기");
            let _ = shutdown.wait_for(|stopping| *stopping).await;
            break;
        };

        match console::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => {
                lifecycle.shutdown();
                break;
            }
            Ok(Some(ConsoleCommand::Help)) => view.print(HELP),
            Ok(Some(ConsoleCommand::Cameras)) => view.print(&view.render_cameras()),
            Ok(Some(ConsoleCommand::Status)) => view.print(&view.render_status()),
            Ok(Some(ConsoleCommand::Session(command))) => {
                if let Err(e) = handle.send(command).await {
                    warn!("명령 전달 실패: {e}");
                    break;
                }
            }
            Err(e) => view.print(&format!("✖ {e}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 뷰가 stdout을 쓰므로 로그는 stderr로
    let log_filter = format!(
        "camdeck={0},camdeck_app={0},camdeck_core={0},camdeck_storage={0},camdeck_network={0},camdeck_session={0}",
        args.log_level
    );
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    print_banner();
    info!("CAMDECK 클라이언트 시작");

    // ── 설정 로드 ──
    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .map_err(|e| anyhow!("설정 로드 실패: {e}"))?;
    info!("설정 파일: {}", config_manager.config_path().display());

    let mut config = config_manager.get();
    apply_overrides(&mut config, &args);
    info!("서버: {}:{}", config.server.host, config.server.port);

    // ── 어댑터 생성 (DI 와이어링) ──
    let kv: Arc<dyn KeyValueStore> = if args.ephemeral {
        info!("인메모리 설정 저장소 사용 (--ephemeral)");
        Arc::new(MemoryKvStore::new())
    } else {
        let db_path = resolve_db_path(args.data_dir.as_deref(), &config);
        info!("설정 DB: {}", db_path.display());
        Arc::new(
            SqliteKvStore::open(&db_path)
                .map_err(|e| anyhow!("설정 DB 열기 실패: {}: {e}", db_path.display()))?,
        )
    };

    let view = Arc::new(TerminalView::stdout());
    let surface = Arc::new(ImageFrameSurface::new(config.stream.frame_output.clone()));
    if let Some(path) = &config.stream.frame_output {
        info!("프레임 출력: {}", path.display());
    }

    let (session, handle) = Session::new(
        Arc::new(WsClient::new()),
        kv,
        view.clone(),
        surface,
        SessionOptions::from_config(&config),
    );

    // ── 실행 ──
    let lifecycle = Arc::new(LifecycleManager::new());
    let session_task = tokio::spawn(session.run(lifecycle.subscribe()));

    let signal_lifecycle = lifecycle.clone();
    tokio::spawn(async move {
        signal_lifecycle.wait_for_signal().await;
    });

    #[cfg(feature = "gamepad")]
    tokio::spawn(gamepad::forward(
        gamepad::spawn_gamepad_reader(),
        handle.clone(),
    ));

    info!("CAMDECK 실행 중 (quit 또는 Ctrl+C로 종료)");
    run_console(handle, view, lifecycle.clone()).await;
    lifecycle.shutdown();

    match session_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("세션 종료 에러: {e}"),
        Err(e) => error!("세션 태스크 실패: {e}"),
    }

    info!("CAMDECK 클라이언트 종료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["camdeck"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn cli_overrides_config() {
        let mut config = AppConfig::default_config();
        let args = args(&["--host", "10.0.0.9", "-p", "8080", "--no-connect"]);
        apply_overrides(&mut config, &args);

        assert_eq!(config.server.host, "10.0.0.9");
        assert_eq!(config.server.port, "8080");
        assert!(!config.server.auto_connect);
        assert_eq!(SessionOptions::from_config(&config).initial_endpoint, None);
    }

    #[test]
    fn db_path_precedence() {
        let mut config = AppConfig::default_config();
        config.storage.db_path = Some(PathBuf::from("/var/lib/camdeck/settings.db"));

        assert_eq!(
            resolve_db_path(Some(Path::new("/tmp/cd")), &config),
            PathBuf::from("/tmp/cd/camdeck.db")
        );
        assert_eq!(
            resolve_db_path(None, &config),
            PathBuf::from("/var/lib/camdeck/settings.db")
        );
    }
}
