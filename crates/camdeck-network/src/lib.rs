//! # camdeck-network
//!
//! 릴레이 서버와의 WebSocket 통신 어댑터.
//! 소켓 전송(`SocketConnector` 포트 구현), 연결 실패/재시도 추적,
//! 세대(generation) 기반 연결 상태 머신을 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use camdeck_network::connection::ConnectionManager;
//! use camdeck_network::ws_client::WsClient;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let mut manager = ConnectionManager::new(Arc::new(WsClient::new()), policy, timeout, tx);
//! manager.connect("192.168.0.156", "5000").await?;
//! while let Some(event) = rx.recv().await {
//!     if let Some(update) = manager.handle(event).await { /* ... */ }
//! }
//! ```

pub mod connection;
pub mod connectivity;
pub mod ws_client;
