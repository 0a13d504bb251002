//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `camdeck-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! I/O가 있는 trait은 `async_trait` 매크로로 object safety를 보장하고,
//! 로컬 렌더링 포트(`view`, `frame_surface`)는 동기 trait이다.

pub mod frame_surface;
pub mod kv_store;
pub mod transport;
pub mod view;
