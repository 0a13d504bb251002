//! # camdeck-session
//!
//! 대시보드 세션.
//! 연결 이벤트, 사용자 명령, 내부 타이머를 하나의 태스크에서 순서대로 처리하며
//! 카메라 디렉토리/선택, 카메라별 설정, 스트림 표시 상태를 소유한다.
//!
//! ## 모듈
//! - `controller`: 세션 이벤트 루프와 사용자 명령
//! - `router`: 수신 텍스트 메시지 분류
//! - `selection`: 카메라 선택, 자동 선택, 유예 해제
//! - `settings_store`: 카메라별 설정 영속화
//! - `frame`: 영상 프레임 표시와 FPS
//! - `input`: 키 바인딩

pub mod controller;
pub mod frame;
pub mod input;
pub mod router;
pub mod selection;
pub mod settings_store;
