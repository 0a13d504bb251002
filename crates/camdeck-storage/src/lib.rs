//! # camdeck-storage
//!
//! 로컬 저장소 어댑터.
//! 카메라 설정 JSON을 보관하는 키-값 저장소(`KeyValueStore` 포트) 구현을 제공한다.
//!
//! ## 모듈
//! - `sqlite`: 파일 기반 키-값 저장소 (기본)
//! - `memory`: 인메모리 키-값 저장소 (`--ephemeral`, 테스트)
//! - `migration`: 스키마 마이그레이션

pub mod memory;
pub mod migration;
pub mod sqlite;
