//! SQLite 키-값 저장소 어댑터.
//!
//! `KeyValueStore` 포트 구현. 값은 `kv_store` 테이블에 문자열로 저장된다.

use async_trait::async_trait;
use camdeck_core::error::CoreError;
use camdeck_core::ports::kv_store::KeyValueStore;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::migration;

/// SQLite 키-값 저장소
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// 파일 기반 저장소 생성 (상위 디렉토리가 없으면 생성)
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 SQLite 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("값 조회 실패 ({key}): {e}")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )
        .map_err(|e| CoreError::Storage(format!("값 저장 실패 ({key}): {e}")))?;

        debug!("값 저장: {key} ({} bytes)", value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))?;

        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(|e| CoreError::Storage(format!("값 삭제 실패 ({key}): {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_overwrites() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        assert_eq!(store.get("cameraSettings").await.unwrap(), None);

        store.set("cameraSettings", "{}").await.unwrap();
        store.set("cameraSettings", r#"{"a":1}"#).await.unwrap();

        assert_eq!(
            store.get("cameraSettings").await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
    }

    #[tokio::test]
    async fn remove_missing_key_is_ok() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        store.remove("nothing").await.unwrap();

        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("camdeck.db");

        {
            let store = SqliteKvStore::open(&path).unwrap();
            store.set("cameraSettings", r#"{"cam1":{}}"#).await.unwrap();
        }

        let reopened = SqliteKvStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("cameraSettings").await.unwrap().as_deref(),
            Some(r#"{"cam1":{}}"#)
        );
    }
}
