//! 인메모리 키-값 저장소.
//!
//! 프로세스 종료 시 내용이 사라진다. `--ephemeral` 실행과 테스트에서 사용.

use async_trait::async_trait;
use camdeck_core::error::CoreError;
use camdeck_core::ports::kv_store::KeyValueStore;
use parking_lot::Mutex;
use std::collections::HashMap;

/// 인메모리 키-값 저장소
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 값을 가진 저장소 생성
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.to_string(), value.to_string());
        store
    }

    /// 저장된 키 개수
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_entry_is_readable() {
        let store = MemoryKvStore::with_entry("cameraSettings", "{}");
        assert_eq!(store.get("cameraSettings").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove("cameraSettings").await.unwrap();
        assert!(store.is_empty());
    }
}
