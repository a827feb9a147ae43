//! 进程内存储
//!
//! 与 `RestPaperStore` 行为一致的内存实现，用于测试和离线演练

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::clients::store_client::{PaperStore, PublishRecord};
use crate::error::{CuratorResult, StoreError};

#[derive(Default)]
struct Inner {
    records: Vec<PublishRecord>,
    labels: HashSet<String>,
    label_calls: usize,
    failing_ids: HashSet<String>,
}

/// 内存存储
#[derive(Default)]
pub struct MemoryPaperStore {
    inner: Mutex<Inner>,
}

impl MemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条已发布记录
    pub fn seed(&self, record: PublishRecord) {
        self.lock().records.push(record);
    }

    /// 让指定标识的插入失败
    pub fn fail_inserts_for(&self, id: impl Into<String>) {
        self.lock().failing_ids.insert(id.into());
    }

    pub fn records(&self) -> Vec<PublishRecord> {
        self.lock().records.clone()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.lock().labels.contains(label)
    }

    /// `ensure_label` 被调用的次数
    pub fn label_calls(&self) -> usize {
        self.lock().label_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // 锁中毒只可能来自测试线程 panic，继续使用内部数据即可
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaperStore for MemoryPaperStore {
    async fn existing_ids(&self, ids: &[String]) -> CuratorResult<HashSet<String>> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .filter(|r| ids.contains(&r.external_id))
            .map(|r| r.external_id.clone())
            .collect())
    }

    async fn insert(&self, record: &PublishRecord) -> CuratorResult<()> {
        let mut inner = self.lock();
        if inner.failing_ids.contains(&record.external_id) {
            return Err(StoreError::BadResponse {
                endpoint: "memory".to_string(),
                status: 500,
                body: format!("insert rejected for {}", record.external_id),
            }
            .into());
        }
        inner.records.push(record.clone());
        Ok(())
    }

    async fn recent_titles(&self, author_id: &str, limit: usize) -> CuratorResult<Vec<String>> {
        let inner = self.lock();
        Ok(inner
            .records
            .iter()
            .rev()
            .filter(|r| r.author_id == author_id)
            .take(limit)
            .map(|r| r.title.clone())
            .collect())
    }

    async fn ensure_label(&self, label: &str) -> CuratorResult<()> {
        let mut inner = self.lock();
        inner.label_calls += 1;
        inner.labels.insert(label.to_string());
        Ok(())
    }
}
