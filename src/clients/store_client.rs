/// 内容平台存储客户端
///
/// 封装所有与"已发布条目"集合相关的调用逻辑（PostgREST 风格 REST 接口）
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{CuratorError, CuratorResult, StoreError};

/// 待插入的发布记录（反规范化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub external_id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub label: String,
    pub tags: Vec<String>,
    pub source_url: String,
}

/// 已发布条目存储
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// 一次批量查询：返回已存在的外部标识
    async fn existing_ids(&self, ids: &[String]) -> CuratorResult<HashSet<String>>;

    /// 插入一条发布记录
    async fn insert(&self, record: &PublishRecord) -> CuratorResult<()>;

    /// 某个作者最近发布的标题（按发布时间倒序）
    async fn recent_titles(&self, author_id: &str, limit: usize) -> CuratorResult<Vec<String>>;

    /// 确保标签存在（幂等）
    async fn ensure_label(&self, label: &str) -> CuratorResult<()>;
}

/// PostgREST 存储客户端
pub struct RestPaperStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    posts_table: String,
    labels_table: String,
}

impl RestPaperStore {
    /// 创建新的存储客户端
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.store_url.trim_end_matches('/').to_string(),
            api_key: config.store_key.clone(),
            posts_table: config.posts_table.clone(),
            labels_table: config.labels_table.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// 发送请求并检查状态码
    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> CuratorResult<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| CuratorError::store_request_failed(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn json_rows(&self, endpoint: &str, request: reqwest::RequestBuilder) -> CuratorResult<Vec<Value>> {
        let response = self.send(endpoint, request).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| CuratorError::store_request_failed(endpoint, e))?;
        debug!("存储返回 {} 行 ({})", rows.len(), endpoint);
        Ok(rows)
    }
}

#[async_trait]
impl PaperStore for RestPaperStore {
    async fn existing_ids(&self, ids: &[String]) -> CuratorResult<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let endpoint = self.table_url(&self.posts_table);
        let filter = format!("in.({})", ids.iter().map(|id| quote_filter_value(id)).collect::<Vec<_>>().join(","));
        let request = self
            .client
            .get(&endpoint)
            .query(&[("select", "external_id"), ("external_id", filter.as_str())]);

        let rows = self.json_rows(&endpoint, request).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("external_id").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect())
    }

    async fn insert(&self, record: &PublishRecord) -> CuratorResult<()> {
        let endpoint = self.table_url(&self.posts_table);
        debug!("插入发布记录: {}", record.external_id);

        let request = self
            .client
            .post(&endpoint)
            .header("Prefer", "return=minimal")
            .json(record);
        self.send(&endpoint, request).await?;
        Ok(())
    }

    async fn recent_titles(&self, author_id: &str, limit: usize) -> CuratorResult<Vec<String>> {
        let endpoint = self.table_url(&self.posts_table);
        let author_filter = format!("eq.{}", author_id);
        let limit = limit.to_string();
        let request = self.client.get(&endpoint).query(&[
            ("select", "title"),
            ("author_id", author_filter.as_str()),
            ("order", "created_at.desc"),
            ("limit", limit.as_str()),
        ]);

        let rows = self.json_rows(&endpoint, request).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("title").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect())
    }

    async fn ensure_label(&self, label: &str) -> CuratorResult<()> {
        let endpoint = self.table_url(&self.labels_table);
        let request = self
            .client
            .post(&endpoint)
            .query(&[("on_conflict", "name")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&json!({ "name": label }));
        self.send(&endpoint, request).await?;
        Ok(())
    }
}

/// PostgREST `in.(...)` 过滤值加引号，避免标识中的 `.` `,` 被误解析
fn quote_filter_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_filter_value() {
        assert_eq!(quote_filter_value("2402.00001"), "\"2402.00001\"");
        assert_eq!(quote_filter_value("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_table_url_trims_trailing_slash() {
        let config = Config {
            store_url: "https://store.example.org/".to_string(),
            ..Config::default()
        };
        let store = RestPaperStore::new(&config);
        assert_eq!(
            store.table_url("posts"),
            "https://store.example.org/rest/v1/posts"
        );
    }

    /// 测试存储连接性（需要真实的 STORE_URL / STORE_KEY）
    #[tokio::test]
    #[ignore]
    async fn test_store_connectivity() {
        let config = Config::from_env();
        let store = RestPaperStore::new(&config);
        let existing = store
            .existing_ids(&["0000.00000".to_string()])
            .await
            .expect("存储查询失败");
        assert!(existing.is_empty());
    }
}
