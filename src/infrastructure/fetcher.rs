//! 限速抓取器 - 基础设施层
//!
//! 所有对外 GET 请求的唯一出口：一次幂等抓取 + 有限次数重试 + 线性退避。
//! 不认识论文、查询语句，只认识 URL。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::FetchError;

/// 重试策略：首次尝试之外最多重试 `retries` 次，第 k 次失败后等待 `base_delay * k`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(30))
    }
}

/// 一次 HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP 传输层
///
/// 只负责"发一个 GET"，重试由 `RateLimitedFetcher` 决定
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// 基于 reqwest 的传输层
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("paper-curator/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(HttpResponse { status, body })
    }
}

/// 限速抓取器
///
/// 职责：
/// - 对同一个 URL 做有限次数的重试
/// - 重试之间线性退避，每次重试打一条 warn
/// - 最后一次失败直接返回 `FetchError::Exhausted`，不再等待
pub struct RateLimitedFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
}

impl RateLimitedFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 抓取 URL，返回响应正文
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts();
        let mut last_status = None;

        for attempt in 1..=max_attempts {
            let reason = match self.transport.get(url).await {
                Ok(response) if response.is_success() => {
                    debug!("抓取成功 (第 {} 次): {} 字节", attempt, response.body.len());
                    return Ok(response.body);
                }
                Ok(response) => {
                    last_status = Some(response.status);
                    format!("HTTP {}", response.status)
                }
                Err(e) => {
                    last_status = None;
                    e.to_string()
                }
            };

            if attempt == max_attempts {
                break;
            }

            let wait = self.policy.delay_for(attempt);
            warn!(
                "抓取失败 ({}), 尝试 {}/{}, 等待 {:?} 后重试: {}",
                reason, attempt, max_attempts, wait, url
            );
            sleep(wait).await;
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        calls: Mutex<u32>,
        calls_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(statuses: &[u16]) -> Self {
            let responses = statuses
                .iter()
                .map(|&status| HttpResponse {
                    status,
                    body: format!("body-{}", status),
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
                calls_at: Mutex::new(vec![]),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.calls_at.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| FetchError::Transport {
                    url: url.to_string(),
                    message: "no scripted response".to_string(),
                })
        }
    }

    fn fetcher(transport: Arc<ScriptedTransport>, retries: u32) -> RateLimitedFetcher {
        RateLimitedFetcher::new(transport, RetryPolicy::new(retries, Duration::ZERO))
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(4, Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(4), Duration::from_secs(120));
        assert_eq!(policy.max_attempts(), 5);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new(&[200]));
        let body = fetcher(transport.clone(), 4).fetch("http://x").await.unwrap();
        assert_eq!(body, "body-200");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let transport = Arc::new(ScriptedTransport::new(&[503, 429, 200]));
        let body = fetcher(transport.clone(), 4).fetch("http://x").await.unwrap();
        assert_eq!(body, "body-200");
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_retry_budget() {
        let transport = Arc::new(ScriptedTransport::new(&[500, 500, 500, 500]));
        let err = fetcher(transport.clone(), 2)
            .fetch("http://x")
            .await
            .unwrap_err();
        // 首次 + 2 次重试，第 4 个脚本响应不会被消费
        assert_eq!(transport.calls(), 3);
        match err {
            FetchError::Exhausted {
                attempts,
                last_status,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_status, Some(500));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_errors_are_retried() {
        let transport = Arc::new(ScriptedTransport::new(&[]));
        let err = fetcher(transport.clone(), 1).fetch("http://x").await.unwrap_err();
        assert_eq!(transport.calls(), 2);
        assert!(matches!(err, FetchError::Exhausted { last_status: None, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_grow_linearly() {
        let transport = Arc::new(ScriptedTransport::new(&[503, 503, 503, 503, 503]));
        let fetcher = RateLimitedFetcher::new(
            transport.clone(),
            RetryPolicy::new(4, Duration::from_secs(30)),
        );

        let start = Instant::now();
        let err = fetcher.fetch("http://x").await.unwrap_err();
        let elapsed = start.elapsed();

        let offsets: Vec<u64> = transport
            .calls_at
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 30, 90, 180, 300]);
        // 最后一次失败后不再等待
        assert_eq!(elapsed.as_secs(), 300);
        assert!(matches!(err, FetchError::Exhausted { attempts: 5, .. }));
    }
}
