//! 检索 API 候选来源
//!
//! 每条检索语句调用一次检索 API，语句后追加提交日期区间；
//! 相邻两次调用之间固定间隔（限速要求），最后一次之后不再等待。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, TimeZone, Utc};
use reqwest::Url;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::SourceKind;
use crate::error::{ConfigError, CuratorResult};
use crate::infrastructure::RateLimitedFetcher;
use crate::models::{CandidatePaper, DateWindow, SearchQuery};
use crate::services::candidate_source::{finish_discovery, CandidateSource, Discovery};
use crate::services::entry_parser::{candidate_from_atom, parse_feed};

/// 每个窗口日期对应的结果数
const RESULTS_PER_DAY: i64 = 25;
const MIN_RESULTS: i64 = 25;
const MAX_RESULTS: i64 = 100;

pub struct QuerySource {
    fetcher: RateLimitedFetcher,
    base_url: String,
    queries: Vec<SearchQuery>,
    pacing: Duration,
    min_candidates_warning: usize,
}

impl QuerySource {
    pub fn new(
        fetcher: RateLimitedFetcher,
        base_url: String,
        queries: Vec<SearchQuery>,
        pacing: Duration,
        min_candidates_warning: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            queries,
            pacing,
            min_candidates_warning,
        }
    }

    /// 构建一次检索的完整 URL
    pub fn build_url(&self, query: &SearchQuery, window: &DateWindow) -> CuratorResult<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            name: "SEARCH_API_URL".to_string(),
            value: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        let search_query = format!(
            "({}) AND submittedDate:[{}0000 TO {}2359]",
            query.query,
            window.start.format("%Y%m%d"),
            window.end.format("%Y%m%d")
        );

        url.query_pairs_mut()
            .append_pair("search_query", &search_query)
            .append_pair("start", "0")
            .append_pair("max_results", &max_results(window).to_string())
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "descending");

        Ok(url.to_string())
    }

    async fn run_query(
        &self,
        query: &SearchQuery,
        window: &DateWindow,
    ) -> CuratorResult<Vec<CandidatePaper>> {
        let url = self.build_url(query, window)?;
        debug!("检索 URL: {}", url);

        let body = self.fetcher.fetch(&url).await?;
        let feed = parse_feed(&url, &body)?;

        let fallback = Utc.from_utc_datetime(&window.end.and_time(NaiveTime::default()));
        let papers: Vec<CandidatePaper> = feed
            .entries
            .iter()
            .filter_map(|entry| candidate_from_atom(entry, fallback))
            .collect();

        info!("  ✓ [{}] 命中 {} 篇", query.label, papers.len());
        Ok(papers)
    }
}

/// 结果数上限：每天 25 篇，夹在 [25, 100]
pub fn max_results(window: &DateWindow) -> i64 {
    (RESULTS_PER_DAY * window.days()).clamp(MIN_RESULTS, MAX_RESULTS)
}

#[async_trait]
impl CandidateSource for QuerySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Query
    }

    fn labels(&self) -> Vec<String> {
        self.queries.iter().map(|q| q.label.clone()).collect()
    }

    async fn discover(&self, window: &DateWindow) -> CuratorResult<Discovery> {
        info!(
            "🔎 检索 API: {} 条检索语句, 窗口 {}",
            self.queries.len(),
            window
        );

        let mut batches = Vec::with_capacity(self.queries.len());
        for (index, query) in self.queries.iter().enumerate() {
            if index > 0 {
                debug!("等待 {:?} 后执行下一条检索", self.pacing);
                sleep(self.pacing).await;
            }
            let papers = self.run_query(query, window).await?;
            batches.push((query.label.clone(), papers));
        }

        Ok(finish_discovery(batches, self.min_candidates_warning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::infrastructure::{HttpResponse, HttpTransport, RetryPolicy};
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    struct RecordingTransport {
        urls: Mutex<Vec<String>>,
        calls_at: Mutex<Vec<Instant>>,
        body: String,
    }

    impl RecordingTransport {
        fn new(body: String) -> Arc<Self> {
            Arc::new(Self {
                urls: Mutex::new(vec![]),
                calls_at: Mutex::new(vec![]),
                body,
            })
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.calls_at.lock().unwrap().push(Instant::now());
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn atom(ids: &[&str]) -> String {
        let entries: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<entry><id>http://arxiv.org/abs/{id}v1</id><published>2026-02-18T12:00:00Z</published>
<updated>2026-02-18T12:00:00Z</updated><title>Paper {id}</title><summary>ML for materials.</summary>
<author><name>A. Author</name></author></entry>"#
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom"><id>q</id><title>q</title><updated>2026-02-19T00:00:00Z</updated>{}</feed>"#,
            entries
        )
    }

    fn source(transport: Arc<RecordingTransport>, queries: Vec<SearchQuery>) -> QuerySource {
        paced_source(transport, queries, Duration::ZERO)
    }

    fn paced_source(
        transport: Arc<RecordingTransport>,
        queries: Vec<SearchQuery>,
        pacing: Duration,
    ) -> QuerySource {
        QuerySource::new(
            RateLimitedFetcher::new(transport, RetryPolicy::new(0, Duration::ZERO)),
            "http://export.arxiv.org/api/query".to_string(),
            queries,
            pacing,
            5,
        )
    }

    fn query(label: &str) -> SearchQuery {
        SearchQuery {
            label: label.to_string(),
            query: "cat:cond-mat.mtrl-sci".to_string(),
        }
    }

    #[test]
    fn test_max_results_clamp() {
        let one = DateWindow::single(date("2026-02-18"));
        let three = DateWindow::new(date("2026-02-16"), date("2026-02-18"));
        let ten = DateWindow::new(date("2026-02-09"), date("2026-02-18"));
        assert_eq!(max_results(&one), 25);
        assert_eq!(max_results(&three), 75);
        assert_eq!(max_results(&ten), 100);
    }

    #[test]
    fn test_build_url() {
        let transport = RecordingTransport::new(String::new());
        let source = source(transport, vec![]);
        let window = DateWindow::new(date("2026-02-16"), date("2026-02-18"));
        let url = source.build_url(&query("q"), &window).unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: std::collections::HashMap<String, String> =
            parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs["search_query"],
            "(cat:cond-mat.mtrl-sci) AND submittedDate:[202602160000 TO 202602182359]"
        );
        assert_eq!(pairs["max_results"], "75");
        assert_eq!(pairs["sortBy"], "submittedDate");
        assert_eq!(pairs["sortOrder"], "descending");
        assert_eq!(pairs["start"], "0");
    }

    #[tokio::test]
    async fn test_discover_merges_and_dedups() {
        let transport = RecordingTransport::new(atom(&["2602.00001", "2602.00002"]));
        let source = source(transport.clone(), vec![query("q1"), query("q2")]);
        let window = DateWindow::single(date("2026-02-18"));

        let discovery = source.discover(&window).await.unwrap();
        assert_eq!(transport.urls.lock().unwrap().len(), 2);
        assert_eq!(discovery.papers.len(), 2);
        assert_eq!(discovery.query_summary["q1"], 2);
        assert_eq!(discovery.query_summary["q2"], 2);
        assert_eq!(discovery.papers[0].id, "2602.00001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_paced_without_trailing_pause() {
        let transport = RecordingTransport::new(atom(&["2602.00001"]));
        let source = paced_source(
            transport.clone(),
            vec![query("q1"), query("q2"), query("q3")],
            Duration::from_secs(15),
        );
        let window = DateWindow::single(date("2026-02-18"));

        let start = Instant::now();
        source.discover(&window).await.unwrap();
        let elapsed = start.elapsed();

        let offsets: Vec<u64> = transport
            .calls_at
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 15, 30]);
        assert_eq!(elapsed.as_secs(), 30);
    }
}
