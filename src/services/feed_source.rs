//! 订阅源候选来源
//!
//! 每个主题组一个订阅源：`<feed_base>/<cat1>+<cat2>`。
//! 条目摘要形如 `arXiv:<ID> Announce Type: <type> Abstract: <text>`：
//! - `new` / `cross` 是首次公告，保留
//! - `replace` / `replace-cross` 是修订，丢弃
//!
//! 剩余条目的摘要须命中主题组的任一关键词。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, TimeZone, Utc};
use feed_rs::model::Entry;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::SourceKind;
use crate::error::CuratorResult;
use crate::infrastructure::RateLimitedFetcher;
use crate::models::{CandidatePaper, DateWindow, FeedGroup};
use crate::services::candidate_source::{finish_discovery, CandidateSource, Discovery};
use crate::services::entry_parser::{
    build_candidate, clean_text, id_from_url, parse_announcement, parse_feed,
};

pub struct FeedSource {
    fetcher: RateLimitedFetcher,
    base_url: String,
    groups: Vec<FeedGroup>,
    pacing: Duration,
    min_candidates_warning: usize,
}

/// 单个订阅条目的筛选结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryFate {
    Kept,
    Revision,
    NoKeyword,
    NoId,
}

impl FeedSource {
    pub fn new(
        fetcher: RateLimitedFetcher,
        base_url: String,
        groups: Vec<FeedGroup>,
        pacing: Duration,
        min_candidates_warning: usize,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            groups,
            pacing,
            min_candidates_warning,
        }
    }

    pub fn feed_url(&self, group: &FeedGroup) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            group.categories.join("+")
        )
    }

    async fn run_group(
        &self,
        group: &FeedGroup,
        window: &DateWindow,
    ) -> CuratorResult<Vec<CandidatePaper>> {
        let url = self.feed_url(group);
        debug!("订阅源 URL: {}", url);

        let body = self.fetcher.fetch(&url).await?;
        let feed = parse_feed(&url, &body)?;

        // 条目没有自己的时间时使用频道时间
        let fallback = feed
            .published
            .or(feed.updated)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&window.end.and_time(NaiveTime::default())));

        let mut papers = Vec::new();
        let (mut revisions, mut unmatched, mut without_id) = (0usize, 0usize, 0usize);

        for entry in &feed.entries {
            match screen_entry(entry, group, fallback) {
                (EntryFate::Kept, Some(paper)) => papers.push(paper),
                (EntryFate::Revision, _) => revisions += 1,
                (EntryFate::NoKeyword, _) => unmatched += 1,
                _ => without_id += 1,
            }
        }

        info!(
            "  ✓ [{}] 保留 {} 篇 (修订 {}, 未命中关键词 {}, 无标识 {})",
            group.label,
            papers.len(),
            revisions,
            unmatched,
            without_id
        );
        Ok(papers)
    }
}

fn screen_entry(
    entry: &Entry,
    group: &FeedGroup,
    fallback: chrono::DateTime<Utc>,
) -> (EntryFate, Option<CandidatePaper>) {
    let summary = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .unwrap_or_default();

    let (id, abstract_text) = match parse_announcement(summary) {
        Some(announcement) if announcement.is_revision() => {
            return (EntryFate::Revision, None);
        }
        Some(announcement) => (Some(announcement.id), announcement.abstract_text),
        None => {
            let id = entry
                .links
                .iter()
                .find_map(|l| id_from_url(&l.href))
                .or_else(|| id_from_url(&entry.id));
            (id, clean_text(summary))
        }
    };

    let Some(id) = id else {
        return (EntryFate::NoId, None);
    };

    if !group.matches(&abstract_text) {
        return (EntryFate::NoKeyword, None);
    }

    (
        EntryFate::Kept,
        Some(build_candidate(entry, id, abstract_text, fallback)),
    )
}

#[async_trait]
impl CandidateSource for FeedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    fn labels(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.label.clone()).collect()
    }

    async fn discover(&self, window: &DateWindow) -> CuratorResult<Discovery> {
        info!("📡 订阅源: {} 个主题组", self.groups.len());

        let mut batches = Vec::with_capacity(self.groups.len());
        for (index, group) in self.groups.iter().enumerate() {
            if index > 0 {
                sleep(self.pacing).await;
            }
            let papers = self.run_group(group, window).await?;
            batches.push((group.label.clone(), papers));
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

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel>
  <title>cond-mat.mtrl-sci updates on arXiv.org</title>
  <link>http://rss.arxiv.org/rss/cond-mat.mtrl-sci</link>
  <description>updates</description>
  <pubDate>Wed, 18 Feb 2026 00:00:00 -0500</pubDate>
  <item>
    <title>Neural Potentials for Oxides</title>
    <link>https://arxiv.org/abs/2602.11111</link>
    <description>arXiv:2602.11111v1 Announce Type: new
Abstract: We train a neural network potential for oxide materials.</description>
    <guid isPermaLink="false">oai:arXiv.org:2602.11111v1</guid>
    <category>cond-mat.mtrl-sci</category>
    <dc:creator>Ada Lovelace, Alan Turing</dc:creator>
  </item>
  <item>
    <title>Revised Work</title>
    <link>https://arxiv.org/abs/2601.22222</link>
    <description>arXiv:2601.22222v2 Announce Type: replace
Abstract: A machine learning study, revised.</description>
    <guid isPermaLink="false">oai:arXiv.org:2601.22222v2</guid>
  </item>
  <item>
    <title>Cross-listed ML Paper</title>
    <link>https://arxiv.org/abs/2602.33333</link>
    <description>arXiv:2602.33333v1 Announce Type: cross
Abstract: Deep Learning for phonon spectra.</description>
    <guid isPermaLink="false">oai:arXiv.org:2602.33333v1</guid>
  </item>
  <item>
    <title>Off-topic</title>
    <link>https://arxiv.org/abs/2602.44444</link>
    <description>arXiv:2602.44444v1 Announce Type: new
Abstract: Classical elasticity of rubber.</description>
    <guid isPermaLink="false">oai:arXiv.org:2602.44444v1</guid>
  </item>
</channel>
</rss>"#;

    #[derive(Default)]
    struct FixedTransport {
        urls: Mutex<Vec<String>>,
        calls_at: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl HttpTransport for FixedTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.calls_at.lock().unwrap().push(Instant::now());
            Ok(HttpResponse {
                status: 200,
                body: RSS_SAMPLE.to_string(),
            })
        }
    }

    fn group() -> FeedGroup {
        FeedGroup {
            label: "materials-ml".to_string(),
            categories: vec!["cond-mat.mtrl-sci".to_string(), "cs.LG".to_string()],
            keywords: vec![
                "neural network".to_string(),
                "machine learning".to_string(),
                "deep learning".to_string(),
            ],
        }
    }

    fn source(transport: Arc<FixedTransport>) -> FeedSource {
        FeedSource::new(
            RateLimitedFetcher::new(transport, RetryPolicy::new(0, Duration::ZERO)),
            "https://rss.arxiv.org/rss/".to_string(),
            vec![group()],
            Duration::ZERO,
            5,
        )
    }

    #[test]
    fn test_feed_url() {
        let transport = Arc::new(FixedTransport::default());
        assert_eq!(
            source(transport).feed_url(&group()),
            "https://rss.arxiv.org/rss/cond-mat.mtrl-sci+cs.LG"
        );
    }

    #[tokio::test]
    async fn test_revisions_dropped_and_keywords_required() {
        let transport = Arc::new(FixedTransport::default());
        let source = source(transport.clone());
        let window = DateWindow::single(NaiveDate::from_ymd_opt(2026, 2, 18).unwrap());

        let discovery = source.discover(&window).await.unwrap();
        let ids: Vec<&str> = discovery.papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2602.11111", "2602.33333"]);
        assert_eq!(discovery.query_summary["materials-ml"], 2);
        assert_eq!(transport.urls.lock().unwrap().len(), 1);

        let first = &discovery.papers[0];
        assert_eq!(first.title, "Neural Potentials for Oxides");
        assert_eq!(
            first.abstract_text,
            "We train a neural network potential for oxide materials."
        );
        assert_eq!(first.abs_url, "https://arxiv.org/abs/2602.11111");
        assert_eq!(first.pdf_url, "https://arxiv.org/pdf/2602.11111");
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_paced_without_trailing_pause() {
        let transport = Arc::new(FixedTransport::default());
        let groups = ["alloys", "oxides", "polymers"]
            .iter()
            .map(|label| FeedGroup {
                label: label.to_string(),
                ..group()
            })
            .collect();
        let source = FeedSource::new(
            RateLimitedFetcher::new(transport.clone(), RetryPolicy::new(0, Duration::ZERO)),
            "https://rss.arxiv.org/rss/".to_string(),
            groups,
            Duration::from_secs(3),
            5,
        );
        let window = DateWindow::single(NaiveDate::from_ymd_opt(2026, 2, 18).unwrap());

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
        assert_eq!(offsets, vec![0, 3, 6]);
        assert_eq!(elapsed.as_secs(), 6);
    }
}
