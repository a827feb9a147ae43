//! 条目解析 - 业务能力层
//!
//! 把检索 API（Atom）和订阅源（RSS）的条目统一解析为 `CandidatePaper`：
//! - 标识去掉版本后缀（`2402.00001v2` → `2402.00001`）
//! - 空白归一化、HTML/XML 实体解码
//! - 作者按逗号拆分
//! - 缺失的摘要页 / PDF 链接由标识合成

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use regex::{Captures, Regex};

use crate::error::FetchError;
use crate::models::CandidatePaper;

const ABS_BASE: &str = "https://arxiv.org/abs/";
const PDF_BASE: &str = "https://arxiv.org/pdf/";

static RE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\d+$").expect("Invalid version regex"));

static RE_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("Invalid entity regex")
});

static RE_ANNOUNCEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)arXiv:(\S+)\s+Announce Type:\s*(\S+)\s+Abstract:\s*(.*)")
        .expect("Invalid announcement regex")
});

/// 订阅源条目中的公告信息
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub id: String,
    pub kind: String,
    pub abstract_text: String,
}

impl Announcement {
    /// `replace` / `replace-cross` 是已发布论文的修订版本
    pub fn is_revision(&self) -> bool {
        self.kind.starts_with("replace")
    }
}

/// 解析 Atom / RSS 文本
pub fn parse_feed(url: &str, body: &str) -> Result<Feed, FetchError> {
    feed_rs::parser::parse(body.as_bytes()).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// 去掉标识的版本后缀
pub fn strip_version(id: &str) -> String {
    RE_VERSION.replace(id.trim(), "").into_owned()
}

/// 从摘要页 URL 或 OAI 标识中提取论文标识（不含版本）
///
/// 旧式标识带分类前缀（`cond-mat/0101001`），所以优先取 `/abs/` 之后的全部内容
pub fn id_from_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let raw = if let Some((_, rest)) = url.split_once("/abs/") {
        rest
    } else if let Some((_, rest)) = url.split_once("arXiv.org:") {
        rest
    } else {
        url.rsplit('/').next()?
    };
    let id = strip_version(raw);
    (!id.is_empty()).then_some(id)
}

/// 解析订阅源摘要中的 `arXiv:<ID> Announce Type: <type> Abstract: <text>`
pub fn parse_announcement(summary: &str) -> Option<Announcement> {
    let caps = RE_ANNOUNCEMENT.captures(summary)?;
    Some(Announcement {
        id: strip_version(&caps[1]),
        kind: caps[2].to_ascii_lowercase(),
        abstract_text: clean_text(&caps[3]),
    })
}

/// 折叠连续空白
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解码 HTML/XML 实体；不认识的命名实体原样保留
pub fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// 实体解码 + 空白归一化
pub fn clean_text(text: &str) -> String {
    normalize_whitespace(&decode_entities(text))
}

/// 作者列表：订阅源把所有作者写在一个字段里，用逗号分隔
pub fn split_authors<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    names
        .into_iter()
        .flat_map(|name| name.split(','))
        .map(clean_text)
        .filter(|name| !name.is_empty())
        .collect()
}

/// 由条目和已确定的标识、摘要构建候选论文
///
/// `fallback_published` 用于条目本身没有发布时间的情况（订阅源按频道时间）
pub fn build_candidate(
    entry: &Entry,
    id: String,
    abstract_text: String,
    fallback_published: DateTime<Utc>,
) -> CandidatePaper {
    let title = entry
        .title
        .as_ref()
        .map(|t| clean_text(&t.content))
        .unwrap_or_default();

    let authors = split_authors(entry.authors.iter().map(|a| a.name.as_str()));

    let categories = entry
        .categories
        .iter()
        .map(|c| c.term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect();

    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback_published);

    let is_pdf = |title: Option<&String>, href: &str| {
        title.map(|t| t.eq_ignore_ascii_case("pdf")).unwrap_or(false) || href.contains("/pdf/")
    };

    let pdf_url = entry
        .links
        .iter()
        .find(|l| is_pdf(l.title.as_ref(), &l.href))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| format!("{}{}", PDF_BASE, id));

    let abs_url = entry
        .links
        .iter()
        .filter(|l| !is_pdf(l.title.as_ref(), &l.href))
        .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
        .map(|l| l.href.clone())
        .unwrap_or_else(|| format!("{}{}", ABS_BASE, id));

    CandidatePaper {
        id,
        title,
        abstract_text,
        authors,
        categories,
        published,
        abs_url,
        pdf_url,
    }
}

/// 检索 API 的 Atom 条目 → 候选论文
///
/// 无法得到标识的条目返回 `None`
pub fn candidate_from_atom(entry: &Entry, fallback_published: DateTime<Utc>) -> Option<CandidatePaper> {
    let id = id_from_url(&entry.id).or_else(|| {
        entry
            .links
            .iter()
            .find_map(|l| id_from_url(&l.href))
    })?;

    let abstract_text = entry
        .summary
        .as_ref()
        .map(|s| clean_text(&s.content))
        .unwrap_or_default();

    Some(build_candidate(entry, id, abstract_text, fallback_published))
}
