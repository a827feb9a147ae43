//! 日期窗口续跑
//!
//! 从已发布标题的 `[YYYY-MM-DD]` 前缀中恢复"上次处理到哪一天"，
//! 窗口为 [上次日期 + 1, 昨天]。检索 API 当天的索引有延迟，所以终点是昨天。

use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::{info, warn};

use crate::clients::PaperStore;
use crate::error::CuratorResult;
use crate::models::DateWindow;

static RE_TITLE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{4}-\d{2}-\d{2})\]").expect("Invalid title date regex")
});

/// 解析标题前缀中的日期
pub fn embedded_date(title: &str) -> Option<NaiveDate> {
    let caps = RE_TITLE_DATE.captures(title.trim_start())?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()
}

/// 最近一批标题中最晚的日期
pub fn latest_embedded_date<'a>(titles: impl IntoIterator<Item = &'a String>) -> Option<NaiveDate> {
    titles.into_iter().filter_map(|t| embedded_date(t)).max()
}

/// 由上次处理日期计算窗口；可能为空窗口
pub fn window_after(last_published: Option<NaiveDate>, today: NaiveDate) -> DateWindow {
    let yesterday = today - Duration::days(1);
    match last_published {
        Some(last) => DateWindow::new(last + Duration::days(1), yesterday),
        None => DateWindow::single(yesterday),
    }
}

/// 解析本次运行的日期窗口
///
/// # 参数
/// - `explicit`: 手动指定的日期（窗口即这一天）
/// - `store` / `author_id`: 用于读取该角色的发布历史；没有身份时视为无历史
/// - `lookback`: 读取最近多少条发布
/// - `today`: 当前日期（UTC），由调用方注入
pub async fn resolve_window(
    explicit: Option<NaiveDate>,
    store: &dyn PaperStore,
    author_id: Option<&str>,
    lookback: usize,
    today: NaiveDate,
) -> CuratorResult<DateWindow> {
    if let Some(day) = explicit {
        info!("📅 使用指定日期: {}", day);
        return Ok(DateWindow::single(day));
    }

    let last_published = match author_id {
        Some(author_id) => {
            let titles = store.recent_titles(author_id, lookback).await?;
            latest_embedded_date(&titles)
        }
        None => {
            warn!("⚠️ 没有发布身份，无法读取发布历史，按无历史处理");
            None
        }
    };

    let window = window_after(last_published, today);
    match last_published {
        Some(last) => info!("📅 上次发布日期: {}, 本次窗口: {}", last, window),
        None => info!("📅 没有发布历史, 本次窗口: {}", window),
    }
    Ok(window)
}
