use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{RunOutcome, RunSummary};

/// 初始化 tracing 订阅器
///
/// 默认级别 `info`，可通过 `RUST_LOG` 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n论文策展日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `phase`: 运行的阶段（`1` / `2` / `3` / `full`）
/// - `persona`: 发布角色
/// - `dry_run`: 是否演练
pub fn log_startup(phase: &str, persona: &str, dry_run: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 论文策展流水线启动");
    info!("📋 阶段: {} | 角色: {}", phase, persona);
    if dry_run {
        info!("📝 演练模式：不会写入内容平台");
    }
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始信息
///
/// # 参数
/// - `phase`: 阶段编号
/// - `name`: 阶段名称
/// - `tag`: 日期区间标签
pub fn log_phase_start(phase: u8, name: &str, tag: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 第 {} 阶段: {} [{}]", phase, name, tag);
    info!("{}", "=".repeat(60));
}

/// 记录阶段完成信息
pub fn log_phase_complete(phase: u8, detail: &str) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 阶段完成: {}", phase, detail);
    info!("{}", "─".repeat(60));
}

/// 打印运行汇总
///
/// # 参数
/// - `summary`: 运行汇总
/// - `log_file_path`: 日志文件路径
pub fn print_run_summary(summary: &RunSummary, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行汇总 [{}]", summary.tag);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("窗口: {}", summary.window);
    info!("结果: {}", describe_outcome(summary.outcome));
    info!(
        "候选 {} → 相关 {} → 入选 {}",
        summary.candidate_count, summary.filtered_count, summary.selected_count
    );
    for paper in &summary.selected {
        info!(
            "  ⭐ {:.1} {}",
            paper.score(),
            truncate_text(&paper.paper.title, 70)
        );
    }
    if let Some(publish) = &summary.publish {
        info!("✅ 发布: {}", publish.posted);
        info!("⏭️  跳过: {}", publish.skipped);
        info!("❌ 失败: {}", publish.failed);
    }
    info!("⏱️  耗时: {:.1} 秒", summary.metadata.duration_secs);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

fn describe_outcome(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::NothingToDo => "所有可用日期均已处理",
        RunOutcome::NoCandidates => "没有候选论文（低活跃日）",
        RunOutcome::NoneRelevant => "没有论文通过第一阶段",
        RunOutcome::PublishSkipped => "缺少发布身份，跳过发布",
        RunOutcome::Published => "发布完成",
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
