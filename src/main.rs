use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use paper_curator::models::load_sources;
use paper_curator::utils::logging;
use paper_curator::{Config, PhaseSelection, PipelineOrchestrator, RunRequest};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PhaseArg {
    #[value(name = "1")]
    Discovery,
    #[value(name = "2")]
    Evaluation,
    #[value(name = "3")]
    Publication,
    Full,
}

impl From<PhaseArg> for PhaseSelection {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Discovery => PhaseSelection::Discovery,
            PhaseArg::Evaluation => PhaseSelection::Evaluation,
            PhaseArg::Publication => PhaseSelection::Publication,
            PhaseArg::Full => PhaseSelection::Full,
        }
    }
}

/// 论文策展流水线
#[derive(Debug, Parser)]
#[command(name = "paper-curator", version, about)]
struct Cli {
    /// 运行的阶段
    #[arg(long, value_enum, default_value = "full")]
    phase: PhaseArg,

    /// 只处理这一天 (YYYY-MM-DD)，不走续跑逻辑
    #[arg(long)]
    date: Option<NaiveDate>,

    /// 发布角色（默认取配置）
    #[arg(long)]
    persona: Option<String>,

    /// 演练：不写入内容平台
    #[arg(long)]
    dry_run: bool,

    /// 来源定义文件（默认取配置）
    #[arg(long)]
    sources: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();
    logging::init_log_file(&config.log_file)
        .with_context(|| format!("无法写入日志文件 {}", config.log_file))?;

    let persona = cli
        .persona
        .clone()
        .unwrap_or_else(|| config.default_persona.clone());
    logging::log_startup(
        &format!("{:?}", cli.phase).to_lowercase(),
        &persona,
        cli.dry_run,
    );

    let sources_path = cli
        .sources
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.sources_file));
    let settings = load_sources(&sources_path).await?;

    let mut orchestrator = PipelineOrchestrator::from_config(&config, settings, cli.dry_run);
    let request = RunRequest {
        phase: cli.phase.into(),
        date: cli.date,
        persona,
    };

    match orchestrator.run(&request, Utc::now().date_naive()).await {
        Ok(Some(summary)) => {
            logging::print_run_summary(&summary, &config.log_file);
            Ok(())
        }
        Ok(None) => {
            info!("✓ 阶段运行完成");
            Ok(())
        }
        Err(e) => {
            error!("❌ 运行失败: {}", e);
            Err(e.into())
        }
    }
}
