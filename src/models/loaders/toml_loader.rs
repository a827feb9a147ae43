use crate::error::{ConfigError, CuratorResult};
use crate::models::sources::SourceSettings;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载来源定义
///
/// 文件不存在时使用内置默认来源
pub async fn load_sources(path: &Path) -> CuratorResult<SourceSettings> {
    if !path.exists() {
        tracing::info!(
            "未找到来源配置文件 {}，使用内置默认来源",
            path.display()
        );
        return Ok(SourceSettings::default());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::SourcesFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let settings = parse_sources(&content).map_err(|message| ConfigError::SourcesFile {
        path: path.display().to_string(),
        message,
    })?;

    tracing::info!(
        "成功加载来源配置: {} 条检索语句, {} 个订阅主题组, {} 个角色",
        settings.queries.len(),
        settings.feed_groups.len(),
        settings.personas.len()
    );

    Ok(settings)
}

fn parse_sources(content: &str) -> Result<SourceSettings, String> {
    let mut settings: SourceSettings = toml::from_str(content).map_err(|e| e.to_string())?;

    // 文件只覆盖它写出的部分，其余沿用默认值
    let defaults = SourceSettings::default();
    if settings.queries.is_empty() {
        settings.queries = defaults.queries;
    }
    if settings.feed_groups.is_empty() {
        settings.feed_groups = defaults.feed_groups;
    }
    for (name, persona) in defaults.personas {
        settings.personas.entry(name).or_insert(persona);
    }

    Ok(settings)
}
