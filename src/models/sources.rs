use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CuratorResult};

/// 检索语句（布尔关键词 / 分类表达式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub label: String,
    pub query: String,
}

/// 订阅主题组：一个标签、若干来源分类、若干摘要关键词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedGroup {
    pub label: String,
    pub categories: Vec<String>,
    pub keywords: Vec<String>,
}

impl FeedGroup {
    /// 摘要中是否包含任一关键词（不区分大小写的子串匹配）
    pub fn matches(&self, abstract_text: &str) -> bool {
        let haystack = abstract_text.to_lowercase();
        self.keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()))
    }
}

/// 发布角色
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub display_name: String,
    /// 平台上的用户 ID；可被环境变量覆盖
    #[serde(default)]
    pub user_id: Option<String>,
}

/// 来源定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub queries: Vec<SearchQuery>,
    #[serde(default)]
    pub feed_groups: Vec<FeedGroup>,
    #[serde(default)]
    pub personas: BTreeMap<String, Persona>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        let queries = vec![
            SearchQuery {
                label: "ml-materials".to_string(),
                query: "(cat:cond-mat.mtrl-sci) AND (abs:\"machine learning\" OR abs:\"deep learning\" OR abs:\"neural network\")".to_string(),
            },
            SearchQuery {
                label: "generative-materials".to_string(),
                query: "(cat:cond-mat.mtrl-sci OR cat:cs.LG) AND (abs:\"generative model\" OR abs:diffusion OR abs:\"inverse design\") AND abs:material".to_string(),
            },
            SearchQuery {
                label: "llm-materials".to_string(),
                query: "(cat:cs.CL OR cat:cs.AI OR cat:cond-mat.mtrl-sci) AND (abs:\"large language model\" OR abs:LLM) AND abs:material".to_string(),
            },
            SearchQuery {
                label: "interatomic-potentials".to_string(),
                query: "(cat:cond-mat.mtrl-sci OR cat:physics.comp-ph) AND (abs:\"machine learning potential\" OR abs:\"interatomic potential\")".to_string(),
            },
        ];

        let feed_groups = vec![
            FeedGroup {
                label: "materials-ml".to_string(),
                categories: vec!["cond-mat.mtrl-sci".to_string()],
                keywords: vec![
                    "machine learning".to_string(),
                    "deep learning".to_string(),
                    "neural network".to_string(),
                    "language model".to_string(),
                    "generative".to_string(),
                ],
            },
            FeedGroup {
                label: "ai-for-materials".to_string(),
                categories: vec!["cs.LG".to_string(), "cs.AI".to_string()],
                keywords: vec![
                    "material".to_string(),
                    "crystal".to_string(),
                    "alloy".to_string(),
                    "catalyst".to_string(),
                ],
            },
        ];

        let mut personas = BTreeMap::new();
        personas.insert(
            "curator".to_string(),
            Persona {
                display_name: "Paper Curator".to_string(),
                user_id: None,
            },
        );

        Self {
            queries,
            feed_groups,
            personas,
        }
    }
}

impl SourceSettings {
    /// 解析角色的发布身份
    ///
    /// 优先读取环境变量 `CURATOR_PERSONA_<NAME>_ID`，其次读取配置文件中的 `user_id`
    pub fn resolve_identity(&self, persona: &str) -> CuratorResult<String> {
        let entry = self
            .personas
            .get(persona)
            .ok_or_else(|| ConfigError::UnknownPersona(persona.to_string()))?;

        let env_var = persona_env_var(persona);
        let from_env = std::env::var(&env_var).ok().filter(|v| !v.trim().is_empty());

        from_env
            .or_else(|| entry.user_id.clone().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                ConfigError::MissingIdentity {
                    persona: persona.to_string(),
                    env_var,
                }
                .into()
            })
    }

    pub fn query_labels(&self) -> Vec<String> {
        self.queries.iter().map(|q| q.label.clone()).collect()
    }

    pub fn group_labels(&self) -> Vec<String> {
        self.feed_groups.iter().map(|g| g.label.clone()).collect()
    }
}

/// 角色对应的环境变量名
pub fn persona_env_var(persona: &str) -> String {
    let normalized: String = persona
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("CURATOR_PERSONA_{}_ID", normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let group = FeedGroup {
            label: "g".to_string(),
            categories: vec![],
            keywords: vec!["Machine Learning".to_string(), "alloy".to_string()],
        };
        assert!(group.matches("We apply MACHINE LEARNING to ..."));
        assert!(group.matches("High-entropy Alloys"));
        assert!(!group.matches("A study of superconductivity"));
    }

    #[test]
    fn test_persona_env_var() {
        assert_eq!(persona_env_var("curator"), "CURATOR_PERSONA_CURATOR_ID");
        assert_eq!(persona_env_var("news-bot"), "CURATOR_PERSONA_NEWS_BOT_ID");
    }

    #[test]
    fn test_resolve_identity_from_settings() {
        let mut settings = SourceSettings::default();
        settings.personas.insert(
            "digest-test-persona".to_string(),
            Persona {
                display_name: "Digest".to_string(),
                user_id: Some("user-42".to_string()),
            },
        );
        assert_eq!(
            settings.resolve_identity("digest-test-persona").unwrap(),
            "user-42"
        );
    }

    #[test]
    fn test_resolve_identity_missing_and_unknown() {
        let mut settings = SourceSettings::default();
        settings
            .personas
            .insert("no-id-test-persona".to_string(), Persona::default());
        assert!(settings
            .resolve_identity("no-id-test-persona")
            .unwrap_err()
            .is_missing_identity());
        assert!(settings.resolve_identity("nobody").is_err());
    }
}
