//! LLM API 客户端
//!
//! 封装所有与 LLM API 相关的调用逻辑
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型，兼容 OpenAI API 的服务

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CuratorError, CuratorResult, LlmError};

/// 对话模型
///
/// 一次调用 = 一条系统消息 + 一条用户消息 → 一段文本
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 模型标识（写入运行汇总）
    fn model_name(&self) -> &str;

    async fn complete(&self, system_message: &str, user_message: &str) -> CuratorResult<String>;
}

/// 基于 async-openai 的对话模型
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_tokens: u32,
}

impl OpenAiChatModel {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config, model_name: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            max_tokens: 8192,
        }
    }

    /// 第一阶段使用的便宜模型
    pub fn filter_model(config: &Config) -> Self {
        Self::new(config, config.filter_model.clone())
    }

    /// 第二阶段使用的强模型
    pub fn scoring_model(config: &Config) -> Self {
        Self::new(config, config.scoring_model.clone())
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, system_message: &str, user_message: &str) -> CuratorResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_err = |e: async_openai::error::OpenAIError| {
            CuratorError::llm_api_failed(&self.model_name, e)
        };

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_message)
            .build()
            .map_err(build_err)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;

        let messages = vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            CuratorError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}
