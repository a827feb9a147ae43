use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum CuratorError {
    /// 网络抓取错误
    #[error("抓取错误: {0}")]
    Fetch(#[from] FetchError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 存储服务错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 阶段产物错误
    #[error("产物错误: {0}")]
    Artifact(#[from] ArtifactError),
}

/// 网络抓取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 网络请求失败（连接、超时等）
    #[error("请求失败 ({url}): {message}")]
    Transport { url: String, message: String },
    /// 重试次数耗尽
    #[error("重试耗尽 ({url}): 共尝试 {attempts} 次, 最后状态 {last_status:?}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_status: Option<u16>,
    },
    /// 订阅源 / Atom 文档解析失败
    #[error("文档解析失败 ({url}): {message}")]
    Parse { url: String, message: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容无法解析为期望的 JSON 结构
    #[error("{stage} 响应解析失败 (已尝试 {attempts} 次): {message}")]
    Parse {
        stage: &'static str,
        attempts: u32,
        message: String,
    },
}

/// 存储服务错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 网络请求失败
    #[error("存储请求失败 ({endpoint}): {message}")]
    RequestFailed { endpoint: String, message: String },
    /// 存储返回错误响应
    #[error("存储返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 发布身份未配置
    #[error("角色 {persona} 未配置发布身份 (环境变量 {env_var})")]
    MissingIdentity { persona: String, env_var: String },
    /// 未知角色
    #[error("未知角色: {0}")]
    UnknownPersona(String),
    /// 配置值非法
    #[error("配置 {name} 的值 '{value}' 非法: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    /// 来源配置文件读取或解析失败
    #[error("来源配置文件 {path} 加载失败: {message}")]
    SourcesFile { path: String, message: String },
}

/// 阶段产物错误
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// 产物文件不存在
    #[error("阶段 {phase} 的产物不存在: {path}")]
    Missing { phase: u8, path: String },
    /// 读写失败
    #[error("产物读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化 / 反序列化失败
    #[error("产物 JSON 处理失败 ({path}): {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ========== 便捷构造函数 ==========

impl CuratorError {
    /// 创建存储请求失败错误
    pub fn store_request_failed(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CuratorError::Store(StoreError::RequestFailed {
            endpoint: endpoint.into(),
            message: err.to_string(),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(model: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CuratorError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            message: err.to_string(),
        })
    }

    /// 是否为可以软跳过的配置缺失
    pub fn is_missing_identity(&self) -> bool {
        matches!(
            self,
            CuratorError::Config(ConfigError::MissingIdentity { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type CuratorResult<T> = Result<T, CuratorError>;
