//! LLM JSON 响应处理
//!
//! 两个阶段共用：去掉代码块包裹、解析 JSON 数组、解析失败时整批重问一次

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::ChatModel;
use crate::error::{CuratorResult, LlmError};
use crate::utils::logging::truncate_text;

/// 解析失败后的最大尝试次数（首次 + 重问一次）
pub const MAX_PARSE_ATTEMPTS: u32 = 2;

/// 去掉 ```json ... ``` 包裹
pub fn strip_code_fence(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// 把响应解析为 JSON 数组
///
/// 也接受只包含一个数组字段的对象（如 `{"results": [...]}`）
pub fn parse_json_array<T: DeserializeOwned>(response: &str) -> Result<Vec<T>, String> {
    let cleaned = strip_code_fence(response);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;

    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => items,
                _ => return Err("响应是对象，但不是只包含一个数组字段".to_string()),
            }
        }
        other => return Err(format!("期望 JSON 数组，实际为: {}", other)),
    };

    serde_json::from_value(Value::Array(array)).map_err(|e| e.to_string())
}

/// 调用模型并解析 JSON 数组；解析失败时整批重问一次
///
/// # 参数
/// - `stage`: 阶段名（写入错误信息）
///
/// # 返回
/// 第二次仍解析失败时返回 `LlmError::Parse`；API 调用失败直接向上传播
pub async fn ask_json_array<T: DeserializeOwned>(
    model: &dyn ChatModel,
    stage: &'static str,
    system_message: &str,
    user_message: &str,
) -> CuratorResult<Vec<T>> {
    let mut last_error = String::new();

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        let response = model.complete(system_message, user_message).await?;
        debug!("[{}] 响应长度: {} 字符", stage, response.len());

        match parse_json_array(&response) {
            Ok(items) => return Ok(items),
            Err(e) => {
                warn!(
                    "[{}] ⚠️ 无法解析 LLM 响应 (尝试 {}/{}): {} | 响应: {}",
                    stage,
                    attempt,
                    MAX_PARSE_ATTEMPTS,
                    e,
                    truncate_text(&response, 200)
                );
                last_error = e;
            }
        }
    }

    Err(LlmError::Parse {
        stage,
        attempts: MAX_PARSE_ATTEMPTS,
        message: last_error,
    }
    .into())
}
