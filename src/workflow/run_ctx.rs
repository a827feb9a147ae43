//! 运行上下文
//!
//! 封装"我正在处理哪个日期窗口、以哪个角色发布"这一信息

use std::fmt::Display;

use crate::models::DateWindow;

/// 运行上下文
#[derive(Debug, Clone)]
pub struct RunCtx {
    /// 日期窗口
    pub window: DateWindow,

    /// 日期区间标签（产物目录名）
    pub tag: String,

    /// 发布角色
    pub persona: String,

    /// 演练模式
    pub dry_run: bool,
}

impl RunCtx {
    /// 创建新的运行上下文
    pub fn new(window: DateWindow, persona: impl Into<String>, dry_run: bool) -> Self {
        Self {
            tag: window.tag(),
            window,
            persona: persona.into(),
            dry_run,
        }
    }
}

impl Display for RunCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[窗口 {} 角色 {}]", self.tag, self.persona)
    }
}
