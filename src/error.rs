//! 全局错误类型定义

use std::fmt;
use std::io::Error as IoError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// 单条规则的校验失败信息
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    /// 规则在规则表中的位置（从0开始）
    pub index: usize,
    /// 原始模板
    pub template: String,
    /// 失败原因
    pub reason: String,
}

impl fmt::Display for RuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} `{}`：{}", self.index, self.template, self.reason)
    }
}

/// 把失败列表拼成一行，最多展示前5条
fn describe_failures(failures: &[RuleFailure]) -> String {
    const MAX_SHOWN: usize = 5;
    let mut shown: Vec<String> = failures.iter().take(MAX_SHOWN).map(|f| f.to_string()).collect();
    if failures.len() > MAX_SHOWN {
        shown.push(format!("…（共{}条）", failures.len()));
    }
    shown.join("；")
}

#[derive(Error, Debug)]
pub enum RsCategorizerError {
    // 规则相关错误
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),
    #[error("规则解析失败：{0}")]
    RuleParseError(String),
    #[error("规则缓存失败：{0}")]
    RuleCacheError(String),
    #[error("规则#{index}包含未知占位符 `{token}`：{template}")]
    UnknownPlaceholder {
        index: usize,
        template: String,
        token: String,
    },
    #[error("规则表校验失败，{}条规则无效：{}", .0.len(), describe_failures(.0))]
    InvalidRuleTable(Vec<RuleFailure>),

    // 编译/匹配相关错误
    #[error("正则编译失败 `{pattern}`：{message}")]
    RegexCompileError { pattern: String, message: String },
    #[error("正则匹配执行失败：{0}")]
    MatchError(String),

    // 分类相关错误
    #[error("分类器未初始化")]
    CategorizerNotInitialized,
    #[error("无效记录：{0}")]
    InvalidRecord(String),
    #[error("无效配置：{0}")]
    InvalidConfig(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
    #[error("MessagePack序列化/反序列化失败：{0}")]
    MsgPackError(String),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("异步任务执行失败：{0}")]
    AsyncTaskError(String),
}

impl RsCategorizerError {
    /// 由正则编译错误构造（fancy-regex）
    pub fn regex_compile(pattern: &str, err: impl fmt::Display) -> Self {
        Self::RegexCompileError {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}

// 全局Result类型
pub type RcResult<T> = Result<T, RsCategorizerError>;
