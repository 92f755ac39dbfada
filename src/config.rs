//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

use crate::compiler::PlaceholderRegistry;
use crate::error::{RcResult, RsCategorizerError};

/// 规则来源
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOrigin {
    Embedded,           // 内置规则（编译期 embed）
    LocalFile(PathBuf), // 本地文件规则（JSON / MessagePack）
}

/// 分类依据（写入记录的规则溯源信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvenanceMode {
    /// 原始模板（未展开）
    #[default]
    Template,
    /// 针对当前prompt展开后的模式串
    Expanded,
}

/// 记录字段名
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    pub prompt: String,
    pub response: String,
    pub provenance: String,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            prompt: "Prompt".to_string(),
            response: "Response".to_string(),
            provenance: "ClassificationRule".to_string(),
        }
    }
}

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 规则来源
    pub rule_origin: RuleOrigin,
    // 规则快照（MessagePack）路径
    pub rule_cache_path: PathBuf,
    // 片段分隔符
    pub fragment_separator: String,
    // prompt中需要去除的前缀短语
    pub strip_prefixes: Vec<String>,
    // prompt中需要去除的结尾标记
    pub strip_suffixes: Vec<String>,
    // 省略号标记（负向先行断言与锚定省略号占位符共用）
    pub ellipsis_marker: String,
    // 占位符注册表
    pub placeholders: PlaceholderRegistry,
    // 启动校验用的代表性prompt
    pub probe_prompt: String,
    // 记录字段名
    pub record_fields: RecordFields,
    // 溯源信息形式
    pub provenance: ProvenanceMode,
    // 批量并发度
    pub worker_count: usize,
    // 未分类占比告警阈值
    pub uncategorized_warn_ratio: f64,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rule_origin: if cfg!(feature = "embedded-rules") {
                RuleOrigin::Embedded
            } else {
                RuleOrigin::LocalFile(PathBuf::from("rules.json"))
            },
            rule_cache_path: PathBuf::from("rscategorizer_rules.mp"),
            fragment_separator: " + ".to_string(),
            strip_prefixes: vec!["Complete the sentence:".to_string()],
            strip_suffixes: vec!["...".to_string()],
            ellipsis_marker: "...".to_string(),
            placeholders: PlaceholderRegistry::default(),
            probe_prompt: "Probe (a.k.a. [test] prompt) walked into a bar? $1 + 2 * 3 ^ {x} | y\\z".to_string(),
            record_fields: RecordFields::default(),
            provenance: ProvenanceMode::default(),
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            uncategorized_warn_ratio: 0.25,
            verbose: false,
        }
    }
}

impl GlobalConfig {
    /// 校验配置项
    pub fn validate(&self) -> RcResult<()> {
        if self.fragment_separator.trim().is_empty() {
            return Err(RsCategorizerError::InvalidConfig("片段分隔符不能为空白".to_string()));
        }
        if self.ellipsis_marker.is_empty() {
            return Err(RsCategorizerError::InvalidConfig("省略号标记不能为空".to_string()));
        }
        if self.worker_count == 0 {
            return Err(RsCategorizerError::InvalidConfig("并发度必须大于0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.uncategorized_warn_ratio) {
            return Err(RsCategorizerError::InvalidConfig(format!(
                "未分类告警阈值必须在[0, 1]内：{}",
                self.uncategorized_warn_ratio
            )));
        }
        if let Some(token) = self
            .placeholders
            .tokens()
            .find(|token| token.contains(self.fragment_separator.as_str()))
        {
            return Err(RsCategorizerError::InvalidConfig(format!(
                "占位符 `{}` 包含片段分隔符 `{}`",
                token, self.fragment_separator
            )));
        }
        Ok(())
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule_origin(mut self, origin: RuleOrigin) -> Self {
        self.config.rule_origin = origin;
        self
    }

    pub fn rule_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rule_origin = RuleOrigin::LocalFile(path.into());
        self
    }

    pub fn rule_cache_path(mut self, path: PathBuf) -> Self {
        self.config.rule_cache_path = path;
        self
    }

    pub fn fragment_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.fragment_separator = separator.into();
        self
    }

    pub fn strip_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.config.strip_prefixes = prefixes;
        self
    }

    pub fn strip_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.config.strip_suffixes = suffixes;
        self
    }

    pub fn ellipsis_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.ellipsis_marker = marker.into();
        self
    }

    pub fn placeholders(mut self, registry: PlaceholderRegistry) -> Self {
        self.config.placeholders = registry;
        self
    }

    pub fn probe_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.probe_prompt = prompt.into();
        self
    }

    pub fn record_fields(mut self, fields: RecordFields) -> Self {
        self.config.record_fields = fields;
        self
    }

    pub fn provenance(mut self, mode: ProvenanceMode) -> Self {
        self.config.provenance = mode;
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.config.worker_count = workers;
        self
    }

    pub fn uncategorized_warn_ratio(mut self, ratio: f64) -> Self {
        self.config.uncategorized_warn_ratio = ratio;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
