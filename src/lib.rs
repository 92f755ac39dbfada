//! rscategorizer - 基于有序规则表的大模型回答分类引擎
//!
//! 规则表按顺序逐条匹配，第一条命中的规则决定分类（Answered / Not Answered / Disclaimer），
//! 全部未命中则为 Uncategorized。

// 导出全局错误类型
pub use self::error::{RcResult, RsCategorizerError, RuleFailure};

// 导出配置模块
pub use self::config::{
    ConfigManager, CustomConfigBuilder, GlobalConfig, ProvenanceMode, RecordFields, RuleOrigin,
};

// 导出规则模块核心接口
pub use self::rule::{
    category_label, Category, RuleCacheManager, RuleFileType, RuleLoader, RuleTable, RuleTemplate,
    UNCATEGORIZED_LABEL,
};

// 导出编译模块核心接口
pub use self::compiler::{
    CompiledRuleTable, ParsedTemplate, PlaceholderKind, PlaceholderRegistry, RuleCompiler, RuleExpander,
    TemplateParser,
};

// 导出分类模块核心接口
pub use self::categorizer::{
    categorize_response, get_global_categorizer, init_categorizer, init_categorizer_with_config,
    MatchResult, PromptScope, ResponseCategorizer, SequentialMatcher,
};

// 导出批量处理接口
pub use self::batch::{
    read_records, write_partitioned, BatchOrchestrator, BatchStats, CategorizedBatch, Record,
    SkippedRecord,
};

// 导出工具模块核心接口
pub use self::utils::{preview_response, PromptNormalizer};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod categorizer;
pub mod batch;
pub mod utils;
