//! 分类模块：顺序片段匹配 + 首条命中规则分类
pub mod matcher;
pub mod categorizer;
pub mod global;

// 导出核心接口
pub use self::matcher::{FragmentCursor, SequentialMatcher};
pub use self::categorizer::{MatchResult, PromptScope, ResponseCategorizer};
pub use self::global::{
    categorize_response, get_global_categorizer, init_categorizer, init_categorizer_with_config,
};
