//! 规则模块：负责规则表的加载、快照、数据模型定义
pub mod model;
pub mod cache;
pub mod loader;

// 导出核心接口
pub use self::model::{category_label, Category, RuleTable, RuleTemplate, UNCATEGORIZED_LABEL};
pub use self::loader::{RuleFileType, RuleLoader};
pub use self::cache::RuleCacheManager;
