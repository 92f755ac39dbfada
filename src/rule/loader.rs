//! 规则加载管理器
//! 负责从内置数据或本地文件（JSON / MessagePack）加载规则表

use std::path::Path;
use tracing::{debug, warn};

use super::cache::RuleCacheManager;
use super::model::{Category, RuleTable};
use crate::config::{GlobalConfig, RuleOrigin};
use crate::error::{RcResult, RsCategorizerError};

/// 内置默认规则表
#[cfg(feature = "embedded-rules")]
static EMBEDDED_RULES_JSON: &str = include_str!("../../data/default_rules.json");

/// 规则文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFileType {
    /// JSON 数组
    Json,
    /// RuleCacheManager 生成的快照
    MessagePack,
}

impl RuleFileType {
    /// 按扩展名判断文件类型（默认JSON）
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("mp") | Some("msgpack") => RuleFileType::MessagePack,
            _ => RuleFileType::Json,
        }
    }
}

/// 规则加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 按配置加载规则表
    pub async fn load(config: &GlobalConfig) -> RcResult<RuleTable> {
        let table = match &config.rule_origin {
            RuleOrigin::Embedded => Self::load_embedded()?,
            RuleOrigin::LocalFile(path) => Self::load_file(path).await?,
        };

        Self::debug_count_rules(&table);
        Ok(table)
    }

    /// 加载内置规则表
    pub fn load_embedded() -> RcResult<RuleTable> {
        #[cfg(feature = "embedded-rules")]
        {
            RuleTable::from_json_str(EMBEDDED_RULES_JSON)
                .map_err(|e| RsCategorizerError::RuleLoadError(format!("内置规则表解析失败：{}", e)))
        }
        #[cfg(not(feature = "embedded-rules"))]
        {
            Err(RsCategorizerError::RuleLoadError(
                "未启用 embedded-rules 特性，无内置规则表".to_string(),
            ))
        }
    }

    /// 从本地文件加载（按扩展名区分格式）
    pub async fn load_file(path: &Path) -> RcResult<RuleTable> {
        let file_type = RuleFileType::from_path(path);
        debug!("开始加载规则文件：{}（{:?}）", path.display(), file_type);

        let table = match file_type {
            RuleFileType::Json => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    RsCategorizerError::RuleLoadError(format!("读取规则文件 {} 失败：{}", path.display(), e))
                })?;
                RuleTable::from_json_str(&content)?
            }
            RuleFileType::MessagePack => RuleCacheManager::load_from_path(path).await?,
        };

        if table.is_empty() {
            warn!("规则文件 {} 不包含任何规则", path.display());
        }
        Ok(table)
    }

    fn debug_count_rules(table: &RuleTable) {
        debug!("===== 规则表统计 =====");
        debug!("  规则总数：{}", table.len());
        for category in Category::all() {
            debug!("  {}：{}", category, table.count_by_category(category));
        }
    }
}
