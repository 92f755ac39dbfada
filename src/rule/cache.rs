//! 规则快照管理
//! 仅处理规则表的本地序列化（MessagePack）和反序列化

use std::path::Path;
use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::model::RuleTable;
use crate::error::{RcResult, RsCategorizerError};
use crate::config::GlobalConfig;

/// 规则快照管理器
pub struct RuleCacheManager;

impl RuleCacheManager {
    /// 从配置的快照路径加载规则表
    pub async fn load_from_cache(config: &GlobalConfig) -> RcResult<RuleTable> {
        Self::load_from_path(&config.rule_cache_path).await
    }

    /// 将规则表写入配置的快照路径
    pub async fn save_to_cache(config: &GlobalConfig, table: &RuleTable) -> RcResult<()> {
        Self::save_to_path(&config.rule_cache_path, table).await
    }

    /// 从指定路径加载MessagePack规则表
    pub async fn load_from_path(path: &Path) -> RcResult<RuleTable> {
        let cache_data = tokio::fs::read(path).await.map_err(|e| {
            RsCategorizerError::RuleCacheError(format!("读取规则快照 {} 失败：{}", path.display(), e))
        })?;
        let table = Self::decode(&cache_data)?;

        debug!("规则快照反序列化成功，规则数：{}", table.len());
        Ok(table)
    }

    /// 将规则表以MessagePack写入指定路径
    pub async fn save_to_path(path: &Path, table: &RuleTable) -> RcResult<()> {
        let cache_data = Self::encode(table)?;
        debug!("规则表序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        tokio::fs::write(path, cache_data).await.map_err(|e| {
            RsCategorizerError::RuleCacheError(format!("写入规则快照 {} 失败：{}", path.display(), e))
        })?;
        Ok(())
    }

    /// 清除快照
    pub async fn clear_cache(config: &GlobalConfig) -> RcResult<()> {
        let cache_path = &config.rule_cache_path;
        let cache_error = |e: std::io::Error| {
            RsCategorizerError::RuleCacheError(format!("清除规则快照 {} 失败：{}", cache_path.display(), e))
        };
        if tokio::fs::try_exists(cache_path).await.map_err(cache_error)? {
            tokio::fs::remove_file(cache_path).await.map_err(cache_error)?;
        }
        Ok(())
    }

    /// MessagePack序列化（字段名模式，便于字段增删）
    pub fn encode(table: &RuleTable) -> RcResult<Vec<u8>> {
        let mut data = Vec::new();
        table
            .serialize(&mut Serializer::new(&mut data).with_struct_map())
            .map_err(|e| RsCategorizerError::MsgPackError(format!("序列化失败：{}", e)))?;
        Ok(data)
    }

    /// MessagePack反序列化
    pub fn decode(data: &[u8]) -> RcResult<RuleTable> {
        from_slice(data).map_err(|e| RsCategorizerError::MsgPackError(format!("反序列化失败：{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::rule::{Category, RuleTemplate};

    fn sample_table() -> RuleTable {
        RuleTable::new(vec![
            RuleTemplate::new("[anchored-start prompt] + be offensive", Category::Disclaimer),
            RuleTemplate::new("^Hello", Category::Answered).with_note("greeting"),
            RuleTemplate::new("I cannot", Category::NotAnswered),
        ])
    }

    #[test]
    fn test_encode_decode_keeps_order() {
        let table = sample_table();
        let decoded = RuleCacheManager::decode(&RuleCacheManager::encode(&table).unwrap()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            RuleCacheManager::decode(&[0xc1, 0x00]),
            Err(RsCategorizerError::MsgPackError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_cache_error() {
        let path = std::env::temp_dir().join(format!("rscategorizer_missing_{}.mp", std::process::id()));
        let err = RuleCacheManager::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, RsCategorizerError::RuleCacheError(ref msg) if msg.contains("读取规则快照")));
    }

    #[tokio::test]
    async fn test_save_load_clear_cache_file() {
        let path = std::env::temp_dir().join(format!("rscategorizer_cache_{}.mp", std::process::id()));
        let config = ConfigManager::custom().rule_cache_path(path.clone()).build();
        let table = sample_table();

        RuleCacheManager::save_to_cache(&config, &table).await.unwrap();
        let loaded = RuleCacheManager::load_from_cache(&config).await.unwrap();
        assert_eq!(loaded, table);

        RuleCacheManager::clear_cache(&config).await.unwrap();
        assert!(!path.exists());
    }
}
