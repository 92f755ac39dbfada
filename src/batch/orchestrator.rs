//! 批量分类编排
//! 每条记录独立分类，互不共享可变状态；并发版本按连续分片扇出，最后按输入顺序合并

use std::collections::HashMap;
use std::sync::Arc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::record::{CategorizedBatch, Record, SkippedRecord};
use crate::categorizer::{PromptScope, ResponseCategorizer};
use crate::config::{GlobalConfig, RecordFields};
use crate::error::{RcResult, RsCategorizerError};
use crate::rule::{category_label, Category};

/// 批量分类编排器
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    categorizer: Arc<ResponseCategorizer>,
    fields: RecordFields,
    worker_count: usize,
    uncategorized_warn_ratio: f64,
    verbose: bool,
}

impl BatchOrchestrator {
    pub fn new(categorizer: Arc<ResponseCategorizer>, config: &GlobalConfig) -> Self {
        Self {
            categorizer,
            fields: config.record_fields.clone(),
            worker_count: config.worker_count.max(1),
            uncategorized_warn_ratio: config.uncategorized_warn_ratio,
            verbose: config.verbose,
        }
    }

    /// 按配置加载规则并构建编排器
    pub async fn from_config(config: &GlobalConfig) -> RcResult<Self> {
        let categorizer = ResponseCategorizer::new(config.clone()).await?;
        Ok(Self::new(Arc::new(categorizer), config))
    }

    pub fn categorizer(&self) -> &ResponseCategorizer {
        &self.categorizer
    }

    /// 顺序分类
    pub fn categorize(&self, records: Vec<Value>) -> CategorizedBatch {
        let batch = self.categorize_chunk(0, records);
        self.report(&batch);
        batch
    }

    /// 并发分类（结果与顺序版本一致）
    pub async fn categorize_parallel(&self, records: Vec<Value>) -> RcResult<CategorizedBatch> {
        let total = records.len();
        let chunk_size = total.div_ceil(self.worker_count).max(1);
        debug!("并发分类开始：记录{}条，分片大小{}，并发度{}", total, chunk_size, self.worker_count);

        let mut handles = Vec::with_capacity(self.worker_count);
        let mut records = records.into_iter();
        let mut offset = 0;
        while offset < total {
            let chunk: Vec<Value> = records.by_ref().take(chunk_size).collect();
            let chunk_len = chunk.len();
            let worker = self.clone();
            handles.push(tokio::task::spawn_blocking(move || worker.categorize_chunk(offset, chunk)));
            offset += chunk_len;
        }

        let mut batch = CategorizedBatch::default();
        for handle in handles {
            let part = handle
                .await
                .map_err(|e| RsCategorizerError::AsyncTaskError(format!("分类任务失败：{}", e)))?;
            batch.merge(part);
        }

        self.report(&batch);
        Ok(batch)
    }

    /// 处理一段连续记录，`offset` 为该段在输入中的起始位置
    fn categorize_chunk(&self, offset: usize, records: Vec<Value>) -> CategorizedBatch {
        let mut batch = CategorizedBatch::default();
        // 同一prompt的记录共用一个作用域，prompt相关片段只编译一次
        let mut scopes: HashMap<String, PromptScope<'_>> = HashMap::new();

        for (i, value) in records.into_iter().enumerate() {
            let index = offset + i;
            let mut record = match Record::from_json(value, &self.fields) {
                Ok(record) => record,
                Err(reason) => {
                    warn!("跳过记录#{}：{}", index, reason);
                    batch.skip(SkippedRecord { index, reason });
                    continue;
                }
            };

            let scope = scopes
                .entry(record.prompt.clone())
                .or_insert_with(|| self.categorizer.scope(&record.prompt));
            let result = match scope.categorize(&record.response) {
                Ok(result) => result,
                Err(e) => {
                    warn!("跳过记录#{}：{}", index, e);
                    batch.skip(SkippedRecord { index, reason: e.to_string() });
                    continue;
                }
            };

            record.classification_rule = self.categorizer.provenance_text(&result, &record.prompt);
            batch.push(result.category, result.rule_index, record);
        }

        batch
    }

    /// 输出批量统计；未分类占比过高说明规则表需要扩充
    fn report(&self, batch: &CategorizedBatch) {
        let stats = &batch.stats;
        info!(
            "📊 分类完成：共{}条，{} {}，{} {}，{} {}，{} {}，跳过{}",
            stats.total,
            category_label(Some(Category::Answered)),
            stats.answered,
            category_label(Some(Category::NotAnswered)),
            stats.not_answered,
            category_label(Some(Category::Disclaimer)),
            stats.disclaimer,
            category_label(None),
            stats.uncategorized,
            stats.skipped
        );
        if self.verbose {
            for (rule_index, hits) in stats.top_rules(10) {
                let template = self
                    .categorizer
                    .rules()
                    .get(rule_index)
                    .map(|r| r.template.template.as_str())
                    .unwrap_or_default();
                info!("  规则#{}命中{}次：{}", rule_index, hits, template);
            }
        }

        let ratio = stats.uncategorized_ratio();
        if ratio > self.uncategorized_warn_ratio {
            warn!(
                "未分类占比{:.1}%超过阈值{:.1}%，规则表可能需要扩充",
                ratio * 100.0,
                self.uncategorized_warn_ratio * 100.0
            );
        }
        if stats.skipped > 0 {
            warn!("{}条记录格式错误被跳过", stats.skipped);
        }
    }
}
