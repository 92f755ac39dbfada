//! 批量分类的记录与结果模型

use std::collections::BTreeMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::RecordFields;
use crate::rule::Category;

/// 待分类记录（保留原始JSON对象的全部字段）
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub prompt: String,
    pub response: String,
    pub classification_rule: Option<String>,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            classification_rule: None,
            fields: Map::new(),
        }
    }

    /// 从JSON对象提取 prompt / response，字段缺失或不是字符串时返回原因
    pub fn from_json(value: Value, names: &RecordFields) -> Result<Self, String> {
        let Value::Object(fields) = value else {
            return Err(format!("记录不是JSON对象：{}", json_kind(&value)));
        };
        let prompt = string_field(&fields, &names.prompt)?;
        let response = string_field(&fields, &names.response)?;
        Ok(Self {
            prompt,
            response,
            classification_rule: None,
            fields,
        })
    }

    /// 转回JSON对象：原始字段原样保留，已分类的追加溯源字段
    pub fn into_json(self, names: &RecordFields) -> Value {
        let mut fields = self.fields;
        fields.insert(names.prompt.clone(), Value::String(self.prompt));
        fields.insert(names.response.clone(), Value::String(self.response));
        if let Some(rule) = self.classification_rule {
            fields.insert(names.provenance.clone(), Value::String(rule));
        }
        Value::Object(fields)
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, String> {
    match fields.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("字段 `{}` 不是字符串：{}", name, json_kind(other))),
        None => Err(format!("缺少字段 `{}`", name)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 被跳过的记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// 在输入中的位置
    pub index: usize,
    pub reason: String,
}

/// 批量统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub answered: usize,
    pub not_answered: usize,
    pub disclaimer: usize,
    pub uncategorized: usize,
    pub skipped: usize,
    /// 规则位置 -> 命中次数
    pub rule_hits: BTreeMap<usize, usize>,
}

impl BatchStats {
    /// 未分类占已处理记录的比例
    pub fn uncategorized_ratio(&self) -> f64 {
        let processed = self.total - self.skipped;
        if processed == 0 {
            0.0
        } else {
            self.uncategorized as f64 / processed as f64
        }
    }

    /// 命中最多的规则（次数降序，同次数按规则位置）
    pub fn top_rules(&self, limit: usize) -> Vec<(usize, usize)> {
        let mut hits: Vec<(usize, usize)> = self.rule_hits.iter().map(|(k, v)| (*k, *v)).collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hits.truncate(limit);
        hits
    }
}

/// 分桶后的批量结果（各桶内保持输入顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedBatch {
    pub answered: Vec<Record>,
    pub not_answered: Vec<Record>,
    pub disclaimer: Vec<Record>,
    pub uncategorized: Vec<Record>,
    pub skipped: Vec<SkippedRecord>,
    pub stats: BatchStats,
}

impl CategorizedBatch {
    /// 放入对应分类桶
    pub(crate) fn push(&mut self, category: Option<Category>, rule_index: Option<usize>, record: Record) {
        self.stats.total += 1;
        if let Some(index) = rule_index {
            *self.stats.rule_hits.entry(index).or_insert(0) += 1;
        }
        match category {
            Some(Category::Answered) => {
                self.stats.answered += 1;
                self.answered.push(record);
            }
            Some(Category::NotAnswered) => {
                self.stats.not_answered += 1;
                self.not_answered.push(record);
            }
            Some(Category::Disclaimer) => {
                self.stats.disclaimer += 1;
                self.disclaimer.push(record);
            }
            None => {
                self.stats.uncategorized += 1;
                self.uncategorized.push(record);
            }
        }
    }

    pub(crate) fn skip(&mut self, skipped: SkippedRecord) {
        self.stats.total += 1;
        self.stats.skipped += 1;
        self.skipped.push(skipped);
    }

    /// 按输入顺序合并另一批结果（并发分片合并用）
    pub(crate) fn merge(&mut self, other: CategorizedBatch) {
        self.answered.extend(other.answered);
        self.not_answered.extend(other.not_answered);
        self.disclaimer.extend(other.disclaimer);
        self.uncategorized.extend(other.uncategorized);
        self.skipped.extend(other.skipped);

        self.stats.total += other.stats.total;
        self.stats.answered += other.stats.answered;
        self.stats.not_answered += other.stats.not_answered;
        self.stats.disclaimer += other.stats.disclaimer;
        self.stats.uncategorized += other.stats.uncategorized;
        self.stats.skipped += other.stats.skipped;
        for (index, hits) in other.stats.rule_hits {
            *self.stats.rule_hits.entry(index).or_insert(0) += hits;
        }
    }

    /// 指定分类桶
    pub fn bucket(&self, category: Option<Category>) -> &[Record] {
        match category {
            Some(Category::Answered) => &self.answered,
            Some(Category::NotAnswered) => &self.not_answered,
            Some(Category::Disclaimer) => &self.disclaimer,
            None => &self.uncategorized,
        }
    }
}
