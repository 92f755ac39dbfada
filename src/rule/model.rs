//! 规则数据模型定义
//! 仅存储规则数据，无任何业务逻辑，支持序列化/反序列化

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::RsCategorizerError;

/// 回答分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Answered,
    NotAnswered,
    Disclaimer,
}

impl Category {
    /// 规范标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Answered => "Answered",
            Category::NotAnswered => "Not Answered",
            Category::Disclaimer => "Disclaimer",
        }
    }

    /// 所有分类（固定顺序）
    pub fn all() -> [Category; 3] {
        [Category::Answered, Category::NotAnswered, Category::Disclaimer]
    }
}

/// 未分类标签
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// 可选分类的显示标签（None 即未分类）
pub fn category_label(category: Option<Category>) -> &'static str {
    category.map_or(UNCATEGORIZED_LABEL, |c| c.as_str())
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RsCategorizerError;

    // 宽松解析：忽略大小写、空格、下划线与连字符
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "answered" => Ok(Category::Answered),
            "notanswered" => Ok(Category::NotAnswered),
            "disclaimer" => Ok(Category::Disclaimer),
            _ => Err(RsCategorizerError::RuleParseError(format!("未知分类：{}", s))),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = RsCategorizerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// 单条规则模板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub template: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RuleTemplate {
    pub fn new(template: impl Into<String>, category: Category) -> Self {
        Self {
            template: template.into(),
            category,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for RuleTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.template, self.category)
    }
}

/// 规则文件中的条目：对象或 [模板, 分类] 二元组
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawRuleEntry {
    Pair(String, String),
    Object {
        template: String,
        category: String,
        #[serde(default)]
        note: Option<String>,
    },
}

impl RawRuleEntry {
    /// 转换为规则模板，`index` 用于错误定位
    pub(crate) fn into_template(self, index: usize) -> Result<RuleTemplate, RsCategorizerError> {
        let (template, category, note) = match self {
            RawRuleEntry::Pair(template, category) => (template, category, None),
            RawRuleEntry::Object { template, category, note } => (template, category, note),
        };
        let category = category.parse::<Category>().map_err(|_| {
            RsCategorizerError::RuleParseError(format!("规则#{}分类无效：{}", index, category))
        })?;
        Ok(RuleTemplate { template, category, note })
    }
}

/// 有序规则表（位置即优先级）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<RuleTemplate>,
}

impl RuleTable {
    pub fn new(rules: Vec<RuleTemplate>) -> Self {
        Self { rules }
    }

    /// 由 (模板, 分类) 序列构建
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        Self {
            rules: pairs
                .into_iter()
                .map(|(template, category)| RuleTemplate::new(template, category))
                .collect(),
        }
    }

    /// 从JSON文本解析
    pub fn from_json_str(json: &str) -> Result<Self, RsCategorizerError> {
        let entries: Vec<RawRuleEntry> = serde_json::from_str(json)?;
        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_template(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleTemplate> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RuleTemplate> {
        self.rules.get(index)
    }

    pub fn push(&mut self, rule: RuleTemplate) {
        self.rules.push(rule);
    }

    /// 各分类规则数
    pub fn count_by_category(&self, category: Category) -> usize {
        self.rules.iter().filter(|rule| rule.category == category).count()
    }
}

impl FromIterator<RuleTemplate> for RuleTable {
    fn from_iter<T: IntoIterator<Item = RuleTemplate>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lenient_parse() {
        for label in ["Answered", "answered", " ANSWERED "] {
            assert_eq!(label.parse::<Category>().unwrap(), Category::Answered);
        }
        for label in ["Not Answered", "NotAnswered", "not_answered", "not-answered"] {
            assert_eq!(label.parse::<Category>().unwrap(), Category::NotAnswered);
        }
        assert_eq!("Disclaimer".parse::<Category>().unwrap(), Category::Disclaimer);
        assert!("Maybe".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_canonical_label() {
        let json = serde_json::to_string(&Category::NotAnswered).unwrap();
        assert_eq!(json, "\"Not Answered\"");
        assert_eq!(category_label(None), "Uncategorized");
    }

    #[test]
    fn test_table_from_json_both_shapes() {
        let json = r#"[
            {"template": "^Hello", "category": "Answered"},
            ["I cannot", "NotAnswered"],
            {"template": "^It's important + note", "category": "Disclaimer", "note": "leading caveat"}
        ]"#;
        let table = RuleTable::from_json_str(json).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(1), Some(&RuleTemplate::new("I cannot", Category::NotAnswered)));
        assert_eq!(table.get(2).and_then(|r| r.note.as_deref()), Some("leading caveat"));
        assert_eq!(table.count_by_category(Category::Answered), 1);
    }

    #[test]
    fn test_table_from_json_bad_category_reports_index() {
        let json = r#"[["^a", "Answered"], ["^b", "Sometimes"]]"#;
        let err = RuleTable::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("#1"));
    }
}
