//! 编译后模式模型
//! 规则表编译后的结构

use std::sync::Arc;
use fancy_regex::Regex;

use super::template::{FragmentTemplate, ParsedTemplate};
use crate::error::{RcResult, RsCategorizerError};
use crate::rule::RuleTemplate;

/// 编译单个片段（大小写不敏感）
pub fn compile_fragment(fragment: &str) -> RcResult<Regex> {
    Regex::new(&format!("(?i){}", fragment))
        .map_err(|e| RsCategorizerError::regex_compile(fragment, e))
}

/// 编译后的片段
#[derive(Debug, Clone)]
pub enum CompiledFragment {
    /// 与prompt无关，加载期已编译
    Static(Arc<Regex>),
    /// 依赖prompt，按prompt展开后再编译
    Dynamic(FragmentTemplate),
}

impl CompiledFragment {
    pub fn is_static(&self) -> bool {
        matches!(self, CompiledFragment::Static(_))
    }
}

/// 编译后的单条规则
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub index: usize,
    pub template: Arc<RuleTemplate>,
    pub parsed: ParsedTemplate,
    pub fragments: Vec<CompiledFragment>,
}

impl CompiledRule {
    /// 是否存在依赖prompt的片段
    pub fn depends_on_prompt(&self) -> bool {
        self.fragments.iter().any(|fragment| !fragment.is_static())
    }
}

/// 编译后的规则表（保持原始顺序）
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleTable {
    pub rules: Vec<CompiledRule>,
}

impl CompiledRuleTable {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CompiledRule> {
        self.rules.get(index)
    }
}
