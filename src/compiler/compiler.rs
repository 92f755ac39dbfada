//! 规则编译器核心
//! 负责解析模板、预编译与prompt无关的片段，并用代表性prompt校验依赖prompt的片段

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::expander::RuleExpander;
use super::pattern::{compile_fragment, CompiledFragment, CompiledRule, CompiledRuleTable};
use super::template::{PlaceholderRegistry, TemplateParser};
use crate::error::{RcResult, RsCategorizerError, RuleFailure};
use crate::rule::{RuleTable, RuleTemplate};

/// 编译选项
#[derive(Debug, Clone)]
pub struct CompileOptions<'a> {
    pub registry: &'a PlaceholderRegistry,
    pub separator: &'a str,
    pub expander: &'a RuleExpander,
    pub probe_prompt: &'a str,
}

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则表，任何一条规则无效都会导致整体失败
    pub fn compile(table: &RuleTable, options: &CompileOptions<'_>) -> RcResult<CompiledRuleTable> {
        let start = Instant::now();
        let parser = TemplateParser::new(options.registry, options.separator);
        let mut stats = CompileStats::default();
        let mut failures = Vec::new();
        let mut rules = Vec::with_capacity(table.len());

        for (index, template) in table.iter().enumerate() {
            match Self::compile_rule(&parser, options, index, template, &mut stats) {
                Ok(rule) => rules.push(rule),
                Err(e) => failures.push(RuleFailure {
                    index,
                    template: template.template.clone(),
                    reason: Self::failure_reason(e),
                }),
            }
        }

        if !failures.is_empty() {
            return Err(RsCategorizerError::InvalidRuleTable(failures));
        }

        Self::warn_duplicates(table);
        if table.is_empty() {
            warn!("规则表为空，所有记录都将归为未分类");
        }

        debug!("✅ 规则编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：规则{}条、静态片段{}个、依赖prompt片段{}个",
            rules.len(),
            stats.static_fragments,
            stats.dynamic_fragments
        );

        Ok(CompiledRuleTable { rules })
    }

    /// 编译单条规则
    fn compile_rule(
        parser: &TemplateParser<'_>,
        options: &CompileOptions<'_>,
        index: usize,
        template: &RuleTemplate,
        stats: &mut CompileStats,
    ) -> RcResult<CompiledRule> {
        let parsed = parser.parse(index, &template.template)?;
        let mut fragments = Vec::with_capacity(parsed.fragments.len());

        for fragment in &parsed.fragments {
            if fragment.is_static() {
                let text = options.expander.expand_fragment(fragment, "");
                fragments.push(CompiledFragment::Static(Arc::new(compile_fragment(&text)?)));
                stats.static_fragments += 1;
            } else {
                // 用代表性prompt试编译，确保运行期展开不会出错
                let text = options.expander.expand_fragment(fragment, options.probe_prompt);
                compile_fragment(&text)?;
                fragments.push(CompiledFragment::Dynamic(fragment.clone()));
                stats.dynamic_fragments += 1;
            }
        }

        Ok(CompiledRule {
            index,
            template: Arc::new(template.clone()),
            parsed,
            fragments,
        })
    }

    fn failure_reason(err: RsCategorizerError) -> String {
        match err {
            RsCategorizerError::UnknownPlaceholder { token, .. } => format!("未知占位符 `{}`", token),
            other => other.to_string(),
        }
    }

    /// 重复模板：后出现的副本永远不会命中
    fn warn_duplicates(table: &RuleTable) {
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        for (index, rule) in table.iter().enumerate() {
            if let Some(first) = first_seen.get(rule.template.as_str()) {
                warn!(
                    "规则#{}与规则#{}模板重复，将永远不会命中：{}",
                    index, first, rule.template
                );
            } else {
                first_seen.insert(rule.template.as_str(), index);
            }
        }
    }
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    static_fragments: usize,
    dynamic_fragments: usize,
}
