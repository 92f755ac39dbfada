//! 模板展开
//! 用规范化后的prompt替换占位符，prompt文本一律转义，只有占位符自带的锚点/断言是有效正则语法

use super::template::{FragmentTemplate, ParsedTemplate, PlaceholderKind, Segment};

/// 展开后的规则（每个片段都是可直接搜索的正则文本）
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedRule {
    pub fragments: Vec<String>,
}

impl ExpandedRule {
    /// 用分隔符拼回单个模式串
    pub fn pattern(&self, separator: &str) -> String {
        self.fragments.join(separator)
    }
}

/// 规则展开器
#[derive(Debug, Clone)]
pub struct RuleExpander {
    // 已转义的省略号
    escaped_ellipsis: String,
}

impl RuleExpander {
    pub fn new(ellipsis_marker: &str) -> Self {
        Self {
            escaped_ellipsis: regex::escape(ellipsis_marker),
        }
    }

    /// 展开整条规则
    pub fn expand(&self, parsed: &ParsedTemplate, prompt: &str) -> ExpandedRule {
        let escaped_prompt = regex::escape(prompt);
        ExpandedRule {
            fragments: parsed
                .fragments
                .iter()
                .map(|fragment| self.expand_escaped(fragment, &escaped_prompt))
                .collect(),
        }
    }

    /// 展开单个片段
    pub fn expand_fragment(&self, fragment: &FragmentTemplate, prompt: &str) -> String {
        self.expand_escaped(fragment, &regex::escape(prompt))
    }

    fn expand_escaped(&self, fragment: &FragmentTemplate, escaped_prompt: &str) -> String {
        let mut out = String::new();
        for segment in &fragment.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(kind) => self.push_placeholder(&mut out, *kind, escaped_prompt),
            }
        }
        out
    }

    fn push_placeholder(&self, out: &mut String, kind: PlaceholderKind, escaped_prompt: &str) {
        match kind {
            PlaceholderKind::VerbatimPrompt => {
                out.push_str(escaped_prompt);
                self.push_ellipsis_guard(out);
            }
            PlaceholderKind::VerbatimPromptUnguarded => out.push_str(escaped_prompt),
            PlaceholderKind::AnchoredPrompt => {
                out.push('^');
                out.push_str(escaped_prompt);
                self.push_ellipsis_guard(out);
            }
            PlaceholderKind::AnchoredEllipsis => {
                out.push('^');
                out.push_str(&self.escaped_ellipsis);
            }
        }
    }

    fn push_ellipsis_guard(&self, out: &mut String) {
        out.push_str("(?!");
        out.push_str(&self.escaped_ellipsis);
        out.push(')');
    }
}

impl Default for RuleExpander {
    fn default() -> Self {
        Self::new("...")
    }
}
