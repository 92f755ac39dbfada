//! 编译模块：解析规则模板、展开占位符、预编译正则片段
pub mod template;
pub mod expander;
pub mod pattern;
pub mod compiler;

pub use self::template::{
    FragmentTemplate, ParsedTemplate, PlaceholderKind, PlaceholderRegistry, Segment, TemplateParser,
};
pub use self::expander::{ExpandedRule, RuleExpander};
pub use self::pattern::{compile_fragment, CompiledFragment, CompiledRule, CompiledRuleTable};
pub use self::compiler::{CompileOptions, RuleCompiler};
