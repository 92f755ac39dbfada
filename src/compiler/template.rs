//! 规则模板解析
//! 把原始模板拆成有序片段，并识别其中的占位符；未知占位符直接报错，不作为字面量透传

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RcResult, RsCategorizerError};

/// 占位符类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// 转义后的prompt + 拒绝紧随省略号的负向先行断言
    VerbatimPrompt,
    /// 转义后的prompt，不加断言
    VerbatimPromptUnguarded,
    /// `^` + 转义后的prompt + 负向先行断言
    AnchoredPrompt,
    /// `^` + 转义后的省略号，与prompt无关
    AnchoredEllipsis,
}

impl PlaceholderKind {
    /// 展开结果是否依赖prompt
    pub fn depends_on_prompt(&self) -> bool {
        !matches!(self, PlaceholderKind::AnchoredEllipsis)
    }
}

/// 占位符注册表：写法 -> 类型
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRegistry {
    // 按写法长度降序，保证长写法优先匹配
    entries: Vec<(String, PlaceholderKind)>,
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self::empty()
            .with_alias("[verbatim prompt]", PlaceholderKind::VerbatimPrompt)
            .with_alias("[verbatim prompt, no further stripping]", PlaceholderKind::VerbatimPromptUnguarded)
            .with_alias("[anchored-start prompt]", PlaceholderKind::AnchoredPrompt)
            .with_alias("[anchored-start ellipsis marker]", PlaceholderKind::AnchoredEllipsis)
    }
}

impl PlaceholderRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// 注册一个写法（同名写法覆盖旧类型）
    pub fn with_alias(mut self, token: impl Into<String>, kind: PlaceholderKind) -> Self {
        let token = token.into();
        self.entries.retain(|(existing, _)| *existing != token);
        self.entries.push((token, kind));
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// 所有已注册写法
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(token, _)| token.as_str())
    }

    /// 方括号片段是否像写错的占位符：忽略大小写、空白与标点后与某个写法或其中的单词相同
    fn is_near_miss(&self, bracketed: &str) -> bool {
        let folded = fold_token(bracketed);
        if folded.is_empty() {
            return false;
        }
        self.entries.iter().any(|(token, _)| {
            fold_token(token) == folded
                || token
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| word.len() >= 4 && word.eq_ignore_ascii_case(&folded))
        })
    }

    /// 在输入开头匹配已注册占位符
    fn match_prefix(&self, input: &str) -> Option<(&str, PlaceholderKind)> {
        self.entries
            .iter()
            .find(|(token, _)| input.starts_with(token.as_str()))
            .map(|(token, kind)| (token.as_str(), *kind))
    }
}

/// 片段中的一段
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// 原样保留的正则文本
    Literal(String),
    Placeholder(PlaceholderKind),
}

/// 单个片段的模板
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FragmentTemplate {
    pub segments: Vec<Segment>,
}

impl FragmentTemplate {
    /// 是否与prompt无关（可在加载期一次性编译）
    pub fn is_static(&self) -> bool {
        !self.segments.iter().any(|segment| match segment {
            Segment::Placeholder(kind) => kind.depends_on_prompt(),
            Segment::Literal(_) => false,
        })
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }
}

/// 解析后的模板
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTemplate {
    pub fragments: Vec<FragmentTemplate>,
}

impl ParsedTemplate {
    /// 是否存在依赖prompt的片段
    pub fn depends_on_prompt(&self) -> bool {
        self.fragments.iter().any(|fragment| !fragment.is_static())
    }
}

/// 形似占位符的方括号片段：字母开头，内部有空白且空白后还有单词
static PLACEHOLDER_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[[A-Za-z][^\[\]\\]*\s[A-Za-z.][^\[\]\\]*\]").unwrap()
});

/// 模板解析器
pub struct TemplateParser<'a> {
    registry: &'a PlaceholderRegistry,
    separator: &'a str,
}

impl<'a> TemplateParser<'a> {
    pub fn new(registry: &'a PlaceholderRegistry, separator: &'a str) -> Self {
        Self { registry, separator }
    }

    /// 解析模板，`index` 仅用于错误定位
    pub fn parse(&self, index: usize, template: &str) -> RcResult<ParsedTemplate> {
        let fragments = template
            .split(self.separator)
            .map(|raw| self.parse_fragment(index, template, raw.trim()))
            .collect::<RcResult<Vec<_>>>()?;

        Ok(ParsedTemplate { fragments })
    }

    fn parse_fragment(&self, index: usize, template: &str, raw: &str) -> RcResult<FragmentTemplate> {
        let mut fragment = FragmentTemplate::default();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < raw.len() {
            let rest = &raw[pos..];
            let Some(ch) = rest.chars().next() else {
                break;
            };

            match ch {
                // 转义字符连同被转义的字符一起保留
                '\\' => {
                    let escaped_len = rest[1..].chars().next().map_or(0, char::len_utf8);
                    literal.push_str(&rest[..1 + escaped_len]);
                    pos += 1 + escaped_len;
                }
                '[' => {
                    if let Some((token, kind)) = self.registry.match_prefix(rest) {
                        fragment.push_literal(&literal);
                        literal.clear();
                        fragment.segments.push(Segment::Placeholder(kind));
                        pos += token.len();
                        continue;
                    }
                    if let Some(m) = PLACEHOLDER_LIKE.find(rest) {
                        return Err(Self::unknown(index, template, m.as_str()));
                    }
                    match class_end(rest) {
                        Some(end) => {
                            let class = &rest[..end];
                            if self.registry.is_near_miss(class) {
                                return Err(Self::unknown(index, template, class));
                            }
                            // 普通字符集（如 [a-zA-Z]）原样保留，其中的 `$` 不改写
                            literal.push_str(class);
                            pos += end;
                        }
                        None => {
                            literal.push('[');
                            pos += 1;
                        }
                    }
                }
                '$' => {
                    literal.push_str(END_OF_TEXT);
                    pos += 1;
                }
                _ => {
                    literal.push(ch);
                    pos += ch.len_utf8();
                }
            }
        }

        fragment.push_literal(&literal);
        Ok(fragment)
    }

    fn unknown(index: usize, template: &str, token: &str) -> RsCategorizerError {
        RsCategorizerError::UnknownPlaceholder {
            index,
            template: template.to_string(),
            token: token.to_string(),
        }
    }
}

/// `$` 的替换：文本末尾，或末尾单个换行之前
pub(crate) const END_OF_TEXT: &str = r"(?=\n?\z)";

/// 字符集 `[...]` 的结束位置（不含则返回 None），`[]...]` 与 `[^]...]` 中的首个 `]` 视为字面量
fn class_end(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let escaped_len = input[i + 1..].chars().next().map_or(0, char::len_utf8);
                i += 1 + escaped_len;
            }
            b']' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// 只保留字母数字并转小写，用于比较占位符写法
fn fold_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
