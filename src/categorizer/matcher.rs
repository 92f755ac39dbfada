//! 顺序片段匹配器
//! 规则的所有片段必须在回答中按顺序出现，后一个片段只在前一个匹配结束位置之后搜索

use fancy_regex::Regex;

use crate::compiler::compile_fragment;
use crate::error::{RcResult, RsCategorizerError};

/// 回答文本上的搜索游标
#[derive(Debug, Clone, Copy)]
pub struct FragmentCursor<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> FragmentCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    /// 当前位置（相对完整回答的字节偏移）
    pub fn position(&self) -> usize {
        self.position
    }

    /// 在剩余窗口中搜索片段，命中则把游标推进到匹配结束位置
    ///
    /// `^` 锚定的是当前窗口起点；只取最左匹配，不回溯到更早的候选。
    pub fn advance(&mut self, fragment: &Regex) -> RcResult<bool> {
        let window = &self.text[self.position..];
        match fragment
            .find(window)
            .map_err(|e| RsCategorizerError::MatchError(format!("`{}`：{}", fragment.as_str(), e)))?
        {
            Some(m) => {
                self.position += m.end();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// 顺序片段匹配器
pub struct SequentialMatcher;

impl SequentialMatcher {
    /// 所有片段按序命中返回 true，任何一个未命中立即返回 false
    pub fn match_all<'r, I>(fragments: I, response: &str) -> RcResult<bool>
    where
        I: IntoIterator<Item = &'r Regex>,
    {
        let mut cursor = FragmentCursor::new(response);
        for fragment in fragments {
            if !cursor.advance(fragment)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 直接匹配展开后的模式串（按分隔符拆分并逐个编译）
    pub fn match_pattern(pattern: &str, separator: &str, response: &str) -> RcResult<bool> {
        let fragments = pattern
            .split(separator)
            .map(|part| compile_fragment(part.trim()))
            .collect::<RcResult<Vec<_>>>()?;
        Self::match_all(&fragments, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, response: &str) -> bool {
        SequentialMatcher::match_pattern(pattern, " + ", response).unwrap()
    }

    #[test]
    fn test_order_sensitive() {
        assert!(matches("foo + bar", "foo xyz bar"));
        assert!(!matches("foo + bar", "bar xyz foo"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches("important to note", "IMPORTANT TO NOTE: ..."));
    }

    #[test]
    fn test_next_fragment_starts_after_previous_end() {
        // 第二个 "ab" 必须在第一个匹配之后
        assert!(!matches("ab + ab", "ab"));
        assert!(matches("ab + ab", "abab"));
        // 重叠不算
        assert!(!matches("aba + ba", "aba"));
    }

    #[test]
    fn test_anchor_applies_to_window() {
        // ^ 锚定在上一个片段的结束位置
        assert!(matches("^Title: + ^Moderator", "Title:Moderator speaks"));
        assert!(!matches("^Title: + ^Moderator", "Title: The Moderator speaks"));
    }

    #[test]
    fn test_leftmost_match_no_backtracking() {
        // 第一个片段只取最左匹配 "ab"，不会改用能让后续片段命中的 "ac"
        assert!(!matches("a. + ^z", "ab acz"));
        assert!(matches("a. + z", "ab acz"));
    }

    #[test]
    fn test_empty_fragment_is_noop() {
        assert!(matches("", "anything"));
        assert!(matches("foo +  + bar", "foo bar"));
        assert!(matches("", ""));
    }

    #[test]
    fn test_cursor_tracks_absolute_offset() {
        let re_foo = compile_fragment("foo").unwrap();
        let re_bar = compile_fragment("bar").unwrap();
        let mut cursor = FragmentCursor::new("xx foo yy bar zz");

        assert!(cursor.advance(&re_foo).unwrap());
        assert_eq!(cursor.position(), 6);
        assert!(cursor.advance(&re_bar).unwrap());
        assert_eq!(cursor.position(), 13);
        assert!(!cursor.advance(&re_foo).unwrap());
        assert_eq!(cursor.position(), 13);
    }

    #[test]
    fn test_lookaround_fragments() {
        assert!(matches(r"^It's impossible + (?<![a-zA-Z])win", "It's impossible to win"));
        assert!(!matches(r"^It's impossible + (?<![a-zA-Z])win", "It's impossible; nobody can twin"));
        assert!(matches(r"^The cat sat(?!\.\.\.)", "The cat sat down"));
        assert!(!matches(r"^The cat sat(?!\.\.\.)", "The cat sat..."));
    }

    #[test]
    fn test_multibyte_text() {
        assert!(matches("It’s important + note", "It’s important to note — café"));
        assert!(matches("café + ok", "Ünïcödé café is ok"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(SequentialMatcher::match_pattern("(open", " + ", "x").is_err());
    }
}
