//! 回答预览：日志中单行展示回答文本

use std::fmt::{self, Write};

/// 换行显示标记（末尾换行会影响 `$` 锚点，日志中需要可见）
const NEWLINE_MARK: char = '⏎';

/// 回答文本的单行预览，格式化时才遍历文本
///
/// 换行显示为 `⏎`，其余连续空白折叠为一个空格；超过 `max_chars` 个字符时截断并注明总字符数。
pub struct ResponsePreview<'a> {
    response: &'a str,
    max_chars: usize,
}

impl<'a> ResponsePreview<'a> {
    pub fn new(response: &'a str, max_chars: usize) -> Self {
        Self { response, max_chars }
    }
}

impl fmt::Display for ResponsePreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.response.trim_start();
        let mut shown = 0;
        let mut pending_space = false;

        for ch in text.chars() {
            if shown >= self.max_chars {
                return write!(f, "…(共{}字符)", self.response.chars().count());
            }
            if ch == '\n' {
                f.write_char(NEWLINE_MARK)?;
                shown += 1;
                pending_space = false;
            } else if ch.is_whitespace() {
                pending_space = true;
            } else {
                // 空白只在后面还有可见内容时输出
                if pending_space {
                    f.write_char(' ')?;
                    shown += 1;
                }
                pending_space = false;
                f.write_char(ch)?;
                shown += 1;
            }
        }
        Ok(())
    }
}

/// 日志用回答预览
pub fn preview_response(response: &str, max_chars: usize) -> ResponsePreview<'_> {
    ResponsePreview::new(response, max_chars)
}
