//! Prompt规范化工具
//! 去掉固定的指令前缀和结尾省略号，得到可嵌入规则模板的prompt文本

use crate::config::GlobalConfig;

/// Prompt规范化器
#[derive(Debug, Clone, PartialEq)]
pub struct PromptNormalizer {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for PromptNormalizer {
    fn default() -> Self {
        Self::new(vec!["Complete the sentence:".to_string()], vec!["...".to_string()])
    }
}

impl PromptNormalizer {
    pub fn new(prefixes: Vec<String>, suffixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
            suffixes: suffixes.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }

    pub fn from_config(config: &GlobalConfig) -> Self {
        Self::new(config.strip_prefixes.clone(), config.strip_suffixes.clone())
    }

    /// 规范化prompt（纯函数，空串也是合法输出）
    pub fn normalize(&self, prompt: &str) -> String {
        let mut text = prompt.trim();

        if let Some(rest) = self.prefixes.iter().find_map(|prefix| text.strip_prefix(prefix.as_str())) {
            text = rest.trim_start();
        }

        // 结尾标记可能叠加（如 "......"），逐个剥离
        loop {
            let trimmed = text.trim_end();
            match self.suffixes.iter().find_map(|suffix| trimmed.strip_suffix(suffix.as_str())) {
                Some(rest) => text = rest,
                None => {
                    text = trimmed;
                    break;
                }
            }
        }

        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_and_ellipsis() {
        let normalizer = PromptNormalizer::default();
        assert_eq!(
            normalizer.normalize("Complete the sentence: Jews walked into a bar..."),
            "Jews walked into a bar"
        );
    }

    #[test]
    fn test_plain_prompt_only_trimmed() {
        let normalizer = PromptNormalizer::default();
        assert_eq!(normalizer.normalize("  The cat sat  "), "The cat sat");
    }

    #[test]
    fn test_inner_ellipsis_kept() {
        let normalizer = PromptNormalizer::default();
        assert_eq!(normalizer.normalize("Wait... what..."), "Wait... what");
    }

    #[test]
    fn test_empty_results() {
        let normalizer = PromptNormalizer::default();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("Complete the sentence: ..."), "");
        assert_eq!(normalizer.normalize("......"), "");
    }

    #[test]
    fn test_custom_markers() {
        let normalizer = PromptNormalizer::new(vec!["Complete:".into()], vec!["…".into(), "...".into()]);
        assert_eq!(normalizer.normalize("Complete: Hello…"), "Hello");
        assert_eq!(normalizer.normalize("Complete: Hello..."), "Hello");
    }
}
