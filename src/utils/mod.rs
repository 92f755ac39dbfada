//! 工具模块
pub mod prompt_normalizer;
pub mod preview;

pub use self::prompt_normalizer::PromptNormalizer;
pub use self::preview::{preview_response, ResponsePreview};
