//! Token usage estimation
//!
//! The Gemini web client reports no usage, so prompt and completion sizes
//! are estimated with the cl100k_base encoding. Counts are approximate.

use std::sync::Arc;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::translate::Usage;

/// Estimates token counts for prompts and replies
pub struct TokenCounter {
    encoder: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self {
            encoder: cl100k_base().expect("cl100k_base encoder is bundled with tiktoken-rs"),
        }
    }

    /// Count tokens in a text string
    pub fn count(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        self.encoder.encode_with_special_tokens(text).len() as u32
    }

    /// Usage block for a prompt and its reply
    pub fn usage(&self, prompt: &str, completion: &str) -> Usage {
        let prompt_tokens = self.count(prompt);
        let completion_tokens = self.count(completion);
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a single counter
///
/// `CoreBPE` encoding takes `&self`, so no lock is needed.
#[derive(Clone)]
pub struct SharedTokenCounter {
    inner: Arc<TokenCounter>,
}

impl SharedTokenCounter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenCounter::new()),
        }
    }

    pub fn count(&self, text: &str) -> u32 {
        self.inner.count(text)
    }

    pub fn usage(&self, prompt: &str, completion: &str) -> Usage {
        self.inner.usage(prompt, completion)
    }
}

impl Default for SharedTokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
