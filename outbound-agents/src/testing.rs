//! In-memory LLM backend for tests

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{LlmBackend, LlmError};

/// Replays canned replies in order and records every prompt
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, _system: &str, user: &str) -> Result<String, LlmError> {
        self.prompts.lock().push(user.to_string());
        self.replies.lock().pop_front().ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
