use aiproxy::history::ConversationStore;
use aiproxy::providers::base::Provider;
use std::sync::Arc;

use crate::configuration::PromptSettings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
    pub history: ConversationStore,
    pub prompts: Arc<PromptSettings>,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, prompts: PromptSettings) -> Self {
        Self {
            provider,
            history: ConversationStore::new(),
            prompts: Arc::new(prompts),
        }
    }

    pub fn with_history(mut self, history: ConversationStore) -> Self {
        self.history = history;
        self
    }
}
