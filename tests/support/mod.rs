use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chat_provider::{ChatProvider, ChatReply, ChatRequest, ProviderError};

/// One observed collaborator call, recorded in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedCall {
    AuthRequired,
    Chat {
        prompt: String,
        model: String,
        context_len: usize,
        credential: Option<String>,
    },
    ListModels {
        credential: Option<String>,
    },
}

#[derive(Default)]
struct ProviderTrace {
    auth_results: VecDeque<Result<bool, ProviderError>>,
    chat_results: VecDeque<Result<ChatReply, ProviderError>>,
    model_results: VecDeque<Result<Vec<String>, ProviderError>>,
    calls: Vec<ObservedCall>,
}

/// Scripted backend double: every call pops the next queued result and is
/// recorded for assertion. An unscripted call fails as a transport error.
#[derive(Default)]
pub struct ScriptedProvider {
    trace: Mutex<ProviderTrace>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_auth(&self, result: Result<bool, ProviderError>) {
        lock_unpoisoned(&self.trace).auth_results.push_back(result);
    }

    pub fn push_chat(&self, result: Result<ChatReply, ProviderError>) {
        lock_unpoisoned(&self.trace).chat_results.push_back(result);
    }

    pub fn push_reply(&self, response: &str) {
        self.push_chat(Ok(ChatReply {
            response: response.to_string(),
            model: "llama3".to_string(),
        }));
    }

    pub fn push_models(&self, result: Result<Vec<String>, ProviderError>) {
        lock_unpoisoned(&self.trace).model_results.push_back(result);
    }

    pub fn calls(&self) -> Vec<ObservedCall> {
        lock_unpoisoned(&self.trace).calls.clone()
    }

    pub fn chat_calls(&self) -> Vec<ObservedCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ObservedCall::Chat { .. }))
            .collect()
    }

    pub fn network_call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn auth_required(&self) -> Result<bool, ProviderError> {
        let mut trace = lock_unpoisoned(&self.trace);
        trace.calls.push(ObservedCall::AuthRequired);
        trace
            .auth_results
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transport("unscripted auth call".to_string())))
    }

    async fn chat(
        &self,
        request: ChatRequest,
        credential: Option<&str>,
    ) -> Result<ChatReply, ProviderError> {
        let mut trace = lock_unpoisoned(&self.trace);
        trace.calls.push(ObservedCall::Chat {
            prompt: request.prompt,
            model: request.model,
            context_len: request.context.len(),
            credential: credential.map(str::to_string),
        });
        trace
            .chat_results
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transport("unscripted chat call".to_string())))
    }

    async fn list_models(&self, credential: Option<&str>) -> Result<Vec<String>, ProviderError> {
        let mut trace = lock_unpoisoned(&self.trace);
        trace.calls.push(ObservedCall::ListModels {
            credential: credential.map(str::to_string),
        });
        trace.model_results.pop_front().unwrap_or_else(|| {
            Err(ProviderError::Transport("unscripted models call".to_string()))
        })
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
