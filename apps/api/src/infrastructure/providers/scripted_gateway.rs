use async_trait::async_trait;
use std::sync::Mutex;

use crate::agents::provider::{ProviderError, ProviderGateway};
use crate::domain::agent::ProviderType;

/// What a scripted rule answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(ProviderError),
    /// Fails `times` times with `error`, then answers with `text`
    FailTimes {
        times: usize,
        error: ProviderError,
        text: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

struct Rule {
    needle: String,
    reply: Reply,
    hits: usize,
}

/// A call seen by the scripted gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub provider: ProviderType,
    pub prompt: String,
    pub model: Option<String>,
}

/// Deterministic gateway for tests and offline runs
///
/// Rules are checked in the order they were added; the first rule whose
/// needle occurs in the prompt answers. Prompts matching no rule get the
/// fallback reply.
pub struct ScriptedGateway {
    rules: Mutex<Vec<Rule>>,
    fallback: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: Reply::Fail(ProviderError::Permanent("no scripted reply".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Adds a rule answering prompts that contain `needle`
    pub fn on(self, needle: impl Into<String>, reply: Reply) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                needle: needle.into(),
                reply,
                hits: 0,
            });
        }
        self
    }

    /// Reply for prompts no rule matches
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls whose prompt contains `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut rules = self
            .rules
            .lock()
            .map_err(|_| ProviderError::Permanent("scripted gateway poisoned".to_string()))?;

        let reply = match rules.iter_mut().find(|r| prompt.contains(&r.needle)) {
            Some(rule) => {
                rule.hits += 1;
                match &rule.reply {
                    Reply::FailTimes { times, error, .. } if rule.hits <= *times => {
                        Reply::Fail(error.clone())
                    }
                    Reply::FailTimes { text, .. } => Reply::Text(text.clone()),
                    other => other.clone(),
                }
            }
            None => self.fallback.clone(),
        };

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(error) => Err(error),
            Reply::FailTimes { error, .. } => Err(error),
        }
    }
}

#[async_trait]
impl ProviderGateway for ScriptedGateway {
    async fn generate(
        &self,
        provider: ProviderType,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                provider,
                prompt: prompt.to_string(),
                model: model.map(str::to_string),
            });
        }
        self.answer(prompt)
    }
}
