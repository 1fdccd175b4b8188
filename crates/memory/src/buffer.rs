//! Conversation buffer: remembers past exchanges as a transcript.
//!
//! Each successful executor call appends one [`Turn`]. On load the turns
//! are rendered as `Human: ...` / `AI: ...` lines under the `history` key.
//! With a `window`, only the most recent `window` turns are kept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwise_core::error::MemoryError;
use stepwise_core::memory::Memory;
use stepwise_core::schema::Values;
use tokio::sync::RwLock;
use tracing::debug;

/// One remembered exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub human: String,
    pub ai: String,
    pub created_at: DateTime<Utc>,
}

pub struct ConversationBuffer {
    turns: RwLock<Vec<Turn>>,
    memory_key: String,
    human_prefix: String,
    ai_prefix: String,
    input_key: Option<String>,
    output_key: Option<String>,
    /// 0 = unbounded
    window: usize,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self {
            turns: RwLock::new(Vec::new()),
            memory_key: "history".into(),
            human_prefix: "Human".into(),
            ai_prefix: "AI".into(),
            input_key: None,
            output_key: None,
            window: 0,
        }
    }

    /// Keep only the last `k` turns. `0` keeps everything.
    pub fn with_window(mut self, k: usize) -> Self {
        self.window = k;
        self
    }

    pub fn with_memory_key(mut self, key: impl Into<String>) -> Self {
        self.memory_key = key.into();
        self
    }

    pub fn with_prefixes(mut self, human: impl Into<String>, ai: impl Into<String>) -> Self {
        self.human_prefix = human.into();
        self.ai_prefix = ai.into();
        self
    }

    /// Which input holds the human message, when there is more than one.
    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = Some(key.into());
        self
    }

    /// Which output holds the AI message, when there is more than one.
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Snapshot of all stored turns, oldest first.
    pub async fn turns(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }

    /// The transcript as it would be injected into the inputs.
    pub async fn buffer_string(&self) -> String {
        let turns = self.turns.read().await;
        let start = match self.window {
            0 => 0,
            k => turns.len().saturating_sub(k),
        };
        turns[start..]
            .iter()
            .map(|t| {
                format!(
                    "{}: {}\n{}: {}",
                    self.human_prefix, t.human, self.ai_prefix, t.ai
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn pick<'a>(
        values: &'a Values,
        configured: Option<&str>,
        skip: &str,
        what: &str,
    ) -> Result<&'a String, MemoryError> {
        if let Some(key) = configured {
            return values
                .get(key)
                .ok_or_else(|| MemoryError::Storage(format!("{what} key '{key}' not present")));
        }

        let mut candidates = values.iter().filter(|(k, _)| k.as_str() != skip);
        match (candidates.next(), candidates.next()) {
            (Some((_, v)), None) => Ok(v),
            (None, _) => Err(MemoryError::Storage(format!("no {what} value to remember"))),
            (Some(_), Some(_)) => Err(MemoryError::AmbiguousKey(format!(
                "multiple {what} keys, set one explicitly"
            ))),
        }
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Memory for ConversationBuffer {
    fn memory_keys(&self) -> Vec<String> {
        vec![self.memory_key.clone()]
    }

    async fn load_context(&self, mut inputs: Values) -> Result<Values, MemoryError> {
        let history = self.buffer_string().await;
        inputs.insert(self.memory_key.clone(), history);
        Ok(inputs)
    }

    async fn save_context(&self, inputs: &Values, outputs: &Values) -> Result<(), MemoryError> {
        let human = Self::pick(inputs, self.input_key.as_deref(), &self.memory_key, "input")?;
        let ai = Self::pick(outputs, self.output_key.as_deref(), &self.memory_key, "output")?;

        let mut turns = self.turns.write().await;
        turns.push(Turn {
            human: human.clone(),
            ai: ai.clone(),
            created_at: Utc::now(),
        });
        if self.window > 0 && turns.len() > self.window {
            let excess = turns.len() - self.window;
            turns.drain(..excess);
        }
        debug!(turns = turns.len(), "Conversation buffer updated");
        Ok(())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.turns.write().await.clear();
        Ok(())
    }
}
