//! Memory trait: conversational state carried across executor calls.
//!
//! The executor consults memory once before planning and writes to it once
//! after a successful finish. Memory is owned by the caller and shared with
//! the executor by `Arc`.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::schema::Values;

/// The core Memory trait.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Keys this memory adds to the inputs (e.g. `["history"]`).
    fn memory_keys(&self) -> Vec<String>;

    /// Return `inputs` augmented with the remembered context.
    async fn load_context(&self, inputs: Values) -> Result<Values, MemoryError>;

    /// Record one completed exchange.
    async fn save_context(&self, inputs: &Values, outputs: &Values) -> Result<(), MemoryError>;

    /// Forget everything.
    async fn clear(&self) -> Result<(), MemoryError>;
}
