//! Memory implementations for Stepwise.

pub mod buffer;

pub use buffer::{ConversationBuffer, Turn};
