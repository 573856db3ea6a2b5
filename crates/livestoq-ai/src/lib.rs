//! AI layer: the Stoqy AI chat assistant backed by a hosted LLM.

mod assistant;
mod prompt;

pub use assistant::{
    Assistant, AssistantConfig, AssistantError, ChatMessage, EMPTY_REPLY, Role,
};
pub use prompt::SYSTEM_PROMPT;
