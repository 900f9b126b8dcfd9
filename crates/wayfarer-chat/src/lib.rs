//! Conversation side of Wayfarer: the backend capability trait, the streaming
//! conversation engine, and the assistant orchestrator that executes routed
//! actions against the session store.

pub mod assistant;
pub mod backend;
pub mod engine;

pub use assistant::Assistant;
pub use backend::{
    ChatBackend, ConversationHandle, HistoryTurn, MockChatBackend, ReplyChunk, TurnPart, TurnRole,
};
pub use engine::ConversationEngine;
