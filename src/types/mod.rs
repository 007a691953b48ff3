// Public modules
pub mod chat_request;
pub mod completion;
pub mod stream_event;
pub mod suggest;
pub mod turn;

// Re-exports
pub use chat_request::ChatRequest;
pub use completion::{Completion, CompletionParams, MessageParam, TextBlock};
pub use stream_event::StreamEvent;
pub use suggest::{SuggestRequest, SuggestResponse};
pub use turn::{Role, Turn};
