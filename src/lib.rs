// Public modules
pub mod config;
pub mod decode;
pub mod error;
pub mod observability;
pub mod relay;
pub mod sanitize;
pub mod sse;
pub mod suggest;
pub mod types;
pub mod upstream;
pub mod widget;

// Re-exports
pub use config::RelayConfig;
pub use decode::StreamDecoder;
pub use error::{Error, Result};
pub use relay::{RelayState, STREAM_FAILURE_NOTICE, router};
pub use sanitize::strip_fences;
pub use types::*;
pub use upstream::{ModelBackend, ModelClient};
pub use widget::{PlainTextRenderer, Renderer, WidgetSession};
