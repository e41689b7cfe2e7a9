//! Vision provider abstraction and backend implementations.

pub mod any;
pub mod claude;
pub mod error;
pub mod gemini;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod provider;

pub use any::AnyProvider;
pub use error::VisionError;
pub use provider::{Document, DocumentKind, VisionProvider};
