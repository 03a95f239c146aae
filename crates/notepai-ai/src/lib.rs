//! Writing assistance backed by a chat-completions model.
//!
//! [`AiService`] implements the autocomplete, quick-edit and composer
//! endpoints over any [`LlmProvider`]. The server exposes it over HTTP, and
//! the terminal client reaches it through a [`Backend`], either in-process or
//! via [`RemoteBackend`].

pub mod api;
pub mod backend;
pub mod cleanup;
pub mod context;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod service;

pub use backend::{Backend, RemoteBackend};
pub use error::{AiError, Result};
pub use provider::{LlmProvider, OpenAiConfig, OpenAiProvider};
pub use service::AiService;

/// The in-process backend used when no server endpoint is configured.
pub type LocalBackend = AiService<OpenAiProvider>;
