//! Langbase Pipes adapter.
//!
//! Each configured reasoning backend is a Langbase pipe bound to a model.
//! [`PipeBackend`] plugs a pipe into the fallback invoker.

mod backend;
mod client;
mod types;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use backend::PipeBackend;
pub use client::LangbaseClient;
pub use types::*;
