//! Text-generation service clients.
//!
//! The job engine only depends on the [`GenerationClient`] trait; the HTTP
//! implementation talks to an OpenAI-compatible chat completions endpoint.

pub mod client;
pub mod error;
pub mod http;

pub use client::GenerationClient;
pub use error::GenerationError;
pub use http::HttpGenerationClient;
