//! qr-providers: LLM provider implementations for quick-research
//!
//! This crate provides implementations of the Provider trait for
//! OpenAI-compatible chat-completion APIs (OpenAI, Groq, local servers).

pub mod openai;

pub use openai::{OpenAIProvider, GROQ_BASE_URL};
