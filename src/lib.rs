//! Quizsmith · question ingestion & answer evaluation backend.
//!
//! Generated text from an LLM is repaired into JSON, validated into typed
//! questions, stored, and later used to score user answers.

pub mod config;
pub mod domain;
pub mod error;
pub mod evaluate;
pub mod generation;
pub mod logic;
pub mod prompts;
pub mod protocol;
pub mod repair;
pub mod retry;
pub mod routes;
pub mod state;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod util;
pub mod validate;
