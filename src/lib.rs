//! Mail Triage — email classification service.
//!
//! Emails are normalized, stripped of stop-words and stemmed (`nlp`), then
//! classified by a text-generation model with ordered fallback
//! (`pipeline`). Around that core sit mail sources (`channels`), document
//! extraction (`extract`), analysis history (`store`) and the HTTP API
//! (`api`).

pub mod api;
pub mod channels;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod nlp;
pub mod pipeline;
pub mod store;
