//! Deskhand - natural-language desktop automation
//!
//! Instructions flow through intent extraction, planning behind an
//! allowlist gate, and resilient execution against cached per-application
//! controllers.

pub mod controller;
pub mod core;
pub mod engine;
pub mod intent;
pub mod llm;
pub mod pipeline;
pub mod plan;
pub mod registry;

pub use pipeline::Agent;
