//! Tiered context loading and trigger routing for LLM-driven roleplay sessions.
//!
//! Each user message is matched against the session's entity files, frequent
//! hits are escalated, new names are counted toward entity cards, and the
//! resulting context is layered into a single prompt.

pub mod assembler;
pub mod config;
pub mod detect;
pub mod entity;
pub mod escalation;
pub mod keyword;
pub mod logging;
pub mod matcher;
pub mod pattern;
pub mod persist;
pub mod semantic;
pub mod session;
pub mod state;
pub mod templates;
pub mod tracker;
pub mod validators;
