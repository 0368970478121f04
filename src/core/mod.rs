// src/core/mod.rs — Conversation engine: routing, turn state machine, turn service

pub mod assistant;
pub mod orchestrator;
pub mod prompts;
pub mod router;
pub mod types;
