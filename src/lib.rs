// src/lib.rs — Library root for frontdesk

pub mod api;
pub mod cli;
pub mod core;
pub mod infra;
pub mod knowledge;
pub mod provider;
pub mod scheduling;
pub mod session;
pub mod tools;
