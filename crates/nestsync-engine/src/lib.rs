//! nestsync engine - orchestration layer
//!
//! Runs parent saves and their nested reconciliations against SQLite inside
//! one transaction, and reads parents back with their children.

pub mod commands;
