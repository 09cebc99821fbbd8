//! Derivation tools that turn raw stored events into the higher-level
//! artifacts a downstream assistant actually consumes: sessions, mined
//! routines, the bounded handoff package, and periodic summaries.

pub mod handoff;
pub mod routine;
pub mod sessionizer;
pub mod summaries;
