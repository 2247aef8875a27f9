//! src/dispenser/common/mod.rs
//!
//! Utilities shared by the loader and the worker pool.
//!
//! Only thread-local worker identification for now.

pub mod thread;
