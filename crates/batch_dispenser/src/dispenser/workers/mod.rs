//! Multi-threaded driving of a shared `Loader`.
//!
//! - `pool`: `WorkerPool`, named threads looping `Loader::next()` into a
//!   bounded output channel

pub(crate) mod pool;
