//! Background Tasks Module
//!
//! Optional tasks an application may run alongside a shared cache.
//!
//! # Tasks
//! - Purge: Evicts expired entries at a configured interval

mod purge;

pub use purge::spawn_purge_task;
