//! Sync ports
//!
//! Traits the engine host implements to give the engine timers, a token
//! source and a way to reach the server.

pub mod ports;

pub use ports::{AccessTokenProvider, BatchSubmitter, Scheduler, Timer, TimerHandle, TimerKind};
