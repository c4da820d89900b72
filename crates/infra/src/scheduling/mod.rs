//! Timer scheduling on the tokio runtime
//!
//! Implements the engine's `Scheduler` port with one sleeping task per armed
//! timer. Fired timers are delivered over a channel so the worker loop can
//! feed them back into the engine in order with every other input.

pub mod timer;

pub use timer::TimerScheduler;
