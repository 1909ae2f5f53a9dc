//! Lifecycle event distribution.
//!
//! [`EventBus`] keeps one bounded inbox per connected observer and fans each
//! event out with a non-blocking try-enqueue: an observer whose inbox is full
//! misses that event, and nobody else is slowed down. Each observer drains its
//! own inbox with [`drain`] into whatever transport it is connected through.

mod bus;
mod drain;
mod subscription;

pub use bus::{BroadcastReport, BusStats, EventBus, DEFAULT_INBOX_CAPACITY};
pub use drain::{drain, spawn_drain, DrainExit, EventSink, SinkClosed};
pub use subscription::Subscription;
