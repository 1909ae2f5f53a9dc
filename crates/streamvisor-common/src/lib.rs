//! Streamvisor-Common: Shared types, naming rules, and errors.
//!
//! This crate provides common functionality used across streamvisor:
//!
//! - **Channel types**: [`ChannelDescriptor`] and the [`LifecycleEvent`] it produces
//! - **Typed IDs**: [`SubscriptionId`] for observer registrations
//! - **Path utilities**: segment prefix / manifest naming and segment matching
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use streamvisor_common::{ChannelDescriptor, EventKind, LifecycleEvent};
//! use streamvisor_common::paths::is_prefixed_segment;
//!
//! let channel = ChannelDescriptor::new(1, "udp://localhost:2221", "streams", "logs");
//! assert!(channel.manifest_path.ends_with("stream1.m3u8"));
//!
//! let event = LifecycleEvent::closed(channel.index);
//! assert_eq!(event.kind, EventKind::Closed);
//!
//! assert!(is_prefixed_segment("stream_1_004.m4s", &channel.segment_prefix()));
//! assert!(!is_prefixed_segment("stream_10_004.m4s", &channel.segment_prefix()));
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::SubscriptionId;
pub use types::*;
