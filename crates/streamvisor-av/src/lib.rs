//! # streamvisor-av
//!
//! Transcoding engine invocation for streamvisor channels.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`check_tools`], [`tools::find_ffmpeg`]) -- find ffmpeg
//!   and report which required binaries are missing.
//! - **Process execution** ([`ToolCommand`]) -- run a long-lived process to
//!   completion while teeing its output to a log file and our own streams.
//! - **HLS arguments** ([`HlsSettings`]) -- the live UDP → fMP4 HLS ffmpeg profile.
//! - **Engine seam** ([`Engine`], [`FfmpegEngine`]) -- what a channel supervisor
//!   runs on every (re)start.

pub mod command;
pub mod engine;
mod error;
pub mod hls;
pub mod tools;

pub use command::ToolCommand;
pub use engine::{Engine, EngineExit, FfmpegEngine};
pub use error::{Error, Result};
pub use hls::HlsSettings;
pub use tools::{check_tool, check_tools, ToolInfo};
