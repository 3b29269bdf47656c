//! Core library for the job application automation service: job/candidate
//! matching, channel-based auto-apply, application tracking, and the
//! pipeline supervisor that runs full search-score-apply cycles.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;
