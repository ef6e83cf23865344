//! Utility modules.

/// Zone-relative / absolute owner name conversion.
pub mod names;

/// Log sanitization utilities to prevent sensitive data exposure.
pub mod log_sanitizer;

/// Serde helpers for timestamps and durations.
pub mod serde_time;
