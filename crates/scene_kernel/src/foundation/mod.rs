//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the kernel:
//! - Time management (fixed-step clock, per-tick time descriptors)
//! - Logging utilities

pub mod logging;
pub mod time;
