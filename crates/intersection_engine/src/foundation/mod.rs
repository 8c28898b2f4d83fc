//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and transforms
//! - Handle types and collections
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
