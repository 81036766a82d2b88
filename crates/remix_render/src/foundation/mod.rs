//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and camera matrix helpers
//! - Handle-based collections
//! - Logging initialisation

pub mod math;
pub mod collections;
pub mod logging;
