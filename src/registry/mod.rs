//! Plugin registry access.
//!
//! This module provides the lookup abstraction used by the aggregator
//! and its HTTP implementation against the WordPress.org plugin API.

pub mod client;

pub use client::{PluginRegistry, RegistryError, RegistryPayload, WpOrgRegistry};
