//! Database access layer.
//!
//! This module provides the typed entry points:
//! - Memoized connection creation from properties
//! - A per-model template for writes, queries and database lifecycle

pub mod factory;
pub mod template;

pub use factory::ConnectionFactory;
pub use template::{Converter, InfluxTemplate, TemplateBuilder};
