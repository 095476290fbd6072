//! Test modules for the queue system
//!
//! Tests are organized by functional area for better maintainability.

mod support;

mod core_functionality;
mod operators;
