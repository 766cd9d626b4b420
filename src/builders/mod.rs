//! Builders to construct named primitives from configuration.

pub mod toolkit_builder;

pub use toolkit_builder::{build_object_pools, build_throttle_queues, build_toolkit, Toolkit};
