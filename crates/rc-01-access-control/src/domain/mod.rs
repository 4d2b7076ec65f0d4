//! Domain layer for the access-control registry.

mod registry;

pub use registry::AccessRegistry;
