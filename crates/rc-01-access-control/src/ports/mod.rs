//! Ports for the access-control registry.

pub mod inbound;

pub use inbound::AccessControlApi;
