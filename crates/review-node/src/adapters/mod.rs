//! Adapters implementing subsystem outbound ports with other subsystems.

pub mod authorization;

pub use authorization::RegistryAuthorization;
