//! # Shared Types Crate
//!
//! Identity, document and error types shared by every Review-Chain subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Opaque Identity**: Callers are 20-byte [`Address`] values. The workflow
//!   never inspects them beyond equality.
//! - **Injected Time**: Every deadline is computed from a [`TimeSource`], never
//!   from the wall clock directly.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entities;
pub mod errors;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
