//! # Error Types
//!
//! The error taxonomy returned by every workflow and registry operation.

use crate::entities::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Role a caller must hold for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Member of the registry owner set.
    Owner,
    /// Member of the registry authorized-caller set.
    AuthorizedCaller,
    /// The project's manager.
    ProjectManager,
    /// The unit's assessment provider.
    AssessmentProvider,
    /// Owner of a submitted document.
    DocumentOwner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Owner => "owner",
            Self::AuthorizedCaller => "authorized caller",
            Self::ProjectManager => "project manager",
            Self::AssessmentProvider => "assessment provider",
            Self::DocumentOwner => "document owner",
        };
        f.write_str(s)
    }
}

/// Errors from workflow and registry operations.
///
/// No operation partially applies: when one of these is returned the state
/// is unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// Caller lacks the required role.
    #[error("unauthorized: {caller} is not the {required}")]
    Unauthorized { caller: Address, required: Role },

    /// Operation is illegal in the current lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Argument violates a precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Entity already exists.
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
}

impl WorkflowError {
    #[must_use]
    pub fn unauthorized(caller: Address, required: Role) -> Self {
        Self::Unauthorized { caller, required }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }

    /// Machine-readable category, suitable for transport status mapping.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
        }
    }
}

/// Category of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    InvalidState,
    InvalidArgument,
    NotFound,
    AlreadyExists,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidState => "invalid_state",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
        }
    }
}

/// Result alias for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
