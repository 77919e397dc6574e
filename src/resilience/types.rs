//! Call outcome and invoker error definitions.

use serde::Serialize;
use thiserror::Error;

use crate::resilience::circuit_breaker::BreakerOpen;
use crate::resilience::retries::Interrupted;

/// Domain-level rejection kinds. Never retried, never counted by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessKind {
    NotFound,
    InvalidArgument,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    InvalidState,
    Insufficient,
}

/// Infrastructure-level failure kinds. Retried and counted by the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    Timeout,
    Connection,
    Unavailable,
    Internal,
    Unknown,
}

/// Error produced by a downstream RPC call.
///
/// Prefer the structured variants at the call site. `Untyped` carries only
/// a message and is classified by keyword matching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("{detail}")]
    Business { kind: BusinessKind, detail: String },

    #[error("{detail}")]
    System { kind: SystemKind, detail: String },

    #[error("{0}")]
    Untyped(String),
}

impl RpcError {
    pub fn business(kind: BusinessKind, detail: impl Into<String>) -> Self {
        Self::Business { kind, detail: detail.into() }
    }

    pub fn system(kind: SystemKind, detail: impl Into<String>) -> Self {
        Self::System { kind, detail: detail.into() }
    }

    /// Wrap any displayable error whose kind is not known.
    pub fn untyped(err: impl std::fmt::Display) -> Self {
        Self::Untyped(err.to_string())
    }
}

impl From<String> for RpcError {
    fn from(message: String) -> Self {
        Self::Untyped(message)
    }
}

impl From<&str> for RpcError {
    fn from(message: &str) -> Self {
        Self::Untyped(message.to_string())
    }
}

impl From<tonic::Status> for RpcError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;

        let detail = status.message().to_string();
        match status.code() {
            Code::NotFound => Self::business(BusinessKind::NotFound, detail),
            Code::InvalidArgument | Code::OutOfRange => {
                Self::business(BusinessKind::InvalidArgument, detail)
            }
            Code::AlreadyExists => Self::business(BusinessKind::AlreadyExists, detail),
            Code::PermissionDenied => Self::business(BusinessKind::PermissionDenied, detail),
            Code::Unauthenticated => Self::business(BusinessKind::Unauthenticated, detail),
            Code::FailedPrecondition => Self::business(BusinessKind::InvalidState, detail),
            Code::DeadlineExceeded => Self::system(SystemKind::Timeout, detail),
            Code::Unavailable | Code::Cancelled | Code::Aborted | Code::ResourceExhausted => {
                Self::system(SystemKind::Unavailable, detail)
            }
            Code::Internal | Code::DataLoss | Code::Unimplemented => {
                Self::system(SystemKind::Internal, detail)
            }
            // Services that return plain error strings surface as Unknown;
            // leave them to keyword classification.
            Code::Unknown | Code::Ok => Self::Untyped(detail),
        }
    }
}

/// Error returned by the invoker to business logic.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Domain rejection, passed through verbatim.
    #[error(transparent)]
    Business(RpcError),

    /// Infrastructure failure or open breaker, reported with a friendly
    /// message. `source` is `None` when the breaker rejected the call.
    #[error("{message}")]
    Unavailable {
        service: String,
        message: String,
        #[source]
        source: Option<RpcError>,
    },

    #[error("call cancelled")]
    Cancelled,

    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

impl InvokeError {
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// True when the breaker short-circuited the call.
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, Self::Unavailable { source: None, .. })
    }

    /// The downstream error behind this outcome, if a call was made.
    pub fn call_error(&self) -> Option<&RpcError> {
        match self {
            Self::Business(err) => Some(err),
            Self::Unavailable { source, .. } => source.as_ref(),
            Self::Cancelled | Self::DeadlineExceeded => None,
        }
    }

    pub(crate) fn breaker_open(open: &BreakerOpen, message: &str) -> Self {
        Self::Unavailable {
            service: open.service.clone(),
            message: message.to_string(),
            source: None,
        }
    }
}

impl From<Interrupted> for InvokeError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Result alias for invoker operations.
pub type InvokeResult<T> = Result<T, InvokeError>;
