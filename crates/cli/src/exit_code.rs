//! Process exit codes
//!
//! Scripts rely on these values; they must stay stable.

use rcprobe_core::{Error, RejectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    /// Integrity mismatch, local I/O, anything unclassified
    GeneralError = 1,
    /// Bad flags, unresolvable target, missing credentials, bad config
    UsageError = 2,
    /// No response from the endpoint, or a server-side failure
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    Conflict = 6,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit code for a probe failure
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Validation(_)
            | Error::Resolution(_)
            | Error::MissingCredential(_)
            | Error::Config(_) => ExitCode::UsageError,
            Error::Reachability(_) => ExitCode::NetworkError,
            Error::RemoteRejection { kind, .. } => match kind {
                RejectionKind::Auth => ExitCode::AuthError,
                RejectionKind::NotFound => ExitCode::NotFound,
                RejectionKind::Conflict => ExitCode::Conflict,
                RejectionKind::Other => ExitCode::NetworkError,
            },
            Error::Integrity { .. } | Error::Io(_) | Error::General(_) => ExitCode::GeneralError,
        }
    }
}
