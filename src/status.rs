//! Status reporting
//!
//! `Status` is what a primary-key read reports back across the API
//! boundary: the coarse category, an HTTP-equivalent code, a message and,
//! for failures, the native engine error and where the lookup stopped.

use std::fmt;
use std::panic::Location;

use crate::error::{ErrorCategory, PkReadError};
use crate::operation::{FailureSite, LookupState};
use crate::store::NativeError;

/// Outcome of one primary-key read
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub category: ErrorCategory,
    pub http_code: u16,
    pub message: String,

    /// Native engine error, for engine failures
    pub native: Option<NativeError>,

    /// Last state reached before the failure
    pub state: Option<LookupState>,

    /// Source location of the failing step
    pub file: &'static str,
    pub line: u32,
}

impl Status {
    #[track_caller]
    fn with_category(category: ErrorCategory, message: String) -> Self {
        let location = Location::caller();
        Self {
            category,
            http_code: category.http_code(),
            message,
            native: None,
            state: None,
            file: location.file(),
            line: location.line(),
        }
    }

    #[track_caller]
    pub fn ok() -> Self {
        Self::with_category(ErrorCategory::Success, String::new())
    }

    #[track_caller]
    pub fn not_found() -> Self {
        Self::with_category(ErrorCategory::NotFound, "Not Found".to_string())
    }

    /// Status for an error raised outside a running lookup
    #[track_caller]
    pub fn from_error(err: &PkReadError) -> Self {
        Self {
            native: err.native().cloned(),
            ..Self::with_category(err.category(), err.to_string())
        }
    }

    /// Status for an error raised at a known point of a lookup
    pub fn at(err: &PkReadError, site: FailureSite) -> Self {
        Self {
            category: err.category(),
            http_code: err.category().http_code(),
            message: err.to_string(),
            native: err.native().cloned(),
            state: Some(site.state),
            file: site.location.file(),
            line: site.location.line(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.category == ErrorCategory::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.http_code, self.message)?;
        if let Some(state) = self.state {
            write!(f, " (state: {}, at {}:{})", state, self.file, self.line)?;
        }
        Ok(())
    }
}
