use crate::grant::AccessMode;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the permission layer.
///
/// Denials are deliberately distinct from [`nestfs::Error`] so callers can
/// tell "no such path" from "not allowed to see this path".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("permission denied: {mode} access to {path}")]
    Denied { path: String, mode: AccessMode },

    #[error("service not granted: {service}")]
    ServiceDenied { service: String },

    #[error("filesystem error: {0}")]
    Fs(#[from] nestfs::Error),
}

impl Error {
    pub fn denied(path: impl Into<String>, mode: AccessMode) -> Self {
        Error::Denied {
            path: path.into(),
            mode,
        }
    }

    pub fn service_denied(service: impl Into<String>) -> Self {
        Error::ServiceDenied {
            service: service.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Error::Denied { .. } | Error::ServiceDenied { .. })
    }
}
