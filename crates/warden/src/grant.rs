use serde::{Deserialize, Serialize};

/// Access mode carried by a grant or requested by an operation.
///
/// Requests are always `Read` or `Write`; `ReadWrite` appears only on
/// grants, where it satisfies either request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    /// Whether a grant with this mode satisfies a request for `requested`.
    pub fn allows(self, requested: AccessMode) -> bool {
        self == AccessMode::ReadWrite || self == requested
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessMode::Read => "read",
            AccessMode::Write => "write",
            AccessMode::ReadWrite => "readwrite",
        };
        write!(f, "{}", s)
    }
}

/// One path-prefix permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub path_prefix: String,
    pub mode: AccessMode,
}

impl Grant {
    pub fn new(path_prefix: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            mode,
        }
    }

    pub fn read(path_prefix: impl Into<String>) -> Self {
        Self::new(path_prefix, AccessMode::Read)
    }

    pub fn write(path_prefix: impl Into<String>) -> Self {
        Self::new(path_prefix, AccessMode::Write)
    }

    pub fn readwrite(path_prefix: impl Into<String>) -> Self {
        Self::new(path_prefix, AccessMode::ReadWrite)
    }
}
