pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur in filesystem operations.
///
/// Each variant maps onto one of the POSIX-flavored codes surfaced to
/// callers; see [`Error::code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The path (or a non-terminal part of it) does not exist.
    NotFound(String),
    /// The terminal segment already names an entry.
    AlreadyExists(String),
    /// A non-terminal segment, or an operation's target, is not a directory.
    NotADirectory(String),
    /// The operation expects a file but the path names a directory.
    IsADirectory(String),
    /// Directory removal was attempted on a non-empty directory.
    NotEmpty(String),
    /// Malformed input: relative paths, `.`/`..` segments, embedded NUL,
    /// or an operation that is invalid by construction (e.g. removing `/`).
    InvalidPath(String),
    /// The storage adapter failed; the in-memory tree was left unchanged.
    Storage(String),
}

impl Error {
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound(path.into())
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Error::AlreadyExists(path.into())
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Error::NotADirectory(path.into())
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Error::IsADirectory(path.into())
    }

    pub fn not_empty(path: impl Into<String>) -> Self {
        Error::NotEmpty(path.into())
    }

    pub fn invalid_path(detail: impl Into<String>) -> Self {
        Error::InvalidPath(detail.into())
    }

    pub fn storage(detail: impl Into<String>) -> Self {
        Error::Storage(detail.into())
    }

    /// The POSIX-flavored code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "ENOENT",
            Error::AlreadyExists(_) => "EEXIST",
            Error::NotADirectory(_) => "ENOTDIR",
            Error::IsADirectory(_) => "EISDIR",
            Error::NotEmpty(_) => "ENOTEMPTY",
            Error::InvalidPath(_) => "EINVAL",
            Error::Storage(_) => "EIO",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::NotFound(path) => write!(f, "ENOENT: path not found: {}", path),
            Error::AlreadyExists(path) => write!(f, "EEXIST: entry already exists: {}", path),
            Error::NotADirectory(path) => write!(f, "ENOTDIR: not a directory: {}", path),
            Error::IsADirectory(path) => write!(f, "EISDIR: is a directory: {}", path),
            Error::NotEmpty(path) => write!(f, "ENOTEMPTY: directory not empty: {}", path),
            Error::InvalidPath(detail) => write!(f, "EINVAL: invalid path: {}", detail),
            Error::Storage(detail) => write!(f, "EIO: storage failure: {}", detail),
        }
    }
}

impl std::error::Error for Error {}
