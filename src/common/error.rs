use std::fmt;
use std::io;

/// Crate-wide error taxonomy.
///
/// Most buffer-pool operations report failure via `bool`/`Option` per the
/// original calling convention (see [`crate::storage::buffer::buffer_pool_manager`]);
/// this type is reserved for the genuinely exceptional paths: disk I/O and
/// configuration loading.
#[derive(Debug)]
pub enum Error {
    /// The disk manager failed to read or write a page.
    Io(io::Error),
    /// A page id was out of the range the disk manager has allocated.
    OutOfRange(i32),
    /// Configuration could not be loaded or did not match the expected shape.
    Config(String),
    /// An index or key lookup failed against a collection that does not carry
    /// its own error type (e.g. a tuple field index).
    OutOfBounds,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "disk I/O error: {e}"),
            Error::OutOfRange(page_id) => write!(f, "page id {page_id} out of range"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::OutOfBounds => write!(f, "index out of bounds"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Asserts that a fallible call returns the "error" branch of its calling
/// convention: `false`, `None`, or `Err(_)`. Used in tests to flag caller
/// misuse paths (unknown page, pinned delete, etc.) without spelling out the
/// concrete type at every call site.
#[macro_export]
macro_rules! assert_errors {
    ($e:expr) => {{
        let result = $e;
        assert!(
            !$crate::common::error::IsOk::is_ok(&result),
            "expected an error/false/none result, got a success"
        );
    }};
}

/// Minimal trait used only by [`assert_errors!`] to treat `bool`, `Option<T>`,
/// and `Result<T, E>` uniformly as success/failure carriers.
pub trait IsOk {
    fn is_ok(&self) -> bool;
}

impl IsOk for bool {
    fn is_ok(&self) -> bool {
        *self
    }
}

impl<T> IsOk for Option<T> {
    fn is_ok(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> IsOk for std::result::Result<T, E> {
    fn is_ok(&self) -> bool {
        self.is_ok()
    }
}
