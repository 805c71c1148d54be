use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why one hand-written error type instead of anyhow or thiserror?

- Every wrapper in stdkit converts a foreign failure signal (io::Error, csv::Error,
  serde_json::Error, reqwest::Error, a panic) into one shape callers can match on
- Context strings and span traces are attached the same way everywhere
- No dependencies to compile and integrate beyond tracing
 */

/// What went wrong in a stdkit operation. Callers branch on this; the message is in `Display`.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed on a known path
    FileError { path: PathBuf, source: io::Error },

    /// Reading from or writing to an anonymous stream failed
    Io { source: io::Error },

    /// A caller-provided argument is unusable
    InvalidInput { message: String },

    /// Input data violates the expected shape
    MalformedInput { message: String },

    /// Index outside of a fixed-size container
    IndexOutOfRange { index: usize, size: usize },

    /// Object is not present in an identity map
    ObjectNotFound,

    /// JSON encoding or decoding failed
    Json { message: String },

    /// HTTP transfer failed
    Transfer { message: String },

    /// A unit of work panicked while running under the error catcher
    Panic { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Io { source } => write!(f, "I/O error: {}", source),
            ErrorKind::InvalidInput { message } => write!(f, "{}", message),
            ErrorKind::MalformedInput { message } => write!(f, "{}", message),
            ErrorKind::IndexOutOfRange { index, size } => {
                write!(f, "Index {} invalid or out of range (size {})", index, size)
            }
            ErrorKind::ObjectNotFound => write!(f, "Object not found."),
            ErrorKind::Json { message } => write!(f, "{}", message),
            ErrorKind::Transfer { message } => write!(f, "{}", message),
            ErrorKind::Panic { message } => write!(f, "Panicked: {}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and StdkitError?
ErrorKind carries the structural variant callers match on (the path that failed,
the offending index). StdkitError wraps it with the runtime context strings, an
optional cause and the span trace captured at creation time.
*/

/// Error type wrapping an [`ErrorKind`] with context, cause and span trace.
pub struct StdkitError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<StdkitError>>,
    span_trace: SpanTrace,
}

impl StdkitError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a [`ErrorKind::Message`] error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates an [`ErrorKind::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput {
            message: message.into(),
        })
    }

    /// Creates an [`ErrorKind::MalformedInput`] error.
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput {
            message: message.into(),
        })
    }

    /// Pushes a context line, printed ahead of the message by `Display`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Like [`context`](Self::context), with the line built by `f`.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: impl Into<Box<StdkitError>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The category to match on.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the error this one was caused by, if any.
    pub fn cause(&self) -> Option<&StdkitError> {
        self.cause.as_deref()
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Follows `source()` to the end, e.g. the `io::Error` under a file error.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let items = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let connector = if i + 1 == items { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, connector, ctx)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for StdkitError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for StdkitError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } | ErrorKind::Io { source } => Some(source),
            _ => self
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for StdkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for StdkitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<StdkitError> in the result type?

An unboxed `StdkitError` holds a span trace, a context vector and a cause, so every
`StdkitResult<T>` would be at least that large even when it is `Ok`. Behind a box the
error side is one pointer wide.
*/

/// Standard result type for stdkit operations.
pub type StdkitResult<T> = std::result::Result<T, Box<StdkitError>>;

/// Context helpers on [`StdkitResult`], so `?` chains can annotate failures in place.
pub trait ResultExt<T> {
    /// Adds `context` when the result is an error.
    fn context(self, context: impl Into<String>) -> StdkitResult<T>;

    /// Adds the context built by `f`, which only runs on error.
    fn with_context<F>(self, f: F) -> StdkitResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for StdkitResult<T> {
    fn context(self, context: impl Into<String>) -> StdkitResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> StdkitResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Builds a boxed [`ErrorKind::Message`] error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::StdkitError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed [`ErrorKind::Message`] error.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
