/* 📖 # What does the error catcher translate?

Most native calls report failure through their return value (`io::Result`, `serde_json::Result`)
and are converted at the call site. Some failures never show up as an `Err`: a serializer
implementation that panics, or an HTTP client used from a context it refuses to run in.
`run` executes a unit of work under a temporary policy where such a panic unwinds only up to
the catcher and comes back as an [`ErrorKind::Panic`] error, so callers handle it like any
other failure.
*/

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::debug;

use crate::error::{ErrorKind, StdkitError, StdkitResult};

/// Runs `work`, converting a panic raised inside it into an error.
pub fn run<T, F>(work: F) -> StdkitResult<T>
where
    F: FnOnce() -> StdkitResult<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            debug!(%message, "caught panic in unit of work");
            Err(Box::new(StdkitError::new(ErrorKind::Panic { message })))
        }
    }
}

/// Runs a native filesystem call, translating its `io::Error` into a file error for `path`.
pub fn run_io<T, F>(path: &Path, work: F) -> StdkitResult<T>
where
    F: FnOnce() -> io::Result<T>,
{
    run(|| {
        work().map_err(|source| {
            debug!(path = %path.display(), error = %source, "native call failed");
            Box::new(StdkitError::new(ErrorKind::FileError {
                path: path.to_path_buf(),
                source,
            }))
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
