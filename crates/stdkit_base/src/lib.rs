/* 📖 # Why have stdkit_base as a core library?
stdkit_base provides the error type, the error catcher and tracing setup shared by the
library and the CLI. Keeping them apart lets the CLI depend on them without pulling
anything else in, and keeps error handling identical across crates.
*/

pub mod catcher;
pub mod error;
pub mod tracing;

pub use error::{ErrorKind, ResultExt, StdkitError, StdkitResult};
