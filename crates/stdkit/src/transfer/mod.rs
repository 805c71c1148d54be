/* 📖 # Why is the transfer client a bag of options?

A transfer is configured step by step and then executed, possibly several times. Keeping the
options as plain data until `execute` builds the underlying `reqwest` client means a client can
be cloned cheaply, inspected, and re-run with a changed option. Every way a transfer can go
wrong (bad URL, refused connection, timeout, error status with `FailOnError`) is reported the
same way, as a single [`ErrorKind::Transfer`](stdkit_base::ErrorKind::Transfer) error.
*/

pub mod client;
pub mod info;
pub mod method;

pub use client::{TransferClient, TransferOption};
pub use info::{TransferInfo, TransferInfoKey};
pub use method::HttpMethod;
