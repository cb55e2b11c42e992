//! Pipeline stages of one submission.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ transport ──▶ response
//! (multipart)  (reqwest)     (classify)
//! ```
//!
//! 1. [`request`]   — assemble the `multipart/form-data` body from validated
//!    selections and rendered parameter fields
//! 2. [`transport`] — send it with a timeout and a cancellation token; the only
//!    stage with network I/O
//! 3. [`response`]  — turn the raw reply into a result or a classified error
//!    (server message extraction, sanity checks, download filename)
//!
//! Each stage is a plain function over plain data, so the classification rules
//! can be tested without a server.

pub mod request;
pub mod response;
pub mod transport;
