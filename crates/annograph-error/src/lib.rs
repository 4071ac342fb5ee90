//! # annograph-error
//!
//! Unified error handling for annograph.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: know what class of failure occurred (parse, semantic, ...)
//! - **Location**: carry `(file, line)` provenance whenever it is available
//! - **Error Source**: wrap underlying errors without leaking raw types
//! - **Warnings**: recoverable findings (tidy mode) are values, not errors,
//!   and are delivered through a host-provided sink
//!
//! ## Usage
//!
//! ```rust
//! use annograph_error::{Error, Location};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::parse("line does not contain 9 tab separated fields")
//!         .at(Location::new("input.gff3", 17)))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible library functions return `Result<T, annograph_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Strict mode never demotes an error; tidy mode demotes a graded subset
//!   of parse/semantic errors into `Warning`s and continues

mod error;
mod kind;
mod warning;

pub use error::{Error, Location};
pub use kind::ErrorKind;
pub use warning::{Warning, WarningSink};

/// Result type alias using the annograph Error
pub type Result<T> = std::result::Result<T, Error>;
