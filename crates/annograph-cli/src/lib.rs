//! annograph command-line interface.

pub mod bed;
pub mod gff3;
pub mod options;
pub mod select;
pub mod sketch;
pub mod validate;

pub use options::{Gff3Options, InputOptions, SelectOptions, SketchOptions, ValidateOptions};
