//! Node-stream runtime: a pull-based stage abstraction over genome nodes,
//! plus every transformer stage the toolkit ships.

pub mod add_ids;
pub mod gff3_in;
pub mod gff3_out;
pub mod linesorted_out;
pub mod merge_feature;
pub mod multi_sanitizer;
pub mod select;
pub mod stream;
pub mod targetbest;
pub mod tidy_region;
pub mod visitor_stream;

pub use add_ids::AddIdsStream;
pub use gff3_in::Gff3InStream;
pub use gff3_out::Gff3OutStream;
pub use linesorted_out::LinesortedOutStream;
pub use merge_feature::MergeFeatureStream;
pub use multi_sanitizer::MultiSanitizerStream;
pub use select::{FilterLogic, SelectPredicate, SelectStream};
pub use stream::{drain, NodeStream, QueueStream};
pub use targetbest::TargetbestSelectStream;
pub use tidy_region::TidyRegionStream;
pub use visitor_stream::{StreamVisitor, VisitorStream};
