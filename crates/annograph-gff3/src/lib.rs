//! GFF3/GVF text handling: the parser state machine that builds the genome
//! node graph, the emitter visitor that serializes it back, and the BED
//! front end.

pub mod bed;
pub mod defines;
pub mod emitter;
pub mod escaping;
pub mod feature_info;
pub mod gap;
pub mod orphanage;
pub mod parse_util;
pub mod parser;
pub mod target;

pub use bed::BedParser;
pub use emitter::Gff3Emitter;
pub use orphanage::Orphanage;
pub use parser::{Gff3Parser, ParseMode};
pub use target::TargetAttribute;
