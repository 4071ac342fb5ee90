//! BED input: three required columns, up to twelve accepted.
//!
//! BED positions are 0-based with an exclusive end; entry into the graph
//! shifts starts by +1 to the 1-based closed convention. Zero-length
//! features are rejected.

use annograph_core::{FeatureNode, GenomeNode, InternPool, Strand};
use annograph_error::{Error, Location, Result};

use crate::parse_util::{parse_score, parse_uint};

const BED_FEATURE_TYPE: &str = "BED_feature";

pub struct BedParser {
    pool: InternPool,
    feature_type: String,
}

impl BedParser {
    pub fn new() -> Self {
        Self::with_pool(InternPool::new())
    }

    pub fn with_pool(pool: InternPool) -> Self {
        Self {
            pool,
            feature_type: BED_FEATURE_TYPE.to_owned(),
        }
    }

    pub fn pool(&self) -> &InternPool {
        &self.pool
    }

    /// Feature type assigned to parsed lines (default `BED_feature`).
    pub fn set_feature_type(&mut self, ftype: impl Into<String>) {
        self.feature_type = ftype.into();
    }

    /// Parse a whole BED text into genome nodes.
    pub fn parse(&mut self, input: &str, filename: &str) -> Result<Vec<GenomeNode>> {
        let mut out = Vec::new();
        for (index, line) in input.lines().enumerate() {
            let location = Location::new(filename, index as u64 + 1);
            let trimmed_end = line.trim_end_matches(['\r']);
            if trimmed_end.is_empty() || trimmed_end.starts_with([' ', '#']) {
                continue;
            }
            let first_word = trimmed_end.split_whitespace().next().unwrap_or("");
            if first_word == "browser" || first_word == "track" {
                continue;
            }
            self.parse_bed_line(trimmed_end, location, &mut out)?;
        }
        Ok(out)
    }

    fn parse_bed_line(
        &mut self,
        line: &str,
        location: Location,
        out: &mut Vec<GenomeNode>,
    ) -> Result<()> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(Error::parse(
                "BED line needs at least the chrom, chromStart and chromEnd columns",
            )
            .at(location));
        }
        if fields.len() > 12 {
            return Err(
                Error::parse("BED line has more than twelve columns").at(location)
            );
        }
        let seqid = fields[0];
        let start = parse_uint(fields[1], "chromStart").map_err(|e| e.at(location.clone()))?;
        let end = parse_uint(fields[2], "chromEnd").map_err(|e| e.at(location.clone()))?;
        if start > end {
            return Err(Error::parse(format!(
                "chromStart {} is larger than chromEnd {}",
                start, end
            ))
            .at(location));
        }
        if start == end {
            return Err(Error::parse("BED feature has length 0").at(location));
        }

        // optional columns; empty strings cannot occur after a whitespace
        // split, so presence is positional
        let name = fields.get(3).copied();
        let score = match fields.get(4) {
            Some(token) => parse_score(token).map_err(|e| e.at(location.clone()))?,
            None => None,
        };
        let strand = match fields.get(5) {
            Some(token) => Strand::parse(token).map_err(|e| e.at(location.clone()))?,
            None => Strand::Both,
        };
        // columns 7-12 (thickStart, thickEnd, itemRgb, blockCount,
        // blockSizes, blockStarts) are accepted but not modeled

        // 0-based half-open to 1-based closed
        let range = annograph_core::Range::new(start + 1, end);
        let node = FeatureNode::new(
            &self.pool,
            seqid,
            ".",
            &self.feature_type,
            range,
            strand,
            location,
        );
        if let Some(name) = name {
            node.add_attribute("Name", name);
        }
        if let Some(score) = score {
            node.set_score(score);
        }
        out.push(GenomeNode::Feature(node));
        Ok(())
    }
}

impl Default for BedParser {
    fn default() -> Self {
        Self::new()
    }
}
