//! `Gap` attribute alignment descriptions.
//!
//! The attribute is a blank-separated list of `<code><length>` operations.
//! The reference length derived from it must equal the feature length; for
//! protein matches every match/deletion consumes three reference bases and
//! frameshift codes adjust by single bases.

use annograph_error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    Nucleotide,
    Protein,
}

#[derive(Debug, Clone, Copy)]
struct GapOp {
    code: char,
    length: u64,
}

/// A parsed `Gap` attribute value.
#[derive(Debug, Clone)]
pub struct GapSpec {
    kind: GapKind,
    ops: Vec<GapOp>,
}

impl GapSpec {
    pub fn parse(value: &str, kind: GapKind) -> Result<GapSpec> {
        let mut ops = Vec::new();
        for token in value.split_whitespace() {
            let mut chars = token.chars();
            let code = chars
                .next()
                .ok_or_else(|| Error::parse("empty token in Gap attribute"))?;
            let length: u64 = chars.as_str().parse().map_err(|_| {
                Error::parse(format!("could not parse Gap operation \"{}\"", token))
            })?;
            let valid = match kind {
                GapKind::Nucleotide => matches!(code, 'M' | 'I' | 'D'),
                GapKind::Protein => matches!(code, 'M' | 'I' | 'D' | 'F' | 'R'),
            };
            if !valid {
                return Err(Error::parse(format!(
                    "unknown Gap operation \"{}\"",
                    token
                )));
            }
            ops.push(GapOp { code, length });
        }
        if ops.is_empty() {
            return Err(Error::parse("Gap attribute contains no operations"));
        }
        Ok(GapSpec { kind, ops })
    }

    /// Number of reference bases the alignment consumes.
    ///
    /// `M` and `D` consume reference; `I` only consumes target. Protein
    /// matches scale by codon width, with `F`/`R` shifting the frame
    /// forward/backward by single bases.
    pub fn reference_length(&self) -> Result<u64> {
        let mut length: i64 = 0;
        for op in &self.ops {
            let step = op.length as i64;
            match (self.kind, op.code) {
                (GapKind::Nucleotide, 'M' | 'D') => length += step,
                (GapKind::Protein, 'M' | 'D') => length += 3 * step,
                (GapKind::Protein, 'F') => length += step,
                (GapKind::Protein, 'R') => length -= step,
                _ => {}
            }
        }
        u64::try_from(length).map_err(|_| {
            Error::parse("Gap attribute describes a negative reference length")
        })
    }
}
