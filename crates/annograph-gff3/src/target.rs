//! `Target` attribute grammar: `<id> <start> <end> [strand]`, optionally
//! comma-separated for multiple targets.

use annograph_core::{Range, Strand};
use annograph_error::{Error, Result};

use crate::escaping;
use crate::parse_util::{parse_range, parse_range_tidy};

/// One alignment target of a match feature.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAttribute {
    pub id: String,
    pub range: Range,
    pub strand: Option<Strand>,
}

impl TargetAttribute {
    /// Parse a single target. In tidy mode reversed target ranges are
    /// corrected; the returned flag says whether a correction happened.
    pub fn parse_one(value: &str, tidy: bool) -> Result<(TargetAttribute, bool)> {
        let tokens: Vec<&str> = value.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.len() != 3 && tokens.len() != 4 {
            return Err(Error::parse(format!(
                "Target attribute value '{}' must have 3 or 4 blank separated entries",
                value
            )));
        }
        let id = escaping::unescape(tokens[0])?;
        let (range, corrected) = if tidy {
            let tidy_range = parse_range_tidy(tokens[1], tokens[2])?;
            (tidy_range.range, tidy_range.swapped)
        } else {
            (parse_range(tokens[1], tokens[2])?, false)
        };
        let strand = match tokens.get(3) {
            Some(token) => Some(Strand::parse(token)?),
            None => None,
        };
        Ok((TargetAttribute { id, range, strand }, corrected))
    }

    /// Parse a comma-separated target list.
    pub fn parse_list(values: &str, tidy: bool) -> Result<(Vec<TargetAttribute>, bool)> {
        let mut targets = Vec::new();
        let mut corrected = false;
        for value in values.split(',') {
            let (target, fixed) = TargetAttribute::parse_one(value, tidy)?;
            corrected |= fixed;
            targets.push(target);
        }
        Ok((targets, corrected))
    }

    /// Serialize a target list back into attribute-value form.
    pub fn build_list(targets: &[TargetAttribute]) -> String {
        let mut out = String::new();
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&escaping::escape(&target.id));
            out.push(' ');
            out.push_str(&target.range.start.to_string());
            out.push(' ');
            out.push_str(&target.range.end.to_string());
            if let Some(strand) = target.strand {
                out.push(' ');
                out.push_str(&strand.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_token_forms() {
        let (t, fixed) = TargetAttribute::parse_one("EST23 1 21", false).unwrap();
        assert_eq!(t.id, "EST23");
        assert_eq!(t.range, Range::new(1, 21));
        assert_eq!(t.strand, None);
        assert!(!fixed);

        let (t, _) = TargetAttribute::parse_one("EST23 1 21 +", false).unwrap();
        assert_eq!(t.strand, Some(Strand::Forward));
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!(TargetAttribute::parse_one("EST23 1", false).is_err());
        assert!(TargetAttribute::parse_one("EST23 1 2 + -", false).is_err());
    }

    #[test]
    fn tidy_corrects_reversed_range() {
        assert!(TargetAttribute::parse_one("EST23 21 1", false).is_err());
        let (t, fixed) = TargetAttribute::parse_one("EST23 21 1", true).unwrap();
        assert_eq!(t.range, Range::new(1, 21));
        assert!(fixed);
    }

    #[test]
    fn list_round_trips() {
        let (targets, _) = TargetAttribute::parse_list("EST1 1 10 +,EST2 5 20", false).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(
            TargetAttribute::build_list(&targets),
            "EST1 1 10 +,EST2 5 20"
        );
    }

    #[test]
    fn target_id_is_unescaped() {
        let (t, _) = TargetAttribute::parse_one("EST%2023 1 10", false).unwrap();
        assert_eq!(t.id, "EST 23");
    }
}
