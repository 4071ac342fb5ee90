//! The GFF3/GVF parser state machine.
//!
//! Lines go in, completed top-level genome nodes come out of a FIFO buffer.
//! The parser owns the per-window ID table, the orphanage, the seqid
//! bookkeeping (including synthesized pseudo regions) and the `###`
//! terminator semantics that bound node completion.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use annograph_core::{
    FeatureNode, FeatureRef, GenomeNode, InternPool, Phase, Range, RegionNode, SequenceNode,
    Strand, TypeChecker, XrfChecker,
};
use annograph_core::node::{CommentNode, EofNode, MetaNode};
use annograph_error::{Error, Location, Result, Warning, WarningSink};

use crate::defines::*;
use crate::feature_info::FeatureInfo;
use crate::gap::{GapKind, GapSpec};
use crate::orphanage::Orphanage;
use crate::parse_util::{parse_range, parse_range_correct_neg, parse_range_tidy, parse_score};
use crate::target::TargetAttribute;

/// Error-recovery discipline. Strict and tidy are mutually exclusive; the
/// default sits between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Relaxed,
    Strict,
    Tidy,
}

/// A seqid known to the parser: either declared by `##sequence-region` or
/// synthesized when a feature mentioned it first.
#[derive(Debug)]
struct SimpleRegion {
    range: Range,
    line_number: u64,
    pseudo: bool,
    is_circular: bool,
}

/// Output buffer type: completed top-level nodes in order.
pub type NodeQueue = VecDeque<GenomeNode>;

pub struct Gff3Parser {
    pool: InternPool,
    mode: ParseMode,
    checkids: bool,
    checkregions: bool,
    offset: Option<i64>,
    offset_map: Option<HashMap<String, i64>>,
    type_checker: Option<Arc<dyn TypeChecker>>,
    xrf_checker: Option<Arc<dyn XrfChecker>>,
    warning_sink: Option<WarningSink>,

    feature_info: FeatureInfo,
    orphanage: Orphanage,
    regions: HashMap<String, SimpleRegion>,
    used_types: BTreeSet<String>,

    location: Location,
    line_number: u64,
    last_terminator: u64,
    incomplete_node: bool,
    fasta_parsing: bool,
    fasta_record: Option<(String, u64, String)>,
    eof_emitted: bool,
    gvf_mode: bool,
}

impl Gff3Parser {
    pub fn new() -> Self {
        Self::with_pool(InternPool::new())
    }

    pub fn with_pool(pool: InternPool) -> Self {
        Self {
            pool,
            mode: ParseMode::default(),
            checkids: false,
            checkregions: true,
            offset: None,
            offset_map: None,
            type_checker: None,
            xrf_checker: None,
            warning_sink: None,
            feature_info: FeatureInfo::new(),
            orphanage: Orphanage::new(),
            regions: HashMap::new(),
            used_types: BTreeSet::new(),
            location: Location::new("<unset>", 0),
            line_number: 0,
            last_terminator: 0,
            incomplete_node: false,
            fasta_parsing: false,
            fasta_record: None,
            eof_emitted: false,
            gvf_mode: false,
        }
    }

    pub fn pool(&self) -> &InternPool {
        &self.pool
    }

    pub fn set_mode(&mut self, mode: ParseMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Keep the ID table alive across `###` windows, making IDs globally
    /// unique per stream.
    pub fn check_id_attributes(&mut self) {
        self.checkids = true;
    }

    pub fn check_region_boundaries(&mut self, check: bool) {
        self.checkregions = check;
    }

    pub fn set_offset(&mut self, offset: i64) {
        debug_assert!(self.offset_map.is_none());
        self.offset = Some(offset);
    }

    /// Per-seqid offsets; a feature on a seqid absent from the map is an
    /// error.
    pub fn set_offset_map(&mut self, map: HashMap<String, i64>) {
        debug_assert!(self.offset.is_none());
        self.offset_map = Some(map);
    }

    pub fn set_type_checker(&mut self, checker: Arc<dyn TypeChecker>) {
        self.type_checker = Some(checker);
    }

    pub fn set_xrf_checker(&mut self, checker: Arc<dyn XrfChecker>) {
        self.xrf_checker = Some(checker);
    }

    pub fn set_warning_sink(&mut self, sink: WarningSink) {
        self.warning_sink = Some(sink);
    }

    /// Feature types observed so far, sorted.
    pub fn used_types(&self) -> Vec<String> {
        self.used_types.iter().cloned().collect()
    }

    /// True while some buffered node may still gain children or multi
    /// members; streams keep reading until this clears.
    pub fn has_incomplete_node(&self) -> bool {
        self.incomplete_node
    }

    /// Prepare for a new input file, keeping configuration.
    pub fn reset(&mut self, filename: &str) {
        self.feature_info.reset();
        self.orphanage.reset();
        self.regions.clear();
        self.location = Location::new(filename, 0);
        self.line_number = 0;
        self.last_terminator = 0;
        self.incomplete_node = false;
        self.fasta_parsing = false;
        self.fasta_record = None;
        self.eof_emitted = false;
        self.gvf_mode = false;
    }

    fn warn(&mut self, warning: Warning) {
        match &mut self.warning_sink {
            Some(sink) => sink(warning),
            None => tracing::warn!("{}", warning),
        }
    }

    fn here(&self) -> Location {
        self.location.with_line(self.line_number)
    }

    fn tidy(&self) -> bool {
        self.mode == ParseMode::Tidy
    }

    fn strict(&self) -> bool {
        self.mode == ParseMode::Strict
    }

    // ---- line dispatch ---------------------------------------------------

    /// Process one input line (without its trailing newline).
    pub fn parse_line(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        self.line_number += 1;

        if self.line_number == 1 && self.parse_first_line(line, out)? {
            return Ok(());
        }
        if line.is_empty() {
            let warning = Warning::new("skipping blank line").at(self.here());
            self.warn(warning);
            return Ok(());
        }
        if self.fasta_parsing || line.starts_with('>') {
            self.fasta_parsing = true;
            return self.parse_fasta_line(line, out);
        }
        if line.starts_with('#') {
            return self.parse_meta_line(line, out);
        }
        self.parse_feature_line(line, out)
    }

    /// End of input: flush FASTA and orphans, enforce the non-empty rule,
    /// emit the EOF node.
    pub fn finish(&mut self, out: &mut NodeQueue) -> Result<()> {
        self.flush_fasta_record(out);
        if self.line_number == 0 {
            if self.tidy() {
                let warning = Warning::new(format!(
                    "GFF3 file \"{}\" is empty",
                    self.location.filename()
                ));
                self.warn(warning);
            } else {
                return Err(Error::parse(format!(
                    "GFF3 file \"{}\" is empty",
                    self.location.filename()
                )));
            }
        }
        if !self.strict() {
            self.process_orphans(out)?;
        }
        if !self.eof_emitted {
            out.push_back(GenomeNode::Eof(EofNode::new(
                self.location.with_line(self.line_number + 1),
            )));
            self.eof_emitted = true;
        }
        Ok(())
    }

    // ---- header ----------------------------------------------------------

    /// Returns true when the line was consumed as a version pragma.
    fn parse_first_line(&mut self, line: &str, out: &mut NodeQueue) -> Result<bool> {
        let is_gff = line.starts_with(GFF_VERSION_PREFIX);
        let is_gvf = line.starts_with(GVF_VERSION_PREFIX);
        if !is_gff && !is_gvf {
            if self.tidy() {
                let warning = Warning::new(format!(
                    "line 1 in file \"{}\" does not begin with \"{}\" or \"{}\", create \"{} {}\" line automatically",
                    self.location.filename(),
                    GFF_VERSION_PREFIX,
                    GVF_VERSION_PREFIX,
                    GFF_VERSION_PREFIX,
                    GFF_VERSION
                ));
                self.warn(warning);
                return Ok(false);
            }
            return Err(Error::parse(format!(
                "line 1 in file \"{}\" does not begin with \"{}\" or \"{}\"",
                self.location.filename(),
                GFF_VERSION_PREFIX,
                GVF_VERSION_PREFIX
            )));
        }
        let (directive, data) = split_directive(line);
        let Some(data) = data else {
            return Err(Error::parse(
                "version pragma does not have a version number",
            )
            .at(self.here()));
        };
        if is_gvf {
            self.gvf_mode = true;
            out.push_back(GenomeNode::Meta(Arc::new(MetaNode::new(
                directive,
                data,
                self.here(),
            ))));
            return Ok(true);
        }
        let version: u32 = data.trim().parse().map_err(|_| {
            Error::parse(format!("could not parse version number \"{}\"", data)).at(self.here())
        })?;
        if version != GFF_VERSION {
            return Err(Error::parse(format!(
                "GFF version {} does not equal required version {}",
                version, GFF_VERSION
            ))
            .at(self.here()));
        }
        Ok(true)
    }

    // ---- FASTA -----------------------------------------------------------

    fn parse_fasta_line(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        if let Some(description) = line.strip_prefix('>') {
            self.flush_fasta_record(out);
            self.fasta_record = Some((description.to_owned(), self.line_number, String::new()));
            return Ok(());
        }
        match &mut self.fasta_record {
            Some((_, _, residues)) => {
                residues.extend(line.chars().filter(|c| !matches!(c, ' ' | '\r' | '\n')));
                Ok(())
            }
            None => Err(Error::parse("line does not start with '>' as expected")
                .at(self.here())),
        }
    }

    fn flush_fasta_record(&mut self, out: &mut NodeQueue) {
        if let Some((description, line, residues)) = self.fasta_record.take() {
            out.push_back(GenomeNode::Sequence(Arc::new(SequenceNode::new(
                description,
                residues,
                self.location.with_line(line),
            ))));
        }
    }

    // ---- meta lines ------------------------------------------------------

    fn parse_meta_line(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        debug_assert!(line.starts_with('#'));

        if line.len() == 1 || line.as_bytes()[1] != b'#' {
            out.push_back(GenomeNode::Comment(Arc::new(CommentNode::new(
                &line[1..],
                self.here(),
            ))));
            return Ok(());
        }
        if line == GFF_FASTA_DIRECTIVE {
            self.fasta_parsing = true;
            return Ok(());
        }
        if line.starts_with(GFF_SEQUENCE_REGION) {
            return self.parse_sequence_region(line, out);
        }
        if line.starts_with(GFF_TERMINATOR) {
            return self.handle_terminator(line, out);
        }
        if line.starts_with(GFF_VERSION_PREFIX) {
            if self.tidy() {
                let warning = Warning::new(format!(
                    "skipping illegal GFF version pragma: {}",
                    line
                ))
                .at(self.here());
                self.warn(warning);
                return Ok(());
            }
            return Err(
                Error::parse(format!("illegal GFF version pragma: {}", line)).at(self.here())
            );
        }
        if line.starts_with(GVF_VERSION_PREFIX) {
            if self.gvf_mode {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "skipping illegal GVF version pragma: {}",
                        line
                    ))
                    .at(self.here());
                    self.warn(warning);
                    return Ok(());
                }
                return Err(
                    Error::parse(format!("illegal GVF version pragma: {}", line)).at(self.here())
                );
            }
            let (directive, data) = split_directive(line);
            let Some(data) = data else {
                return Err(Error::parse(format!(
                    "meta-directive does not have data: {}",
                    line
                ))
                .at(self.here()));
            };
            self.gvf_mode = true;
            out.push_back(GenomeNode::Meta(Arc::new(MetaNode::new(
                directive,
                data,
                self.here(),
            ))));
            return Ok(());
        }

        // any other ## directive
        let known = known_pragma(line, self.gvf_mode);
        if !known {
            let warning = Warning::new(format!(
                "unknown meta-directive encountered, keep as comment: {}",
                line
            ))
            .at(self.here());
            self.warn(warning);
        }
        let (directive, data) = split_directive(line);
        let Some(data) = data else {
            return Err(Error::parse(format!(
                "meta-directive does not have data: {}",
                line
            ))
            .at(self.here()));
        };
        out.push_back(GenomeNode::Meta(Arc::new(MetaNode::new(
            directive,
            data,
            self.here(),
        ))));
        Ok(())
    }

    fn parse_sequence_region(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        let rest = &line[GFF_SEQUENCE_REGION.len()..];
        let mut tokens = rest.split_whitespace();
        let seqid = tokens.next().ok_or_else(|| {
            Error::parse("missing sequence region name").at(self.here())
        })?;
        let start = tokens.next().ok_or_else(|| {
            Error::parse("missing sequence region start").at(self.here())
        })?;
        let end = tokens.next().ok_or_else(|| {
            Error::parse("missing sequence region end").at(self.here())
        })?;

        let range = self.parse_range_by_mode(start, end)?;
        if range.start == 0 {
            return Err(Error::parse(
                "illegal region start 0 (GFF3 files are 1-based)",
            )
            .at(self.here()));
        }
        let range = self.apply_offset(range, seqid)?;

        match self.regions.get_mut(seqid) {
            Some(region) if !region.pseudo => {
                return Err(Error::parse(format!(
                    "the sequence region \"{}\" has already been defined",
                    seqid
                ))
                .at(self.here()));
            }
            Some(region) => {
                // a feature synthesized this region earlier; the declared
                // line takes over
                region.range = range;
                region.line_number = self.line_number;
                region.pseudo = false;
            }
            None => {
                self.regions.insert(
                    seqid.to_owned(),
                    SimpleRegion {
                        range,
                        line_number: self.line_number,
                        pseudo: false,
                        is_circular: false,
                    },
                );
            }
        }
        out.push_back(GenomeNode::Region(RegionNode::new(
            &self.pool,
            seqid,
            range,
            self.here(),
        )));
        Ok(())
    }

    fn handle_terminator(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        if line.len() > GFF_TERMINATOR.len() {
            let warning = Warning::new(format!(
                "superfluous information after terminator: {}",
                line
            ))
            .at(self.here());
            self.warn(warning);
        }
        if !self.strict() {
            self.process_orphans(out)?;
        }
        self.incomplete_node = false;
        // strict mode keeps the table so ID collisions across windows are
        // caught; the same holds when ids are checked globally
        if !self.checkids && !self.strict() {
            self.feature_info.reset();
        }
        self.last_terminator = self.line_number;
        Ok(())
    }

    // ---- feature lines ---------------------------------------------------

    fn parse_range_by_mode(&mut self, start: &str, end: &str) -> Result<Range> {
        match self.mode {
            ParseMode::Strict => parse_range(start, end).map_err(|e| e.at(self.here())),
            ParseMode::Relaxed => {
                parse_range_correct_neg(start, end).map_err(|e| e.at(self.here()))
            }
            ParseMode::Tidy => {
                let tidy = parse_range_tidy(start, end).map_err(|e| e.at(self.here()))?;
                if tidy.swapped {
                    let warning =
                        Warning::new("range start larger than end, swapping").at(self.here());
                    self.warn(warning);
                }
                Ok(tidy.range)
            }
        }
    }

    fn apply_offset(&self, range: Range, seqid: &str) -> Result<Range> {
        let offset = if let Some(offset) = self.offset {
            offset
        } else if let Some(map) = &self.offset_map {
            *map.get(seqid).ok_or_else(|| {
                Error::parse(format!("no offset mapping defined for seqid \"{}\"", seqid))
                    .at(self.here())
            })?
        } else {
            return Ok(range);
        };
        range.offset(offset).ok_or_else(|| {
            Error::parse(format!(
                "adding offset {} leads to underflow or start 0 (GFF3 files are 1-based)",
                offset
            ))
            .at(self.here())
        })
    }

    fn parse_feature_line(&mut self, line: &str, out: &mut NodeQueue) -> Result<()> {
        let mut fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 9 {
            if self.tidy() && fields.len() == 10 {
                let warning = Warning::new(
                    "line does not contain 9 tab (\\t) separated fields, dropping 10th field",
                )
                .at(self.here());
                self.warn(warning);
                fields.truncate(9);
            } else {
                return Err(Error::parse(
                    "line does not contain 9 tab (\\t) separated fields",
                )
                .at(self.here()));
            }
        }
        let [seqid, source, ftype, start, end, score, strand, phase, attributes]: [&str; 9] =
            fields[..9].try_into().expect("nine fields");

        if self.tidy() && (start.starts_with('.') || end.starts_with('.')) {
            let warning = Warning::new(format!(
                "feature \"{}\" has undefined range, discarding feature",
                ftype
            ))
            .at(self.here());
            self.warn(warning);
            return Ok(());
        }

        if let Some(checker) = &self.type_checker {
            if !checker.is_valid(ftype) {
                return Err(
                    Error::parse(format!("type \"{}\" is not a valid one", ftype))
                        .at(self.here()),
                );
            }
        }
        if !self.used_types.contains(ftype) {
            self.used_types.insert(ftype.to_owned());
        }

        let range = self.parse_range_by_mode(start, end)?;
        if range.start == 0 {
            return Err(Error::parse(
                "illegal feature start 0 (GFF3 files are 1-based)",
            )
            .at(self.here()));
        }
        let range = self.apply_offset(range, seqid)?;

        let score = parse_score(score).map_err(|e| e.at(self.here()))?;
        let strand = Strand::parse(strand).map_err(|e| e.at(self.here()))?;
        let phase = Phase::parse(phase).map_err(|e| e.at(self.here()))?;

        self.resolve_seqid(seqid, range)?;

        let node = FeatureNode::new(
            &self.pool,
            seqid,
            source,
            ftype,
            range,
            strand,
            self.here(),
        );

        let is_child = self.parse_attributes(attributes, &node, seqid, out)?;

        if let Some(score) = score {
            node.set_score(score);
        }
        if let Some(phase) = phase {
            node.set_phase(phase);
        }
        if !is_child {
            out.push_back(GenomeNode::Feature(node));
        }
        Ok(())
    }

    /// Ensure the seqid is known, synthesizing a pseudo region if needed,
    /// and check region boundaries for declared regions.
    fn resolve_seqid(&mut self, seqid: &str, range: Range) -> Result<()> {
        match self.regions.get(seqid) {
            None => {
                self.regions.insert(
                    seqid.to_owned(),
                    SimpleRegion {
                        range: Range::new(0, u64::MAX),
                        line_number: self.line_number,
                        pseudo: true,
                        is_circular: false,
                    },
                );
                Ok(())
            }
            Some(region) => {
                if self.checkregions
                    && !region.pseudo
                    && !region.is_circular
                    && !region.range.contains(&range)
                {
                    return Err(Error::parse(format!(
                        "range ({},{}) of feature is not contained in range ({},{}) of \
                         corresponding sequence region on line {}",
                        range.start,
                        range.end,
                        region.range.start,
                        region.range.end,
                        region.line_number
                    ))
                    .at(self.here()));
                }
                Ok(())
            }
        }
    }

    // ---- attributes ------------------------------------------------------

    /// Parse column 9, apply attribute side effects, and link the feature.
    /// Returns true when the feature became a child (or orphan) and must
    /// not be queued as a top-level node.
    fn parse_attributes(
        &mut self,
        attributes: &str,
        node: &FeatureRef,
        seqid: &str,
        out: &mut NodeQueue,
    ) -> Result<bool> {
        let mut is_child = false;
        let mut id_value: Option<String> = None;
        let mut parent_value: Option<String> = None;

        let tokens: Vec<&str> = attributes.split(';').collect();
        for token in &tokens {
            if token.starts_with('.') {
                if tokens.len() > 1 {
                    return Err(Error::parse(
                        "more than one attribute token defined, although the first one is '.'",
                    )
                    .at(self.here()));
                }
                break;
            }
            if token.chars().all(|c| c == ' ') {
                continue;
            }
            let mut parts = token.splitn(2, '=');
            let raw_tag = parts.next().unwrap_or("");
            let Some(value) = parts.next() else {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "token \"{}\" does not contain exactly one '='",
                        token
                    ))
                    .at(self.here());
                    self.warn(warning);
                    continue;
                }
                return Err(Error::parse(format!(
                    "token \"{}\" does not contain exactly one '='",
                    token
                ))
                .at(self.here()));
            };
            if value.contains('=') {
                return Err(Error::parse(format!(
                    "token \"{}\" does not contain exactly one '='",
                    token
                ))
                .at(self.here()));
            }
            // leading blanks are an artefact of hand-written files, not
            // part of the tag
            let tag = raw_tag.trim_start_matches(' ');

            if tag.is_empty() {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "attribute \"={}\" has no tag; skip it",
                        value
                    ))
                    .at(self.here());
                    self.warn(warning);
                    continue;
                }
                return Err(
                    Error::parse(format!("attribute \"={}\" has no tag", value)).at(self.here())
                );
            }
            if value.is_empty() {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "attribute \"{}=\" has no value; skip it",
                        tag
                    ))
                    .at(self.here());
                    self.warn(warning);
                    continue;
                }
                return Err(
                    Error::parse(format!("attribute \"{}=\" has no value", tag)).at(self.here())
                );
            }

            let mut tag = tag.to_owned();
            if tag.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                && !reserved_uppercase(&tag, self.gvf_mode)
            {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "illegal uppercase attribute \"{}\"; change to lowercase",
                        tag
                    ))
                    .at(self.here());
                    self.warn(warning);
                    tag = lowercase_first(&tag);
                } else {
                    return Err(Error::parse(format!(
                        "illegal uppercase attribute \"{}\" (uppercase attributes are reserved)",
                        tag
                    ))
                    .at(self.here()));
                }
            }

            // store the attribute; ID and Parent are re-created on output
            if node.has_attribute(&tag) {
                if self.tidy() {
                    let warning = Warning::new(format!(
                        "more than one {} attribute; join them",
                        tag
                    ))
                    .at(self.here());
                    self.warn(warning);
                    let joined = format!("{},{}", node.attribute(&tag).unwrap(), value);
                    node.set_attribute(&tag, &joined);
                } else {
                    return Err(Error::parse(format!(
                        "more than one {} attribute",
                        tag
                    ))
                    .at(self.here()));
                }
            } else {
                node.add_attribute(&tag, value);
            }

            // attributes with special meaning
            match tag.as_str() {
                GFF_ID => id_value = Some(node.attribute(GFF_ID).unwrap()),
                GFF_PARENT => parent_value = Some(node.attribute(GFF_PARENT).unwrap()),
                GFF_IS_CIRCULAR => {
                    if value != "true" {
                        return Err(Error::parse(format!(
                            "value \"{}\" of {} attribute does not equal \"true\"",
                            value, GFF_IS_CIRCULAR
                        ))
                        .at(self.here()));
                    }
                    let region = self
                        .regions
                        .get_mut(seqid)
                        .expect("seqid resolved before attributes");
                    region.is_circular = true;
                }
                GFF_TARGET => self.check_target_attribute(node, value)?,
                GFF_DBXREF | GFF_ONTOLOGY_TERM => {
                    if let Some(checker) = &self.xrf_checker {
                        for entry in value.split(',') {
                            if !checker.is_valid(entry) {
                                return Err(Error::parse(format!(
                                    "invalid {} value \"{}\"",
                                    tag, entry
                                ))
                                .at(self.here()));
                            }
                        }
                    }
                }
                GFF_GAP => self.check_gap_attribute(node, value)?,
                _ => {}
            }
        }

        if let Some(id) = &id_value {
            self.store_id(id, node, &mut is_child, out)?;
        }
        if let Some(parents) = &parent_value {
            self.process_parent_attr(parents, node, id_value.as_deref(), &mut is_child, out)?;
        }
        if node.is_multi() {
            let rep = FeatureNode::multi_representative(node).expect("multi member has rep");
            let id = node.attribute(GFF_ID).expect("multi member has ID");
            self.check_multi_constraints(node, &rep, &id)?;
        }
        Ok(is_child)
    }

    fn check_target_attribute(&mut self, node: &FeatureRef, value: &str) -> Result<()> {
        match TargetAttribute::parse_list(value, false) {
            Ok(_) => Ok(()),
            Err(err) => {
                if self.tidy() {
                    let (targets, _) = TargetAttribute::parse_list(value, true)
                        .map_err(|e| e.at(self.here()))?;
                    let rebuilt = TargetAttribute::build_list(&targets);
                    let warning = Warning::new(format!(
                        "corrected {} attribute to \"{}\"",
                        GFF_TARGET, rebuilt
                    ))
                    .at(self.here());
                    self.warn(warning);
                    node.set_attribute(GFF_TARGET, &rebuilt);
                    Ok(())
                } else {
                    Err(err.at(self.here()))
                }
            }
        }
    }

    fn check_gap_attribute(&mut self, node: &FeatureRef, value: &str) -> Result<()> {
        let Some(checker) = &self.type_checker else {
            return Ok(());
        };
        let kind = if checker.is_a(&node.type_name(), "protein_match") {
            GapKind::Protein
        } else {
            GapKind::Nucleotide
        };
        let gap = GapSpec::parse(value, kind).map_err(|e| e.at(self.here()))?;
        let reference = gap.reference_length().map_err(|e| e.at(self.here()))?;
        let feature_length = node.range().length();
        if reference != feature_length {
            return Err(Error::parse(format!(
                "length of aligned reference in {} attribute ({}) does not match the length \
                 of its {} feature ({})",
                GFF_GAP,
                reference,
                node.type_name(),
                feature_length
            ))
            .at(self.here()));
        }
        Ok(())
    }

    // ---- ID / multi-feature handling -------------------------------------

    fn store_id(
        &mut self,
        id: &str,
        node: &FeatureRef,
        is_child: &mut bool,
        out: &mut NodeQueue,
    ) -> Result<()> {
        if let Some(existing) = self.feature_info.get(id).cloned() {
            // the ID is taken: this line is another segment of the same
            // logical feature
            if existing.line_number() < self.last_terminator {
                return Err(Error::semantic(format!(
                    "the multi-feature with {} \"{}\" is separated from its counterpart on \
                     line {} by terminator {} on line {}",
                    GFF_ID,
                    id,
                    existing.line_number(),
                    GFF_TERMINATOR,
                    self.last_terminator
                ))
                .at(self.here()));
            }
            if existing.seqid_sym() != node.seqid_sym() {
                return Err(Error::semantic(format!(
                    "the multi-feature with {} \"{}\" has a different sequence id than its \
                     counterpart on line {}",
                    GFF_ID,
                    id,
                    existing.line_number()
                ))
                .at(self.here()));
            }
            debug_assert!(!existing.is_pseudo());
            let pseudo_parent = self.feature_info.pseudo_parent(id).cloned();
            let has_parent = existing.has_attribute(GFF_PARENT);
            if pseudo_parent.is_some() || !existing.is_multi() {
                match pseudo_parent {
                    None => {
                        FeatureNode::make_multi_representative(&existing);
                        if !has_parent {
                            // wrap both segments under a fresh pseudo root
                            let pseudo = FeatureNode::new_pseudo(&existing);
                            pseudo.add_child(Arc::clone(&existing));
                            self.feature_info.add_pseudo_parent(id, Arc::clone(&pseudo));
                            replace_node(&existing, &pseudo, out);
                            pseudo.add_child(Arc::clone(node));
                            *is_child = true;
                        }
                    }
                    Some(pseudo) => {
                        pseudo.add_child(Arc::clone(node));
                        *is_child = true;
                    }
                }
            } else {
                debug_assert!(has_parent);
                debug_assert!(FeatureNode::is_multi_representative(&existing));
            }
            FeatureNode::set_multi_representative(node, &existing);
        } else {
            self.feature_info.add(id, Arc::clone(node));
            if !self.strict() {
                self.orphanage.register_parent(id);
            }
        }
        self.incomplete_node = true;
        Ok(())
    }

    fn check_multi_constraints(
        &mut self,
        new: &FeatureRef,
        old: &FeatureRef,
        id: &str,
    ) -> Result<()> {
        if Arc::ptr_eq(new, old) {
            return Ok(());
        }
        debug_assert_eq!(new.seqid_sym(), old.seqid_sym());
        if new.source_sym() != old.source_sym() {
            return Err(self.multi_mismatch_error(id, old, "source"));
        }
        if new.type_sym() != old.type_sym() {
            return Err(self.multi_mismatch_error(id, old, "type"));
        }
        if new.strand() != old.strand() {
            return Err(self.multi_mismatch_error(id, old, "strand"));
        }

        // members must agree on all attributes except ID, Parent and Name;
        // Target is compared by target name only, Parent gets the tidy
        // split treatment
        let parent_mismatch = attribute_mismatch(new, old, GFF_PARENT);
        if parent_mismatch {
            if self.tidy() {
                self.tidy_multi_with_different_parent(new, old, id);
                return Ok(());
            }
            return Err(self.multi_mismatch_error(id, old, "Parent attribute"));
        }
        for side in [(new, old), (old, new)] {
            for tag in side.0.attribute_names() {
                if tag == GFF_ID || tag == GFF_PARENT || tag == GFF_NAME {
                    continue;
                }
                if tag == GFF_TARGET {
                    continue;
                }
                if attribute_mismatch(side.0, side.1, &tag) {
                    return Err(self.multi_mismatch_error(
                        id,
                        old,
                        &format!("'{}' attribute", tag),
                    ));
                }
            }
        }
        match (new.attribute(GFF_TARGET), old.attribute(GFF_TARGET)) {
            (Some(new_target), Some(old_target)) => {
                let (new_targets, _) = TargetAttribute::parse_list(&new_target, false)
                    .map_err(|e| e.at(self.here()))?;
                let (old_targets, _) = TargetAttribute::parse_list(&old_target, false)
                    .map_err(|e| e.at(self.here()))?;
                let new_name = new_targets.first().map(|t| t.id.as_str());
                let old_name = old_targets.first().map(|t| t.id.as_str());
                if new_name != old_name {
                    return Err(self.multi_mismatch_error(id, old, "Target name"));
                }
            }
            (None, None) => {}
            _ => {
                return Err(self.multi_mismatch_error(id, old, "'Target' attribute"));
            }
        }
        Ok(())
    }

    fn multi_mismatch_error(&self, id: &str, old: &FeatureRef, what: &str) -> Error {
        Error::semantic(format!(
            "the multi-feature with {} \"{}\" has a different {} than its counterpart on \
             line {}",
            GFF_ID,
            id,
            what,
            old.line_number()
        ))
        .at(self.here())
    }

    /// Tidy recovery: the new segment disagrees on `Parent`, so it stops
    /// being a multi member; the old one follows if it is the only child of
    /// its type under its parent.
    fn tidy_multi_with_different_parent(
        &mut self,
        new: &FeatureRef,
        old: &FeatureRef,
        id: &str,
    ) {
        let warning = Warning::new(format!(
            "the multi-feature with {} \"{}\" has a different attribute '{}' than its \
             counterpart on line {} ('{}' vs. '{}') -> tidy this as normal feature",
            GFF_ID,
            id,
            GFF_PARENT,
            old.line_number(),
            new.attribute(GFF_PARENT).unwrap_or_default(),
            old.attribute(GFF_PARENT).unwrap_or_default()
        ))
        .at(self.here());
        self.warn(warning);
        new.unset_multi();
        if let Some(parents) = old.attribute(GFF_PARENT) {
            let first = parents.split(',').next().unwrap_or(&parents);
            if let Some(parent) = self.feature_info.get(first) {
                if parent.number_of_children_of_type(old) == 1 {
                    old.unset_multi();
                }
            }
        }
    }

    // ---- Parent linking --------------------------------------------------

    fn process_parent_attr(
        &mut self,
        parent_attr: &str,
        node: &FeatureRef,
        id: Option<&str>,
        is_child: &mut bool,
        out: &mut NodeQueue,
    ) -> Result<()> {
        let parents: Vec<&str> = parent_attr.split(',').collect();
        debug_assert!(!parents.is_empty());

        let mut missing_parents: Vec<String> = Vec::new();
        let mut orphaned_parent = false;
        for parent in &parents {
            match self.feature_info.get(parent) {
                None => {
                    if self.strict() {
                        return Err(Error::semantic(format!(
                            "{} \"{}\" was not previously defined (via \"{}=\")",
                            GFF_PARENT, parent, GFF_ID
                        ))
                        .at(self.here()));
                    }
                    missing_parents.push((*parent).to_owned());
                }
                Some(parent_node) => {
                    if !self.strict() && self.orphanage.is_orphan(parent) {
                        // children of orphaned parents are orphans themselves
                        orphaned_parent = true;
                    } else if parent_node.seqid_sym() != node.seqid_sym() {
                        return Err(Error::semantic(format!(
                            "child has different sequence id than its parent on line {} \
                             ('{}' vs. '{}')",
                            parent_node.line_number(),
                            node.seqid(),
                            parent_node.seqid()
                        ))
                        .at(self.here()));
                    } else if Arc::ptr_eq(parent_node, node) {
                        return Err(Error::semantic(format!(
                            "feature is self-referential ({} and {} are the same)",
                            GFF_PARENT, GFF_ID
                        ))
                        .at(self.here()));
                    }
                }
            }
        }

        if missing_parents.is_empty() && !orphaned_parent {
            self.process_child(node, &parents, out)?;
        } else {
            debug_assert!(!self.strict());
            self.orphanage
                .add(Arc::clone(node), id, missing_parents);
            self.incomplete_node = true;
        }
        *is_child = true;
        Ok(())
    }

    fn process_child(
        &mut self,
        child: &FeatureRef,
        parents: &[&str],
        out: &mut NodeQueue,
    ) -> Result<()> {
        let mut valid_parents: Vec<String> = Vec::new();
        for parent in parents {
            let parent_node = self
                .feature_info
                .get(parent)
                .cloned()
                .expect("parent bound in this window");
            if parent_node.line_number() < self.last_terminator {
                return Err(Error::semantic(format!(
                    "the child with {} \"{}\" is separated from its corresponding {} on \
                     line {} by terminator {} on line {}",
                    GFF_PARENT,
                    parent,
                    GFF_PARENT,
                    parent_node.line_number(),
                    GFF_TERMINATOR,
                    self.last_terminator
                ))
                .at(self.location.with_line(child.line_number())));
            }
            // in strict mode cycles cannot arise by construction
            if !self.strict() && FeatureNode::subtree_contains(child, &parent_node) {
                return Err(Error::semantic(format!(
                    "linking the feature to its {} with {} \"{}\" would cause a cycle",
                    GFF_PARENT, GFF_ID, parent
                ))
                .at(self.location.with_line(child.line_number())));
            }
            if let Some(checker) = &self.type_checker {
                let parent_type = parent_node.type_name();
                let child_type = child.type_name();
                if !checker.is_partof(&parent_type, &child_type) {
                    return Err(Error::semantic(format!(
                        "the child feature with type '{}' is not part-of parent feature \
                         with type '{}' given on line {} (according to type checker '{}')",
                        child_type,
                        parent_type,
                        parent_node.line_number(),
                        checker.description()
                    ))
                    .at(self.location.with_line(child.line_number())));
                }
            }
            parent_node.add_child(Arc::clone(child));
            valid_parents.push((*parent).to_owned());
        }
        debug_assert_eq!(valid_parents.len(), parents.len());

        // make sure all parents share the same (pseudo-)root
        if valid_parents.len() >= 2 {
            let roots: Vec<FeatureRef> = valid_parents
                .iter()
                .map(|p| self.feature_info.find_root(p))
                .collect();
            if roots_differ(&roots) {
                self.join_roots(&roots, out);
            }
        }
        Ok(())
    }

    // ---- root unification ------------------------------------------------

    fn join_roots(&mut self, roots: &[FeatureRef], out: &mut NodeQueue) {
        let mut master = Arc::clone(&roots[0]);
        for root in &roots[1..] {
            master = self.join_root_pair(&master, root, out);
        }
    }

    fn join_root_pair(
        &mut self,
        a: &FeatureRef,
        b: &FeatureRef,
        out: &mut NodeQueue,
    ) -> FeatureRef {
        if Arc::ptr_eq(a, b) {
            return Arc::clone(a);
        }
        match (a.is_pseudo(), b.is_pseudo()) {
            (true, true) => self.merge_pseudo_roots(a, b, out),
            (true, false) => self.add_node_to_pseudo(a, b, out),
            (false, true) => self.add_node_to_pseudo(b, a, out),
            (false, false) => self.create_pseudo(a, b, out),
        }
    }

    fn merge_pseudo_roots(
        &mut self,
        pseudo_a: &FeatureRef,
        pseudo_b: &FeatureRef,
        out: &mut NodeQueue,
    ) -> FeatureRef {
        for child in pseudo_b.children() {
            pseudo_a.add_child(Arc::clone(&child));
            self.feature_info
                .replace_pseudo_parent(&child, Arc::clone(pseudo_a));
        }
        remove_node(pseudo_b, out);
        Arc::clone(pseudo_a)
    }

    fn add_node_to_pseudo(
        &mut self,
        pseudo: &FeatureRef,
        plain: &FeatureRef,
        out: &mut NodeQueue,
    ) -> FeatureRef {
        self.attach_to_pseudo(pseudo, plain);
        remove_node(plain, out);
        Arc::clone(pseudo)
    }

    fn create_pseudo(
        &mut self,
        a: &FeatureRef,
        b: &FeatureRef,
        out: &mut NodeQueue,
    ) -> FeatureRef {
        let pseudo = FeatureNode::new_pseudo(a);
        self.attach_to_pseudo(&pseudo, a);
        self.attach_to_pseudo(&pseudo, b);
        replace_node(a, &pseudo, out);
        remove_node(b, out);
        pseudo
    }

    fn attach_to_pseudo(&mut self, pseudo: &FeatureRef, child: &FeatureRef) {
        debug_assert!(pseudo.is_pseudo() && !child.is_pseudo());
        pseudo.add_child(Arc::clone(child));
        let id = child
            .attribute(GFF_ID)
            .expect("pseudo-grouped features carry an ID");
        self.feature_info
            .add_pseudo_parent(&id, Arc::clone(pseudo));
    }

    // ---- orphans ---------------------------------------------------------

    fn process_orphans(&mut self, out: &mut NodeQueue) -> Result<()> {
        while let Some(orphan) = self.orphanage.get_orphan() {
            let parent_attr = orphan
                .attribute(GFF_PARENT)
                .expect("orphans carry a Parent attribute");
            let parents: Vec<&str> = parent_attr.split(',').collect();
            let mut missing = None;
            for parent in &parents {
                if self.orphanage.parent_is_missing(parent) {
                    missing = Some((*parent).to_owned());
                    break;
                }
            }
            if let Some(parent) = missing {
                if self.tidy() {
                    // keep the orphan with its unresolved Parent verbatim
                    let warning = Warning::new(format!(
                        "{} \"{}\" was not defined (via \"{}=\"), keeping orphan",
                        GFF_PARENT, parent, GFF_ID
                    ))
                    .at(self
                        .location
                        .with_line(orphan.line_number()));
                    self.warn(warning);
                    out.push_back(GenomeNode::Feature(orphan));
                    continue;
                }
                return Err(Error::semantic(format!(
                    "{} \"{}\" was not defined (via \"{}=\")",
                    GFF_PARENT, parent, GFF_ID
                ))
                .at(self.location.with_line(orphan.line_number())));
            }
            self.process_child(&orphan, &parents, out)?;
        }
        Ok(())
    }
}

impl Default for Gff3Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ---- free helpers --------------------------------------------------------

/// Split a `##directive data` line into the directive (sans `##`) and its
/// data, separated by the first blank or tab.
fn split_directive(line: &str) -> (&str, Option<&str>) {
    let body = &line[2..];
    match body.find([' ', '\t']) {
        Some(at) => (&body[..at], Some(body[at + 1..].trim_start_matches(' '))),
        None => (body, None),
    }
}

fn known_pragma(line: &str, gvf_mode: bool) -> bool {
    let gff = GFF_KNOWN_PRAGMAS.iter().any(|p| line.starts_with(p));
    if gvf_mode {
        gff || GVF_KNOWN_PRAGMAS.iter().any(|p| line.starts_with(p))
    } else {
        gff
    }
}

fn reserved_uppercase(tag: &str, gvf_mode: bool) -> bool {
    let gff = GFF_RESERVED_ATTRIBUTES.contains(&tag);
    if gvf_mode {
        gff || GVF_RESERVED_ATTRIBUTES.contains(&tag)
    } else {
        gff
    }
}

fn lowercase_first(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn attribute_mismatch(a: &FeatureRef, b: &FeatureRef, tag: &str) -> bool {
    a.attribute(tag) != b.attribute(tag)
}

fn roots_differ(roots: &[FeatureRef]) -> bool {
    roots[1..].iter().any(|r| !Arc::ptr_eq(r, &roots[0]))
}

/// Swap `old` for `new` in the output buffer. Searched in reverse because
/// merges target the most recent additions.
fn replace_node(old: &FeatureRef, new: &FeatureRef, out: &mut NodeQueue) {
    for slot in out.iter_mut().rev() {
        if slot.as_feature().is_some_and(|f| Arc::ptr_eq(f, old)) {
            *slot = GenomeNode::Feature(Arc::clone(new));
            return;
        }
    }
    debug_assert!(false, "node to replace not found in output buffer");
}

fn remove_node(node: &FeatureRef, out: &mut NodeQueue) {
    if let Some(at) = out
        .iter()
        .rposition(|slot| slot.as_feature().is_some_and(|f| Arc::ptr_eq(f, node)))
    {
        out.remove(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(input: &str, mode: ParseMode) -> Result<Vec<GenomeNode>> {
        let mut parser = Gff3Parser::new();
        parser.set_mode(mode);
        parser.reset("test.gff3");
        let mut out = NodeQueue::new();
        for line in input.lines() {
            parser.parse_line(line, &mut out)?;
        }
        parser.finish(&mut out)?;
        Ok(out.into_iter().collect())
    }

    fn features(nodes: &[GenomeNode]) -> Vec<FeatureRef> {
        nodes
            .iter()
            .filter_map(|n| n.as_feature().cloned())
            .collect()
    }

    #[test]
    fn basic_parent_child_tree() {
        let nodes = parse_all(
            "##gff-version 3\n\
             ##sequence-region chr1 1 1000\n\
             chr1\tex\tgene\t100\t400\t.\t+\t.\tID=g1\n\
             chr1\tex\tmRNA\t100\t400\t.\t+\t.\tID=m1;Parent=g1\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=m1\n\
             chr1\tex\texon\t300\t400\t.\t+\t.\tParent=m1\n\
             ###\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats.len(), 1, "one top-level tree");
        let gene = &feats[0];
        assert_eq!(gene.type_name(), "gene");
        let mrna = &gene.children()[0];
        assert_eq!(mrna.type_name(), "mRNA");
        assert_eq!(mrna.number_of_children(), 2);
        let exon_ranges: Vec<Range> = mrna.children().iter().map(|c| c.range()).collect();
        assert_eq!(exon_ranges, [Range::new(100, 200), Range::new(300, 400)]);
        assert!(nodes.last().unwrap().is_eof());
    }

    #[test]
    fn multi_feature_wrapped_under_pseudo_root() {
        let nodes = parse_all(
            "##gff-version 3\n\
             chr1\tex\tCDS\t100\t200\t.\t+\t0\tID=cds1\n\
             chr1\tex\tCDS\t300\t400\t.\t+\t0\tID=cds1\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats.len(), 1);
        let pseudo = &feats[0];
        assert!(pseudo.is_pseudo());
        assert_eq!(pseudo.number_of_children(), 2);
        assert_eq!(pseudo.range(), Range::new(100, 400));
        let kids = pseudo.children();
        assert!(kids[0].is_multi() && kids[1].is_multi());
        let rep = FeatureNode::multi_representative(&kids[1]).unwrap();
        assert!(Arc::ptr_eq(&rep, &kids[0]));
    }

    #[test]
    fn missing_parent_is_error_by_default() {
        let err = parse_all(
            "##gff-version 3\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=g_missing\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("g_missing"));
    }

    #[test]
    fn missing_parent_kept_in_tidy_mode() {
        let nodes = parse_all(
            "##gff-version 3\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=g_missing\n",
            ParseMode::Tidy,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats.len(), 1);
        assert_eq!(feats[0].attribute("Parent").as_deref(), Some("g_missing"));
    }

    #[test]
    fn terminator_is_an_id_barrier_in_strict_mode() {
        let err = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t100\t200\t.\t+\t.\tID=x\n\
             ###\n\
             chr1\tex\tgene\t300\t400\t.\t+\t.\tID=x\n",
            ParseMode::Strict,
        )
        .unwrap_err();
        assert!(err.message().contains("terminator"));
        assert!(err.message().contains("on line 3"));
    }

    #[test]
    fn multi_feature_across_terminator_is_error_with_checkids() {
        let mut parser = Gff3Parser::new();
        parser.reset("test.gff3");
        parser.check_id_attributes();
        let mut out = NodeQueue::new();
        let lines = [
            "##gff-version 3",
            "chr1\tex\tgene\t100\t200\t.\t+\t.\tID=x",
            "###",
            "chr1\tex\tgene\t300\t400\t.\t+\t.\tID=x",
        ];
        let mut result = Ok(());
        for line in lines {
            result = parser.parse_line(line, &mut out);
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert!(err.message().contains("terminator"));
        assert!(err.message().contains("on line 3"));
    }

    #[test]
    fn child_with_different_seqid_is_rejected() {
        let err = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t100\t400\t.\t+\t.\tID=g1\n\
             chr2\tex\tmRNA\t100\t400\t.\t+\t.\tParent=g1\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("different sequence id"));
    }

    #[test]
    fn self_reference_is_rejected() {
        let err = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t100\t400\t.\t+\t.\tID=g1;Parent=g1\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("self-referential"));
    }

    #[test]
    fn two_parents_share_one_root_after_unification() {
        let nodes = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t1000\t.\t+\t.\tID=g1\n\
             chr1\tex\tgene\t2000\t3000\t.\t+\t.\tID=g2\n\
             chr1\tex\tmRNA\t1\t3000\t.\t+\t.\tID=m1;Parent=g1,g2\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats.len(), 1, "both genes now share a pseudo root");
        let pseudo = &feats[0];
        assert!(pseudo.is_pseudo());
        assert_eq!(pseudo.number_of_children(), 2);
        assert_eq!(pseudo.range(), Range::new(1, 3000));
    }

    #[test]
    fn version_header_is_required_outside_tidy() {
        let err = parse_all("chr1\tex\tgene\t1\t10\t.\t+\t.\tID=g1\n", ParseMode::Relaxed)
            .unwrap_err();
        assert!(err.message().contains("##gff-version"));

        let nodes = parse_all("chr1\tex\tgene\t1\t10\t.\t+\t.\tID=g1\n", ParseMode::Tidy)
            .unwrap();
        assert_eq!(features(&nodes).len(), 1);
    }

    #[test]
    fn wrong_version_number_is_rejected() {
        assert!(parse_all("##gff-version 2\n", ParseMode::Relaxed).is_err());
    }

    #[test]
    fn ten_fields_only_tolerated_in_tidy() {
        let line = "##gff-version 3\nchr1\tex\tgene\t1\t10\t.\t+\t.\tID=g1\textra\n";
        assert!(parse_all(line, ParseMode::Relaxed).is_err());
        let nodes = parse_all(line, ParseMode::Tidy).unwrap();
        assert_eq!(features(&nodes).len(), 1);
    }

    #[test]
    fn duplicate_attributes_joined_in_tidy() {
        let line = "##gff-version 3\nchr1\tex\tgene\t1\t10\t.\t+\t.\tID=g1;note=a;note=b\n";
        assert!(parse_all(line, ParseMode::Relaxed).is_err());
        let nodes = parse_all(line, ParseMode::Tidy).unwrap();
        let feats = features(&nodes);
        assert_eq!(feats[0].attribute("note").as_deref(), Some("a,b"));
    }

    #[test]
    fn unknown_uppercase_attribute_policy() {
        let line = "##gff-version 3\nchr1\tex\tgene\t1\t10\t.\t+\t.\tFancy=1\n";
        assert!(parse_all(line, ParseMode::Relaxed).is_err());
        let nodes = parse_all(line, ParseMode::Tidy).unwrap();
        let feats = features(&nodes);
        assert_eq!(feats[0].attribute("fancy").as_deref(), Some("1"));
        assert!(feats[0].attribute("Fancy").is_none());
    }

    #[test]
    fn region_boundary_check() {
        let err = parse_all(
            "##gff-version 3\n\
             ##sequence-region chr1 1 500\n\
             chr1\tex\tgene\t100\t900\t.\t+\t.\tID=g1\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("not contained"));
    }

    #[test]
    fn region_redefinition_is_rejected() {
        let err = parse_all(
            "##gff-version 3\n\
             ##sequence-region chr1 1 500\n\
             ##sequence-region chr1 1 900\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("already been defined"));
    }

    #[test]
    fn feature_start_zero_is_rejected() {
        let err = parse_all(
            "##gff-version 3\nchr1\tex\tgene\t0\t10\t.\t+\t.\tID=g1\n",
            ParseMode::Strict,
        )
        .unwrap_err();
        assert!(err.message().contains("1-based") || err.message().contains("negative"));
    }

    #[test]
    fn offsets_shift_features_and_regions() {
        let mut parser = Gff3Parser::new();
        parser.reset("test.gff3");
        parser.set_offset(1000);
        let mut out = NodeQueue::new();
        for line in [
            "##gff-version 3",
            "##sequence-region chr1 1 500",
            "chr1\tex\tgene\t100\t200\t.\t+\t.\tID=g1",
        ] {
            parser.parse_line(line, &mut out).unwrap();
        }
        parser.finish(&mut out).unwrap();
        let nodes: Vec<GenomeNode> = out.into_iter().collect();
        let region = nodes
            .iter()
            .find_map(|n| n.as_region().cloned())
            .expect("region emitted");
        assert_eq!(region.range(), Range::new(1001, 1500));
        let feats = features(&nodes);
        assert_eq!(feats[0].range(), Range::new(1100, 1200));
    }

    #[test]
    fn negative_offset_underflow_is_error() {
        let mut parser = Gff3Parser::new();
        parser.reset("test.gff3");
        parser.set_offset(-100);
        let mut out = NodeQueue::new();
        parser.parse_line("##gff-version 3", &mut out).unwrap();
        let err = parser
            .parse_line("chr1\tex\tgene\t50\t200\t.\t+\t.\tID=g1", &mut out)
            .unwrap_err();
        assert!(err.message().contains("offset"));
    }

    #[test]
    fn fasta_section_becomes_sequence_nodes() {
        let nodes = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t10\t.\t+\t.\tID=g1\n\
             ##FASTA\n\
             >chr1 test\n\
             ACGT\n\
             ACGT\n\
             >chr2\n\
             GGCC\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let seqs: Vec<_> = nodes
            .iter()
            .filter_map(|n| match n {
                GenomeNode::Sequence(s) => Some(Arc::clone(s)),
                _ => None,
            })
            .collect();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].description(), "chr1 test");
        assert_eq!(seqs[0].residues(), "ACGTACGT");
        assert_eq!(seqs[1].residues(), "GGCC");
    }

    #[test]
    fn empty_file_policy() {
        assert!(parse_all("", ParseMode::Relaxed).is_err());
        let nodes = parse_all("", ParseMode::Tidy).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_eof());
    }

    #[test]
    fn comments_and_unknown_directives_are_kept() {
        let nodes = parse_all(
            "##gff-version 3\n\
             #plain comment\n\
             ##species http://example.org/human\n\
             ##mystery data here\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let comment = nodes
            .iter()
            .find_map(|n| match n {
                GenomeNode::Comment(c) => Some(c.text().to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(comment, "plain comment");
        let metas: Vec<String> = nodes
            .iter()
            .filter_map(|n| match n {
                GenomeNode::Meta(m) => Some(m.directive().to_owned()),
                _ => None,
            })
            .collect();
        assert_eq!(metas, ["species", "mystery"]);
    }

    #[test]
    fn is_circular_keeps_region_range() {
        // circular feature: the synthesized region keeps the feature range
        let nodes = parse_all(
            "##gff-version 3\n\
             chrM\tex\tregion\t1\t16569\t.\t+\t.\tID=r1;Is_circular=true\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        assert_eq!(features(&nodes).len(), 1);
        assert!(parse_all(
            "##gff-version 3\nchrM\tex\tregion\t1\t10\t.\t+\t.\tIs_circular=yes\n",
            ParseMode::Relaxed,
        )
        .is_err());
    }

    #[test]
    fn gvf_header_allows_gvf_attributes() {
        let nodes = parse_all(
            "##gvf-version 1.06\n\
             chr1\tex\tSNV\t100\t100\t.\t+\t.\tID=v1;Variant_seq=A;Reference_seq=G\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats[0].attribute("Variant_seq").as_deref(), Some("A"));
        let meta = nodes
            .iter()
            .find_map(|n| match n {
                GenomeNode::Meta(m) => Some(m.directive().to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(meta, "gvf-version");
    }

    #[test]
    fn cycle_through_shared_window_is_detected() {
        // g1 -> m1 (child), then a line tries to make g1 a child of m1
        let err = parse_all(
            "##gff-version 3\n\
             chr1\tex\tgene\t1\t100\t.\t+\t.\tID=g1\n\
             chr1\tex\tmRNA\t1\t100\t.\t+\t.\tID=m1;Parent=g1\n\
             chr1\tex\tgene\t1\t100\t.\t+\t.\tID=g1;Parent=m1\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        // the second ID=g1 line makes a multi-feature first; its Parent
        // differs from the representative which is caught as a constraint
        // violation before any cycle can close
        assert!(
            err.message().contains("cycle") || err.message().contains("Parent"),
            "unexpected: {}",
            err.message()
        );
    }

    #[test]
    fn orphan_resolved_later_in_window() {
        let nodes = parse_all(
            "##gff-version 3\n\
             chr1\tex\texon\t100\t200\t.\t+\t.\tParent=m1\n\
             chr1\tex\tmRNA\t100\t400\t.\t+\t.\tID=m1\n",
            ParseMode::Relaxed,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats.len(), 1);
        assert_eq!(feats[0].type_name(), "mRNA");
        assert_eq!(feats[0].number_of_children(), 1);
    }

    #[test]
    fn target_attribute_is_validated() {
        assert!(parse_all(
            "##gff-version 3\nchr1\tex\tmatch\t1\t10\t.\t+\t.\tTarget=EST1 10\n",
            ParseMode::Relaxed,
        )
        .is_err());
        let nodes = parse_all(
            "##gff-version 3\nchr1\tex\tmatch\t1\t10\t.\t+\t.\tTarget=EST1 10 1\n",
            ParseMode::Tidy,
        )
        .unwrap();
        let feats = features(&nodes);
        assert_eq!(feats[0].attribute("Target").as_deref(), Some("EST1 1 10"));
    }

    #[test]
    fn multi_member_source_mismatch_is_error() {
        let err = parse_all(
            "##gff-version 3\n\
             chr1\texA\tCDS\t1\t10\t.\t+\t.\tID=c1\n\
             chr1\texB\tCDS\t20\t30\t.\t+\t.\tID=c1\n",
            ParseMode::Relaxed,
        )
        .unwrap_err();
        assert!(err.message().contains("different source"));
    }
}
