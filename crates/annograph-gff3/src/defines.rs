//! GFF3/GVF pragma and attribute names.

/* version */
pub const GFF_VERSION: u32 = 3;

/* pragmas */
pub const GFF_VERSION_PREFIX: &str = "##gff-version";
pub const GVF_VERSION_PREFIX: &str = "##gvf-version";
pub const GFF_FASTA_DIRECTIVE: &str = "##FASTA";
pub const GFF_SEQUENCE_REGION: &str = "##sequence-region";
pub const GFF_TERMINATOR: &str = "###";

/// GFF3 pragmas recognized without a warning (beyond the structural ones
/// above).
pub const GFF_KNOWN_PRAGMAS: &[&str] = &[
    "##species",
    "##feature-ontology",
    "##attribute-ontology",
    "##source-ontology",
    "##NCBI_Taxonomy_URI",
    "##genome-build",
];

/// Additional pragmas recognized in GVF mode.
pub const GVF_KNOWN_PRAGMAS: &[&str] = &[
    "##reference-fasta",
    "##feature-gff3",
    "##file-version",
    "##file-date",
    "##individual-id",
    "##population",
    "##sex",
    "##technology-platform",
    "##technology-platform-class",
    "##technology-platform-name",
    "##technology-platform-version",
    "##technology-platform-machine-id",
    "##technology-platform-read-length",
    "##technology-platform-read-type",
    "##technology-platform-read-pair-span",
    "##technology-platform-average-coverage",
    "##sequencing-scope",
    "##capture-method",
    "##capture-regions",
    "##sequence-alignment",
    "##variant-calling",
    "##sample-description",
    "##genomic-source",
    "##multi-individual",
    "##data-source",
    "##score-method",
    "##source-method",
    "##attribute-method",
    "##phenotype-description",
    "##phased-genotypes",
];

/* predefined attributes */
pub const GFF_ID: &str = "ID";
pub const GFF_NAME: &str = "Name";
pub const GFF_ALIAS: &str = "Alias";
pub const GFF_PARENT: &str = "Parent";
pub const GFF_TARGET: &str = "Target";
pub const GFF_GAP: &str = "Gap";
pub const GFF_DERIVES_FROM: &str = "Derives_from";
pub const GFF_NOTE: &str = "Note";
pub const GFF_DBXREF: &str = "Dbxref";
pub const GFF_ONTOLOGY_TERM: &str = "Ontology_term";
pub const GFF_START_RANGE: &str = "Start_range";
pub const GFF_END_RANGE: &str = "End_range";
pub const GFF_IS_CIRCULAR: &str = "Is_circular";

/// The uppercase attribute tags GFF3 reserves.
pub const GFF_RESERVED_ATTRIBUTES: &[&str] = &[
    GFF_ID,
    GFF_NAME,
    GFF_ALIAS,
    GFF_PARENT,
    GFF_TARGET,
    GFF_GAP,
    GFF_DERIVES_FROM,
    GFF_NOTE,
    GFF_DBXREF,
    GFF_ONTOLOGY_TERM,
    GFF_START_RANGE,
    GFF_END_RANGE,
    GFF_IS_CIRCULAR,
];

/// The uppercase attribute tags the GVF extension adds.
pub const GVF_RESERVED_ATTRIBUTES: &[&str] = &[
    "Genotype",
    "Reference_seq",
    "Variant_seq",
    "Variant_freq",
    "Variant_effect",
    "Variant_reads",
    "Total_reads",
    "Phased",
    "Start_range",
    "End_range",
    "Individual",
    "Reference_codon",
    "Variant_codon",
    "Reference_aa",
    "Variant_aa",
    "Breakpoint_detail",
    "Sequence_context",
    "Zygosity",
];
