use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Genomic strand of an annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    fn parse(s: &str) -> Option<Strand> {
        match s {
            "+" => Some(Strand::Forward),
            "-" => Some(Strand::Reverse),
            "." | "?" => Some(Strand::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureType {
    Transcript,
    Exon,
    Other(String),
}

impl From<&str> for FeatureType {
    fn from(s: &str) -> Self {
        match s {
            "transcript" => FeatureType::Transcript,
            "exon" => FeatureType::Exon,
            other => FeatureType::Other(other.to_string()),
        }
    }
}

/// Where the gene name of a record comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeneNameSource {
    /// Value of the first attribute (`gene_id "NAME"; ...`).
    #[default]
    FirstAttribute,
    /// Value of a named attribute such as `gene_name`.
    Key(String),
}

/// One row of a GTF-like annotation table.
///
/// Coordinates are kept exactly as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub chromosome: String,
    pub feature_type: FeatureType,
    pub start: u64,
    pub end: u64,
    pub strand: Strand,
    pub gene_name: String,
}

/// Parsing errors for annotation and feature tables.
#[derive(Debug)]
pub enum ParseError {
    Io(std::io::Error),
    MalformedLine { line_no: usize, line: String },
    BadCoordinates { line_no: usize, line: String },
    BadStrand { line_no: usize, strand: String },
    MissingGeneName { line_no: usize, attributes: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
            ParseError::MalformedLine { line_no, line } => {
                write!(f, "line {}: malformed record: {}", line_no, line)
            }
            ParseError::BadCoordinates { line_no, line } => {
                write!(f, "line {}: bad coordinates: {}", line_no, line)
            }
            ParseError::BadStrand { line_no, strand } => {
                write!(f, "line {}: unrecognized strand '{}'", line_no, strand)
            }
            ParseError::MissingGeneName { line_no, attributes } => {
                write!(f, "line {}: no gene name in attributes '{}'", line_no, attributes)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// Split a GTF (`key "value";`) or GFF3 (`key=value;`) attribute column
/// into ordered key/value pairs. Quotes around values are removed.
pub fn parse_attributes(s: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for part in s.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once('=') {
            Some((k, v)) if !k.contains(char::is_whitespace) => (k, v),
            _ => part.split_once(char::is_whitespace).unwrap_or((part, "")),
        };
        let value = value.trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        pairs.push((key.trim(), value));
    }
    pairs
}

fn gene_name_from(attributes: &str, source: &GeneNameSource) -> Option<String> {
    let pairs = parse_attributes(attributes);
    let value = match source {
        GeneNameSource::FirstAttribute => pairs.first().map(|(_, v)| *v),
        GeneNameSource::Key(key) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| *v),
    };
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse one non-comment GTF line.
pub fn parse_record_line(
    line: &str,
    line_no: usize,
    source: &GeneNameSource,
) -> Result<AnnotationRecord, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return Err(ParseError::MalformedLine { line_no, line: line.to_string() });
    }

    let bad_coords = || ParseError::BadCoordinates { line_no, line: line.to_string() };
    let start: u64 = fields[3].trim().parse().map_err(|_| bad_coords())?;
    let end: u64 = fields[4].trim().parse().map_err(|_| bad_coords())?;
    if end < start {
        return Err(bad_coords());
    }

    let strand = Strand::parse(fields[6].trim()).ok_or_else(|| ParseError::BadStrand {
        line_no,
        strand: fields[6].to_string(),
    })?;

    let gene_name = gene_name_from(fields[8], source).ok_or_else(|| {
        ParseError::MissingGeneName { line_no, attributes: fields[8].to_string() }
    })?;

    Ok(AnnotationRecord {
        chromosome: fields[0].to_string(),
        feature_type: FeatureType::from(fields[2]),
        start,
        end,
        strand,
        gene_name,
    })
}

fn is_drawn_type(line: &str) -> bool {
    matches!(line.split('\t').nth(2), Some("transcript" | "exon"))
}

/// Read every transcript and exon record of an annotation table.
///
/// Rows of other feature types are skipped before they are parsed, so only
/// a malformed transcript or exon row fails the read.
pub fn read_annotation<R: BufRead>(
    reader: R,
    source: &GeneNameSource,
) -> Result<Vec<AnnotationRecord>, ParseError> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Lines too short to carry a type column still go to the parser.
        if line.split('\t').count() >= 9 && !is_drawn_type(line) {
            skipped += 1;
            continue;
        }
        records.push(parse_record_line(line, idx + 1, source)?);
    }

    debug!("Kept {} transcript/exon records, skipped {} others", records.len(), skipped);
    Ok(records)
}

pub fn load_annotation(path: &Path, source: &GeneNameSource) -> Result<Vec<AnnotationRecord>, ParseError> {
    let file = File::open(path)?;
    read_annotation(BufReader::new(file), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_gtf_transcript_line() {
        let line = "chr1\tHAVANA\ttranscript\t11869\t14409\t.\t+\t.\tgene_id \"DDX11L1\"; gene_type \"lncRNA\";";
        let rec = parse_record_line(line, 1, &GeneNameSource::FirstAttribute).unwrap();
        assert_eq!(rec.chromosome, "chr1");
        assert_eq!(rec.feature_type, FeatureType::Transcript);
        assert_eq!(rec.start, 11869);
        assert_eq!(rec.end, 14409);
        assert_eq!(rec.strand, Strand::Forward);
        assert_eq!(rec.gene_name, "DDX11L1");
    }

    #[test]
    fn gene_name_by_key() {
        let line = "chr2\tsrc\texon\t5\t20\t.\t-\t.\tgene_id \"ENSG01\"; gene_name \"TP53\";";
        let source = GeneNameSource::Key("gene_name".to_string());
        let rec = parse_record_line(line, 1, &source).unwrap();
        assert_eq!(rec.gene_name, "TP53");
        assert_eq!(rec.strand, Strand::Reverse);
    }

    #[test]
    fn gff3_attributes() {
        let pairs = parse_attributes("ID=ex1;Parent=tx1;gene_name=G9");
        assert_eq!(pairs, vec![("ID", "ex1"), ("Parent", "tx1"), ("gene_name", "G9")]);
    }

    #[test]
    fn gtf_value_with_equals_sign_stays_gtf() {
        let pairs = parse_attributes("gene_id \"a=b\"; tag \"basic\"");
        assert_eq!(pairs, vec![("gene_id", "a=b"), ("tag", "basic")]);
    }

    #[test]
    fn empty_attribute_value_is_an_error() {
        let line = "chr1\tsrc\texon\t1\t2\t.\t+\t.\tgene_id \"\";";
        let err = parse_record_line(line, 7, &GeneNameSource::FirstAttribute).unwrap_err();
        assert!(matches!(err, ParseError::MissingGeneName { line_no: 7, .. }));

        let line = "chr1\tsrc\texon\t1\t2\t.\t+\t.\t";
        assert!(parse_record_line(line, 1, &GeneNameSource::FirstAttribute).is_err());
    }

    #[test]
    fn unknown_strand_symbols() {
        let dot = "chr1\tsrc\texon\t1\t2\t.\t.\t.\tgene_id \"A\";";
        let rec = parse_record_line(dot, 1, &GeneNameSource::FirstAttribute).unwrap();
        assert_eq!(rec.strand, Strand::Unknown);

        let bad = "chr1\tsrc\texon\t1\t2\t.\tx\t.\tgene_id \"A\";";
        let err = parse_record_line(bad, 3, &GeneNameSource::FirstAttribute).unwrap_err();
        assert!(matches!(err, ParseError::BadStrand { line_no: 3, .. }));
    }

    #[test]
    fn short_and_inverted_lines_fail() {
        let short = "chr1\tsrc\texon\t1\t2";
        assert!(matches!(
            parse_record_line(short, 1, &GeneNameSource::FirstAttribute),
            Err(ParseError::MalformedLine { .. })
        ));
        let inverted = "chr1\tsrc\texon\t20\t2\t.\t+\t.\tgene_id \"A\";";
        assert!(matches!(
            parse_record_line(inverted, 1, &GeneNameSource::FirstAttribute),
            Err(ParseError::BadCoordinates { .. })
        ));
    }

    #[test]
    fn reader_keeps_transcripts_and_exons() {
        let data = "\
#!genome-build GRCh38
chr1\tsrc\tgene\t1\t100\t.\t+\t.\tgene_id \"A\";
chr1\tsrc\ttranscript\t1\t100\t.\t+\t.\tgene_id \"A\";

chr1\tsrc\texon\t1\t20\t.\t+\t.\tgene_id \"A\";
chr1\tsrc\tCDS\t5\t20\t.\t+\t0\tgene_id \"A\";
";
        let recs = read_annotation(Cursor::new(data), &GeneNameSource::FirstAttribute).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].feature_type, FeatureType::Transcript);
        assert_eq!(recs[1].feature_type, FeatureType::Exon);
    }

    #[test]
    fn reader_ignores_gene_names_of_skipped_rows() {
        let data = "\
chr1\tRefSeq\tregion\t1\t248956422\t.\t+\t.\tID=NC_000001.11:1..248956422;chromosome=1
chr1\tRefSeq\tgene\t10\t90\t.\t?\t.\tID=gene1
chr1\tRefSeq\ttranscript\t10\t90\t.\t+\t.\tID=rna1;gene_name=GATA1
";
        let source = GeneNameSource::Key("gene_name".to_string());
        let recs = read_annotation(Cursor::new(data), &source).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].gene_name, "GATA1");
        assert_eq!(recs[0].feature_type, FeatureType::Transcript);
    }

    #[test]
    fn reader_still_rejects_exon_without_gene_name() {
        let data = "\
chr1\tRefSeq\ttranscript\t10\t90\t.\t+\t.\tID=rna1;gene_name=GATA1
chr1\tRefSeq\texon\t10\t40\t.\t+\t.\tID=exon1
";
        let source = GeneNameSource::Key("gene_name".to_string());
        let err = read_annotation(Cursor::new(data), &source).unwrap_err();
        assert!(matches!(err, ParseError::MissingGeneName { line_no: 2, .. }));
    }

    #[test]
    fn reader_reports_line_number_of_bad_record() {
        let data = "chr1\tsrc\texon\t1\t20\t.\t+\t.\tgene_id \"A\";\nchr1\tsrc\texon\tx\t20\t.\t+\t.\tgene_id \"A\";\n";
        let err = read_annotation(Cursor::new(data), &GeneNameSource::FirstAttribute).unwrap_err();
        assert!(matches!(err, ParseError::BadCoordinates { line_no: 2, .. }));
    }
}
