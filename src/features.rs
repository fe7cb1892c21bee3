use crate::annotation::ParseError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A generic drawable feature from a BED-like table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub label: Option<String>,
}

/// Lines that carry no interval in BED-like files.
pub(crate) fn is_bed_header(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser")
}

/// Parse `chrom<TAB>start<TAB>end[<TAB>name...]`.
pub(crate) fn parse_bed_line(line: &str, line_no: usize) -> Result<FeatureRecord, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(ParseError::MalformedLine { line_no, line: line.to_string() });
    }

    let bad_coords = || ParseError::BadCoordinates { line_no, line: line.to_string() };
    let start: u64 = fields[1].trim().parse().map_err(|_| bad_coords())?;
    let end: u64 = fields[2].trim().parse().map_err(|_| bad_coords())?;
    if end < start {
        return Err(bad_coords());
    }

    let label = fields
        .get(3)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(FeatureRecord {
        chromosome: fields[0].to_string(),
        start,
        end,
        label,
    })
}

pub fn read_features<R: BufRead>(reader: R) -> Result<Vec<FeatureRecord>, ParseError> {
    let mut features = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if is_bed_header(line) {
            continue;
        }
        features.push(parse_bed_line(line, idx + 1)?);
    }
    Ok(features)
}

pub fn load_features(path: &Path) -> Result<Vec<FeatureRecord>, ParseError> {
    let file = File::open(path)?;
    read_features(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_labelled_and_unlabelled_features() {
        let data = "\
track name=peaks
chr1\t100\t200\tpeak1
chr1\t300\t400
chr2\t5\t6\t
";
        let feats = read_features(Cursor::new(data)).unwrap();
        assert_eq!(feats.len(), 3);
        assert_eq!(feats[0].label.as_deref(), Some("peak1"));
        assert_eq!(feats[1].label, None);
        assert_eq!(feats[2].label, None);
        assert_eq!(feats[2].chromosome, "chr2");
    }

    #[test]
    fn bad_feature_line() {
        let err = read_features(Cursor::new("chr1\t10\n")).unwrap_err();
        assert!(matches!(err, ParseError::MalformedLine { line_no: 1, .. }));
        let err = read_features(Cursor::new("chr1\t10\t5\n")).unwrap_err();
        assert!(matches!(err, ParseError::BadCoordinates { line_no: 1, .. }));
    }
}
