use crate::annotation::ParseError;
use crate::features::{is_bed_header, parse_bed_line};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A queried genomic window. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub name: Option<String>,
}

impl Region {
    pub fn new(chromosome: &str, start: u64, end: u64) -> Self {
        Region {
            chromosome: chromosome.to_string(),
            start,
            end,
            name: None,
        }
    }

    /// Inclusive interval overlap on the same chromosome.
    #[inline]
    pub fn overlaps(&self, chromosome: &str, start: u64, end: u64) -> bool {
        chromosome == self.chromosome && start <= self.end && end >= self.start
    }

    /// Parse `CHR:START-END`; thousands separators are allowed.
    pub fn parse(s: &str) -> Option<Region> {
        let (chrom, range) = s.trim().rsplit_once(':')?;
        let (start, end) = range.split_once('-')?;
        let start: u64 = start.replace(',', "").parse().ok()?;
        let end: u64 = end.replace(',', "").parse().ok()?;
        if chrom.is_empty() || end < start {
            return None;
        }
        Some(Region::new(chrom, start, end))
    }

    /// File stem for this region's figure.
    pub fn file_stem(&self) -> String {
        match &self.name {
            Some(name) => name.replace(['/', '\\', ' '], "_"),
            None => format!("{}_{}_{}", self.chromosome, self.start, self.end),
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

pub fn read_regions<R: BufRead>(reader: R) -> Result<Vec<Region>, ParseError> {
    let mut regions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if is_bed_header(line) {
            continue;
        }
        let rec = parse_bed_line(line, idx + 1)?;
        regions.push(Region {
            chromosome: rec.chromosome,
            start: rec.start,
            end: rec.end,
            name: rec.label,
        });
    }
    Ok(regions)
}

pub fn load_regions(path: &Path) -> Result<Vec<Region>, ParseError> {
    let file = File::open(path)?;
    read_regions(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::io::Cursor;

    #[test]
    fn parse_region_string() {
        let r = Region::parse("chr7:1,000-2,500").unwrap();
        assert_eq!(r, Region::new("chr7", 1000, 2500));
        assert_eq!(r.to_string(), "chr7:1000-2500");
        assert!(Region::parse("chr7:2500-1000").is_none());
        assert!(Region::parse("chr7").is_none());
        assert!(Region::parse(":1-2").is_none());
    }

    #[test]
    fn boundary_touches_are_inclusive() {
        let r = Region::new("chr1", 100, 200);
        assert!(r.overlaps("chr1", 100, 200));
        assert!(r.overlaps("chr1", 50, 100));
        assert!(r.overlaps("chr1", 200, 300));
        assert!(!r.overlaps("chr1", 50, 99));
        assert!(!r.overlaps("chr1", 201, 300));
        assert!(!r.overlaps("chr2", 100, 200));
    }

    #[test]
    fn overlap_matches_reference_predicate() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let chroms = ["chr1", "chr2"];
        for _ in 0..5000 {
            let qs = rng.gen_range(0..200u64);
            let qe = qs + rng.gen_range(0..50u64);
            let rs = rng.gen_range(0..200u64);
            let re = rs + rng.gen_range(0..50u64);
            let qc = chroms[rng.gen_range(0..2)];
            let rc = chroms[rng.gen_range(0..2)];
            let region = Region::new(qc, qs, qe);

            // Brute force: do the two closed intervals share a position?
            let shares = (rs..=re).any(|p| (qs..=qe).contains(&p));
            assert_eq!(region.overlaps(rc, rs, re), qc == rc && shares);
        }
    }

    #[test]
    fn named_regions_from_bed() {
        let data = "chr1\t10\t20\tGATA1\nchr2\t30\t40\n";
        let regions = read_regions(Cursor::new(data)).unwrap();
        assert_eq!(regions[0].file_stem(), "GATA1");
        assert_eq!(regions[1].file_stem(), "chr2_30_40");
    }
}
