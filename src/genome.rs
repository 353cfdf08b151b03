//! Chromosome catalog and genomic coordinate types.

use crate::error::{LocusViewError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

const GRCH38_CATALOG_JSON: &str = include_str!("../assets/grch38.chromosomes.json");

lazy_static! {
    pub static ref GENOME: Genome =
        Genome::from_embedded_catalog().expect("embedded chromosome catalog is invalid");
    static ref REGION_RE: Regex =
        Regex::new(r"^\s*(?<chrom>[0-9XYxy]{1,2})\s*(?::\s*(?<start>[0-9,]+)\s*-\s*(?<end>[0-9,]+))?\s*$")
            .expect("region regex is invalid");
}

/// Closed interval on one chromosome, `start <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomicRange {
    start: u64,
    end: u64,
}

impl GenomicRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(LocusViewError::String(format!(
                "invalid genomic range: start {start} > end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Swaps the bounds if needed instead of failing.
    pub fn ordered(a: u64, b: u64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[inline(always)]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// True when `other` intersects this range or fully surrounds it.
    pub fn overlaps(&self, other_start: u64, other_end: u64) -> bool {
        other_start <= self.end && other_end >= self.start
    }

    /// Shifts the range by a signed distance, clamped to `[0, chrom_size]`.
    pub fn panned(&self, distance: i64, chrom_size: u64) -> Self {
        let len = self.len();
        let start = if distance < 0 {
            self.start.saturating_sub(distance.unsigned_abs())
        } else {
            (self.start + distance as u64).min(chrom_size.saturating_sub(len))
        };
        Self {
            start,
            end: start + len,
        }
    }

    /// Scales the range around its midpoint. `factor > 1` zooms out.
    pub fn zoomed(&self, factor: f64, chrom_size: u64) -> Self {
        let mid = (self.start + self.end) as f64 / 2.0;
        let half = ((self.len() as f64 * factor) / 2.0).max(1.0);
        let start = (mid - half).max(0.0) as u64;
        let end = ((mid + half) as u64).min(chrom_size);
        Self {
            start,
            end: end.max(start + 1).min(chrom_size.max(1)),
        }
    }
}

/// Cytogenetic band, as reported by the data source's chromosome info.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CytoBand {
    pub id: String,
    pub start: u64,
    pub end: u64,
    pub stain: String,
}

/// Chromosome detail record from the data source.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChromInfo {
    pub chrom: String,
    pub size: u64,
    #[serde(default)]
    pub bands: Vec<CytoBand>,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogChromosome {
    name: String,
    size: u64,
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogDocument {
    assembly: String,
    chromosomes: Vec<CatalogChromosome>,
}

/// Ordered chromosome catalog for one assembly.
#[derive(Clone, Debug)]
pub struct Genome {
    assembly: String,
    names: Vec<String>,
    sizes: Vec<u64>,
    offsets: Vec<u64>,
    total_size: u64,
}

impl Genome {
    pub fn from_embedded_catalog() -> Result<Self> {
        Self::from_catalog_json(GRCH38_CATALOG_JSON)
    }

    pub fn from_catalog_json(json: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        let mut names = Vec::with_capacity(doc.chromosomes.len());
        let mut sizes = Vec::with_capacity(doc.chromosomes.len());
        let mut offsets = Vec::with_capacity(doc.chromosomes.len());
        let mut total: u64 = 0;
        for chrom in &doc.chromosomes {
            names.push(chrom.name.to_owned());
            sizes.push(chrom.size);
            offsets.push(total);
            total += chrom.size;
        }
        Ok(Self {
            assembly: doc.assembly,
            names,
            sizes,
            offsets,
            total_size: total,
        })
    }

    #[inline(always)]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn chromosome_names(&self) -> &[String] {
        &self.names
    }

    pub fn number_chromosomes(&self) -> usize {
        self.names.len()
    }

    #[inline(always)]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    fn index_of(&self, chrom: &str) -> Option<usize> {
        let wanted = chrom.trim_start_matches("chr").to_ascii_uppercase();
        self.names.iter().position(|n| *n == wanted)
    }

    pub fn size_of(&self, chrom: &str) -> Result<u64> {
        self.index_of(chrom)
            .map(|i| self.sizes[i])
            .ok_or_else(|| LocusViewError::String(format!("unknown chromosome '{chrom}'")))
    }

    /// Offset of the chromosome start within the concatenated genome axis.
    pub fn offset_of(&self, chrom: &str) -> Result<u64> {
        self.index_of(chrom)
            .map(|i| self.offsets[i])
            .ok_or_else(|| LocusViewError::String(format!("unknown chromosome '{chrom}'")))
    }

    /// Full range of a chromosome.
    pub fn full_range(&self, chrom: &str) -> Result<GenomicRange> {
        GenomicRange::new(0, self.size_of(chrom)?)
    }

    /// Iterator over `(name, size, genome offset)` in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64, u64)> {
        self.names
            .iter()
            .zip(self.sizes.iter())
            .zip(self.offsets.iter())
            .map(|((n, s), o)| (n.as_str(), *s, *o))
    }
}

/// Parses `"17:7,000,000-7,200,000"` or a bare chromosome name into a
/// chromosome and a range clamped to the chromosome size.
pub fn parse_region(text: &str, genome: &Genome) -> Result<(String, GenomicRange)> {
    let caps = REGION_RE
        .captures(text)
        .ok_or_else(|| LocusViewError::String(format!("cannot parse region '{text}'")))?;
    let chrom = caps["chrom"].to_ascii_uppercase();
    let size = genome.size_of(&chrom)?;
    let range = match (caps.name("start"), caps.name("end")) {
        (Some(start), Some(end)) => {
            let start = parse_coordinate(start.as_str())?;
            let end = parse_coordinate(end.as_str())?.min(size);
            GenomicRange::new(start.min(end), end)?
        }
        _ => GenomicRange::new(0, size)?,
    };
    Ok((chrom, range))
}

fn parse_coordinate(text: &str) -> Result<u64> {
    let digits: String = text.chars().filter(|c| *c != ',').collect();
    digits
        .parse::<u64>()
        .map_err(|e| LocusViewError::String(format!("bad coordinate '{text}': {e}")))
}
