use bstr::BString;
use rust_htslib::bam::record::Cigar;

use crate::error::PhasingError;

pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_SECONDARY: u16 = 0x100;
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// One aligned read as delivered by an external reader: the engine never
/// touches alignment files itself, it only consumes these records.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    pub name: BString,
    pub flags: u16,
    pub mapq: u8,
    pub pos: i64,
    pub cigar: Vec<Cigar>,
    pub sequence: Vec<u8>,
    pub base_qualities: Option<Vec<u8>>,
    pub read_group: Option<BString>,
}

impl AlignedRead {
    pub fn new(name: &str, mapq: u8, pos: i64, cigar: Vec<Cigar>, sequence: &[u8]) -> AlignedRead {
        AlignedRead {
            name: BString::from(name),
            flags: 0,
            mapq,
            pos,
            cigar,
            sequence: sequence.to_vec(),
            base_qualities: None,
            read_group: None,
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.flags & FLAG_UNMAPPED != 0
    }

    pub fn is_secondary(&self) -> bool {
        self.flags & FLAG_SECONDARY != 0
    }

    pub fn is_supplementary(&self) -> bool {
        self.flags & FLAG_SUPPLEMENTARY != 0
    }

    /// The filter chain applied before any allele detection. Supplementary
    /// alignments are dropped here and only re-enter for tagging when
    /// requested.
    pub fn is_accepted(&self, mapq_threshold: u8) -> bool {
        !self.is_supplementary()
            && self.mapq >= mapq_threshold
            && !self.is_secondary()
            && !self.is_unmapped()
            && !self.cigar.is_empty()
    }
}

/// Decode `(op_code, length)` pairs using the MIDNSHP=X convention. Unknown
/// operator codes are an input error, not a panic.
pub fn cigar_from_raw(ops: &[(u8, u32)]) -> Result<Vec<Cigar>, PhasingError> {
    ops.iter()
        .map(|&(code, len)| match code {
            0 => Ok(Cigar::Match(len)),
            1 => Ok(Cigar::Ins(len)),
            2 => Ok(Cigar::Del(len)),
            3 => Ok(Cigar::RefSkip(len)),
            4 => Ok(Cigar::SoftClip(len)),
            5 => Ok(Cigar::HardClip(len)),
            6 => Ok(Cigar::Pad(len)),
            7 => Ok(Cigar::Equal(len)),
            8 => Ok(Cigar::Diff(len)),
            other => Err(PhasingError::invalid_input(
                0,
                format!("unknown alignment operator code {}", other),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        let mut read = AlignedRead::new("r", 50, 100, vec![Cigar::Match(10)], b"ACGTACGTAC");
        assert!(read.is_accepted(20));
        read.flags = FLAG_SUPPLEMENTARY;
        assert!(!read.is_accepted(20));
        read.flags = 0;
        read.mapq = 10;
        assert!(!read.is_accepted(20));
    }

    #[test]
    fn test_cigar_from_raw() {
        let cigar = cigar_from_raw(&[(0, 5), (1, 2), (2, 3)]).unwrap();
        assert_eq!(cigar, vec![Cigar::Match(5), Cigar::Ins(2), Cigar::Del(3)]);
        assert!(cigar_from_raw(&[(9, 1)]).is_err());
    }
}
