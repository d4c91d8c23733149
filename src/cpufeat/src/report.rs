//! The module rendering decoded capabilities as a human readable report.
//!
//! ```text
//! Vendor ID        : GenuineIntel
//! Brand String     : Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz
//! Max Basic Leaf   : 0x00000016
//! Max Extended Leaf: 0x80000008
//!
//! CPUID.(7,0): EAX=0x00000000 EBX=0x029c6fbf ECX=0x40000000 EDX=0xbc000400
//! CET_SS (Shadow Stack)       : not supported  - CET: protects return ...
//! ...
//! ```

use core::fmt;

use derive_more::Display;

use crate::{
    cpuid::{CpuidOps, LeafRange},
    decoder::{BasicFeatures, Decoder, ExtendedFeatures, FeatureLeaf, LegacyExtendedFeatures},
    error::{Error, Result},
    identity::{BrandString, VendorId},
};

/// Printed in place of the brand string when its leaves are not supported.
pub const BRAND_STRING_NOT_SUPPORTED: &str = "(brand string not supported)";

const FEATURE_NAME_WIDTH: usize = 28;

/// Everything the report shows, decoded from one processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Report {
    /// The vendor ID.
    pub vendor_id: VendorId,
    /// The brand string, if supported.
    pub brand_string: Result<BrandString>,
    /// The maximum basic leaf.
    pub max_basic_leaf: u32,
    /// The maximum extended leaf.
    pub max_extended_leaf: u32,
    /// The flags of leaf 7, if supported.
    pub extended_features: Result<ExtendedFeatures>,
    /// The flags of leaf 1.
    pub basic_features: BasicFeatures,
    /// The flags of leaf 0x8000_0001, if supported.
    pub legacy_extended_features: Result<LegacyExtendedFeatures>,
}

impl Report {
    /// Decodes everything the report shows through `decoder`.
    #[must_use]
    pub fn collect<T: CpuidOps>(decoder: &Decoder<T>) -> Self {
        let report = Self {
            vendor_id: decoder.vendor_id(),
            brand_string: decoder.brand_string(),
            max_basic_leaf: decoder.max_basic_leaf(),
            max_extended_leaf: decoder.max_extended_leaf(),
            extended_features: decoder.extended_features(),
            basic_features: decoder.basic_features(),
            legacy_extended_features: decoder.legacy_extended_features(),
        };
        log::debug!(
            "Collected the report for {} (max leaves {:#x}, {:#x})",
            report.vendor_id,
            report.max_basic_leaf,
            report.max_extended_leaf
        );
        report
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vendor ID        : {}", self.vendor_id)?;
        match &self.brand_string {
            Ok(brand) => writeln!(f, "Brand String     : {brand}")?,
            Err(_) => writeln!(f, "Brand String     : {BRAND_STRING_NOT_SUPPORTED}")?,
        }
        writeln!(f, "Max Basic Leaf   : {:#010x}", self.max_basic_leaf)?;
        writeln!(f, "Max Extended Leaf: {:#010x}", self.max_extended_leaf)?;
        writeln!(f)?;

        write_leaf_or_notice(f, &self.extended_features)?;
        write_leaf(f, &self.basic_features)?;
        write_leaf_or_notice(f, &self.legacy_extended_features)
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
enum Support {
    #[display("SUPPORTED")]
    Supported,
    #[display("not supported")]
    NotSupported,
}

impl From<bool> for Support {
    fn from(supported: bool) -> Self {
        if supported {
            Self::Supported
        } else {
            Self::NotSupported
        }
    }
}

/// Formats a leaf the way Intel SDM does: decimal for basic leaves and hex for
/// extended leaves.
#[derive(Clone, Copy, Debug)]
struct LeafNumber(u32);

impl fmt::Display for LeafNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match LeafRange::of(self.0) {
            LeafRange::Basic => write!(f, "{}", self.0),
            LeafRange::Extended => write!(f, "{:#x}", self.0),
        }
    }
}

fn write_leaf_or_notice<L: FeatureLeaf>(
    f: &mut fmt::Formatter<'_>,
    leaf: &Result<L>,
) -> fmt::Result {
    match leaf {
        Ok(leaf) => write_leaf(f, leaf),
        Err(error) => write_notice(f, error),
    }
}

fn write_leaf<L: FeatureLeaf>(f: &mut fmt::Formatter<'_>, leaf: &L) -> fmt::Result {
    write!(f, "CPUID.({},{}):", LeafNumber(L::LEAF), L::SUB_LEAF)?;
    for &register in L::REPORTED_REGISTERS {
        write!(f, " {register}={:#010x}", leaf.regs().get(register))?;
    }
    writeln!(f)?;

    for (feature, supported) in leaf.flags() {
        let def = feature.definition();
        writeln!(
            f,
            "{:<width$}: {}  - {}",
            def.name,
            Support::from(supported),
            def.description,
            width = FEATURE_NAME_WIDTH,
        )?;
    }
    writeln!(f)
}

fn write_notice(f: &mut fmt::Formatter<'_>, error: &Error) -> fmt::Result {
    let Error::UnsupportedLeaf { leaf, range, .. } = *error;
    match range {
        LeafRange::Basic => write!(f, "CPUID leaf {}", LeafNumber(leaf))?,
        LeafRange::Extended => write!(f, "CPUID extended leaf {}", LeafNumber(leaf))?,
    }
    writeln!(f, " is not supported on this CPU.")?;
    writeln!(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpuid::{QueryResult, testing::ScriptedCpuid};

    /// Splits NUL padded text into the three brand string leaves.
    fn brand_leaves(text: &str) -> [QueryResult; 3] {
        let mut bytes = [0u8; 48];
        bytes[..text.len()].copy_from_slice(text.as_bytes());
        let reg = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        [0, 16, 32].map(|base| {
            QueryResult::new(reg(base), reg(base + 4), reg(base + 8), reg(base + 12))
        })
    }

    fn coffee_lake() -> ScriptedCpuid {
        let [brand0, brand1, brand2] = brand_leaves("Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz");
        ScriptedCpuid::new()
            .with(0, QueryResult::new(0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69))
            .with(0x8000_0000, QueryResult::new(0x8000_0008, 0, 0, 0))
            .with(0x8000_0002, brand0)
            .with(0x8000_0003, brand1)
            .with(0x8000_0004, brand2)
            .with(7, QueryResult::new(0, 0x0010_0080, 0x4000_0000, 0x0010_0000))
            .with(1, QueryResult::new(0x0009_06ea, 0x0010_0800, 0x7ffa_fbff, 0xbfeb_fbff))
            .with(0x8000_0001, QueryResult::new(0, 0, 0x0000_0121, 0x2c10_0800))
    }

    #[test]
    fn full_report() {
        let report = Report::collect(&Decoder::new(coffee_lake()));
        assert_eq!(report.to_string(), include_str!("testdata/report_full.txt"));
    }

    #[test]
    fn full_report_queries_only_supported_leaves() {
        let decoder = Decoder::new(coffee_lake());
        let _ = Report::collect(&decoder);
        let mut leaves: Vec<_> = decoder.cpuid().issued().iter().map(|&(leaf, _)| leaf).collect();
        leaves.sort_unstable();
        leaves.dedup();
        assert_eq!(
            leaves,
            [0, 1, 7, 0x8000_0000, 0x8000_0001, 0x8000_0002, 0x8000_0003, 0x8000_0004]
        );
        assert!(decoder.cpuid().issued().iter().all(|&(_, sub_leaf)| sub_leaf == 0));
    }

    #[test]
    fn minimal_report() {
        let cpuid = ScriptedCpuid::new()
            .with(0, QueryResult::new(0x1, 0x6874_7541, 0x444d_4163, 0x6974_6e65))
            .with(0x8000_0000, QueryResult::new(0x8000_0000, 0, 0, 0))
            .with(7, QueryResult::new(!0, !0, !0, !0))
            .with(1, QueryResult::new(0, 0, 0, 0));
        let decoder = Decoder::new(cpuid);
        let report = Report::collect(&decoder);
        assert_eq!(report.to_string(), include_str!("testdata/report_minimal.txt"));
        assert!(!decoder.cpuid().was_issued(7));
        assert!(!decoder.cpuid().was_issued(0x8000_0001));
        assert!(!decoder.cpuid().was_issued(0x8000_0002));
    }

    #[test]
    fn report_section_order() {
        let text = Report::collect(&Decoder::new(coffee_lake())).to_string();
        let position = |needle: &str| text.find(needle).unwrap();
        assert!(position("Vendor ID") < position("Brand String"));
        assert!(position("Brand String") < position("Max Basic Leaf"));
        assert!(position("Max Basic Leaf") < position("Max Extended Leaf"));
        assert!(position("Max Extended Leaf") < position("CPUID.(7,0)"));
        assert!(position("CPUID.(7,0)") < position("CPUID.(1,0)"));
        assert!(position("CPUID.(1,0)") < position("CPUID.(0x80000001,0)"));
        assert!(position("SMAP") < position("PAE"));
        assert!(position("SSE2") < position("NX/XD"));
    }

    #[test]
    fn leaf_number() {
        assert_eq!(LeafNumber(7).to_string(), "7");
        assert_eq!(LeafNumber(0x8000_0001).to_string(), "0x80000001");
    }

    #[test]
    fn support_text() {
        assert_eq!(Support::from(true).to_string(), "SUPPORTED");
        assert_eq!(Support::from(false).to_string(), "not supported");
    }
}
