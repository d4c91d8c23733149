//! The module implementing decoding of CPUID results into capabilities.
//!
//! Any leaf other than leaf 0 and leaf 1 is checked against the maximum leaf of
//! its range before it is queried. A leaf above the maximum is reported as
//! [`Error::UnsupportedLeaf`] and is never issued, since its contents are
//! meaningless.

use crate::{
    cpuid::{
        CpuidOps, LEAF_EXTENDED_FEATURE_INFO, LEAF_EXTENDED_FEATURES, LEAF_FEATURE_INFO,
        LEAF_MAX_EXTENDED, LEAF_VENDOR_AND_MAX_BASIC, LEAVES_BRAND_STRING, LeafRange, QueryResult,
        Register,
    },
    error::{Error, Result},
    features::Feature,
    identity::{BrandString, VendorId},
};

/// Decodes capabilities out of CPUID results provided by `T`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decoder<T> {
    cpuid: T,
}

impl<T: CpuidOps> Decoder<T> {
    /// Creates a decoder issuing queries through `cpuid`.
    #[must_use]
    pub const fn new(cpuid: T) -> Self {
        Self { cpuid }
    }

    /// Returns the underlying CPUID implementation.
    #[must_use]
    pub const fn cpuid(&self) -> &T {
        &self.cpuid
    }

    /// Returns the vendor ID. Leaf 0 is always supported.
    #[must_use]
    pub fn vendor_id(&self) -> VendorId {
        VendorId::from_registers(&self.cpuid.query(LEAF_VENDOR_AND_MAX_BASIC, 0))
    }

    /// Returns the maximum supported basic leaf.
    #[must_use]
    pub fn max_basic_leaf(&self) -> u32 {
        self.cpuid.query(LEAF_VENDOR_AND_MAX_BASIC, 0).eax
    }

    /// Returns the maximum supported extended leaf.
    #[must_use]
    pub fn max_extended_leaf(&self) -> u32 {
        self.cpuid.query(LEAF_MAX_EXTENDED, 0).eax
    }

    /// Returns the maximum supported leaf of `range`.
    #[must_use]
    pub fn max_leaf(&self, range: LeafRange) -> u32 {
        self.cpuid.query(range.max_leaf_query(), 0).eax
    }

    /// Queries `leaf` and `sub_leaf` if `leaf` is within the maximum leaf of
    /// its range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedLeaf`] without querying `leaf` if it is
    /// above the maximum.
    pub fn query_checked(&self, leaf: u32, sub_leaf: u32) -> Result<QueryResult> {
        let range = LeafRange::of(leaf);
        let max = self.max_leaf(range);
        if leaf > max {
            log::debug!("CPUID {range} leaf {leaf:#x} is above the maximum {max:#x}");
            return Err(Error::UnsupportedLeaf { leaf, range, max });
        }
        Ok(self.cpuid.query(leaf, sub_leaf))
    }

    /// Returns the processor brand string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedLeaf`] if the maximum extended leaf is below
    /// 0x8000_0004.
    pub fn brand_string(&self) -> Result<BrandString> {
        let last = LEAVES_BRAND_STRING[LEAVES_BRAND_STRING.len() - 1];
        let max = self.max_extended_leaf();
        if max < last {
            log::debug!("Brand string leaves are not supported (max {max:#x})");
            return Err(Error::UnsupportedLeaf {
                leaf: last,
                range: LeafRange::Extended,
                max,
            });
        }
        let leaves = LEAVES_BRAND_STRING.map(|leaf| self.cpuid.query(leaf, 0));
        Ok(BrandString::from_registers(&leaves))
    }

    /// Returns the flags of leaf 7 sub-leaf 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedLeaf`] if the maximum basic leaf is below 7.
    pub fn extended_features(&self) -> Result<ExtendedFeatures> {
        self.feature_leaf()
    }

    /// Returns the flags of leaf 1. Leaf 1 is always supported.
    #[must_use]
    pub fn basic_features(&self) -> BasicFeatures {
        let regs = self.cpuid.query(BasicFeatures::LEAF, BasicFeatures::SUB_LEAF);
        BasicFeatures::from_regs(regs)
    }

    /// Returns the flags of leaf 0x8000_0001.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedLeaf`] if the maximum extended leaf is below
    /// 0x8000_0001.
    pub fn legacy_extended_features(&self) -> Result<LegacyExtendedFeatures> {
        self.feature_leaf()
    }

    fn feature_leaf<L: FeatureLeaf>(&self) -> Result<L> {
        self.query_checked(L::LEAF, L::SUB_LEAF).map(L::from_regs)
    }
}

/// The flags decoded from one leaf and sub-leaf, along with the raw result.
pub trait FeatureLeaf: Sized {
    /// The leaf reporting the flags.
    const LEAF: u32;
    /// The sub-leaf reporting the flags.
    const SUB_LEAF: u32;
    /// The registers shown alongside the flags in the report.
    const REPORTED_REGISTERS: &'static [Register];

    /// Decodes the flags out of the result of querying [`Self::LEAF`].
    fn from_regs(regs: QueryResult) -> Self;

    /// Returns the raw result the flags were decoded from.
    fn regs(&self) -> &QueryResult;

    /// Returns each flag of this leaf and sub-leaf and whether it is set, in
    /// table order.
    fn flags(&self) -> impl Iterator<Item = (Feature, bool)> {
        let regs = *self.regs();
        Feature::in_leaf(Self::LEAF, Self::SUB_LEAF)
            .map(move |feature| (feature, feature.is_set(&regs)))
    }
}

/// Security related flags from CPUID.(7,0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtendedFeatures {
    /// The raw result.
    pub regs: QueryResult,
    /// CET shadow stack.
    pub cet_ss: bool,
    /// CET indirect branch tracking.
    pub cet_ibt: bool,
    /// Supervisor Mode Execution Prevention.
    pub smep: bool,
    /// Supervisor Mode Access Prevention.
    pub smap: bool,
}

impl FeatureLeaf for ExtendedFeatures {
    const LEAF: u32 = LEAF_EXTENDED_FEATURES;
    const SUB_LEAF: u32 = 0;
    const REPORTED_REGISTERS: &'static [Register] =
        &[Register::Eax, Register::Ebx, Register::Ecx, Register::Edx];

    fn from_regs(regs: QueryResult) -> Self {
        Self {
            regs,
            cet_ss: Feature::CetSs.is_set(&regs),
            cet_ibt: Feature::CetIbt.is_set(&regs),
            smep: Feature::Smep.is_set(&regs),
            smap: Feature::Smap.is_set(&regs),
        }
    }

    fn regs(&self) -> &QueryResult {
        &self.regs
    }
}

/// Classic flags from CPUID.(1,0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BasicFeatures {
    /// The raw result.
    pub regs: QueryResult,
    /// Physical Address Extension.
    pub pae: bool,
    /// Streaming SIMD Extensions 2.
    pub sse2: bool,
}

impl FeatureLeaf for BasicFeatures {
    const LEAF: u32 = LEAF_FEATURE_INFO;
    const SUB_LEAF: u32 = 0;
    const REPORTED_REGISTERS: &'static [Register] = &[Register::Ecx, Register::Edx];

    fn from_regs(regs: QueryResult) -> Self {
        Self {
            regs,
            pae: Feature::Pae.is_set(&regs),
            sse2: Feature::Sse2.is_set(&regs),
        }
    }

    fn regs(&self) -> &QueryResult {
        &self.regs
    }
}

/// Flags from CPUID.(0x8000_0001,0).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyExtendedFeatures {
    /// The raw result.
    pub regs: QueryResult,
    /// No-eXecute / eXecute Disable.
    pub nx: bool,
}

impl FeatureLeaf for LegacyExtendedFeatures {
    const LEAF: u32 = LEAF_EXTENDED_FEATURE_INFO;
    const SUB_LEAF: u32 = 0;
    const REPORTED_REGISTERS: &'static [Register] = &[Register::Edx];

    fn from_regs(regs: QueryResult) -> Self {
        Self {
            regs,
            nx: Feature::Nx.is_set(&regs),
        }
    }

    fn regs(&self) -> &QueryResult {
        &self.regs
    }
}
