//! The table of feature flags this crate decodes.
//!
//! Each flag is a single bit of a single register of a single CPUID leaf. The
//! mapping lives in [`FEATURE_TABLE`] only; nothing else in the crate knows a
//! bit position.

use core::fmt;

use bit_field::BitField;

use crate::cpuid::{
    LEAF_EXTENDED_FEATURE_INFO, LEAF_EXTENDED_FEATURES, LEAF_FEATURE_INFO, QueryResult, Register,
};

/// A decoded feature flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Feature {
    /// CET shadow stack.
    CetSs,
    /// CET indirect branch tracking.
    CetIbt,
    /// Supervisor Mode Execution Prevention.
    Smep,
    /// Supervisor Mode Access Prevention.
    Smap,
    /// Physical Address Extension.
    Pae,
    /// Streaming SIMD Extensions 2.
    Sse2,
    /// No-eXecute / eXecute Disable.
    Nx,
}

/// Where a feature flag is reported and how to describe it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureDefinition {
    /// The flag this entry defines.
    pub feature: Feature,
    /// The name printed in the report.
    pub name: &'static str,
    /// The CPUID leaf reporting the flag.
    pub leaf: u32,
    /// The CPUID sub-leaf reporting the flag.
    pub sub_leaf: u32,
    /// The output register holding the flag.
    pub register: Register,
    /// The bit index within `register`.
    pub bit: u8,
    /// A one-line description printed in the report.
    pub description: &'static str,
}

/// All feature flags, indexed by [`Feature`].
pub static FEATURE_TABLE: [FeatureDefinition; 7] = [
    // See: (Intel) Table 1-2. CPUID.(EAX=07H, ECX=0H):ECX[bit 7] CET_SS
    FeatureDefinition {
        feature: Feature::CetSs,
        name: "CET_SS (Shadow Stack)",
        leaf: LEAF_EXTENDED_FEATURES,
        sub_leaf: 0,
        register: Register::Ecx,
        bit: 7,
        description: "CET: protects return addresses using a hardware shadow stack",
    },
    FeatureDefinition {
        feature: Feature::CetIbt,
        name: "CET_IBT (Indirect Branch)",
        leaf: LEAF_EXTENDED_FEATURES,
        sub_leaf: 0,
        register: Register::Edx,
        bit: 20,
        description: "CET: requires ENDBR64 at valid indirect call/jump targets",
    },
    FeatureDefinition {
        feature: Feature::Smep,
        name: "SMEP",
        leaf: LEAF_EXTENDED_FEATURES,
        sub_leaf: 0,
        register: Register::Ebx,
        bit: 7,
        description: "Kernel hardening: prevents executing user pages in supervisor mode",
    },
    FeatureDefinition {
        feature: Feature::Smap,
        name: "SMAP",
        leaf: LEAF_EXTENDED_FEATURES,
        sub_leaf: 0,
        register: Register::Ebx,
        bit: 20,
        description: "Kernel hardening: prevents supervisor access to user pages without opt-in",
    },
    FeatureDefinition {
        feature: Feature::Pae,
        name: "PAE",
        leaf: LEAF_FEATURE_INFO,
        sub_leaf: 0,
        register: Register::Edx,
        bit: 6,
        description: "Physical Address Extension (historically related to NX in some setups)",
    },
    FeatureDefinition {
        feature: Feature::Sse2,
        name: "SSE2",
        leaf: LEAF_FEATURE_INFO,
        sub_leaf: 0,
        register: Register::Edx,
        bit: 26,
        description: "Vector instruction set (common baseline on x86-64)",
    },
    // See: (AMD) CPUID Fn8000_0001_EDX[20] NX
    FeatureDefinition {
        feature: Feature::Nx,
        name: "NX/XD",
        leaf: LEAF_EXTENDED_FEATURE_INFO,
        sub_leaf: 0,
        register: Register::Edx,
        bit: 20,
        description: "No-eXecute: allows pages to be marked non-executable (basis for DEP/NX)",
    },
];

impl Feature {
    /// Returns the table entry of this flag.
    #[must_use]
    pub fn definition(self) -> &'static FeatureDefinition {
        &FEATURE_TABLE[self as usize]
    }

    /// Tests the flag in `regs`, which must be the result of querying this
    /// flag's leaf and sub-leaf.
    #[must_use]
    pub fn is_set(self, regs: &QueryResult) -> bool {
        let def = self.definition();
        regs.get(def.register).get_bit(usize::from(def.bit))
    }

    /// Returns the flags reported by `leaf` and `sub_leaf`, in table order.
    pub fn in_leaf(leaf: u32, sub_leaf: u32) -> impl Iterator<Item = Feature> {
        FEATURE_TABLE
            .iter()
            .filter(move |def| def.leaf == leaf && def.sub_leaf == sub_leaf)
            .map(|def| def.feature)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}
