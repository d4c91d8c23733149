//! The module containing the CPUID query primitive.
//!
//! Everything architecture specific about this crate is behind [`CpuidOps`].
//! The decoder only ever sees [`QueryResult`] values, which lets tests drive
//! it with fabricated register contents instead of the real instruction.

use derive_more::Display;

/// The first leaf of the basic leaf range. Its EAX reports the maximum basic
/// leaf and EBX, EDX, ECX the vendor ID.
pub const LEAF_VENDOR_AND_MAX_BASIC: u32 = 0x0;

/// Version information and feature bits.
pub const LEAF_FEATURE_INFO: u32 = 0x1;

/// Structured extended feature flags. Valid only with sub-leaf 0 here.
pub const LEAF_EXTENDED_FEATURES: u32 = 0x7;

/// The first leaf of the extended leaf range. Its EAX reports the maximum
/// extended leaf.
pub const LEAF_MAX_EXTENDED: u32 = 0x8000_0000;

/// Extended processor signature and feature bits.
pub const LEAF_EXTENDED_FEATURE_INFO: u32 = 0x8000_0001;

/// The three leaves holding the processor brand string, in string order.
pub const LEAVES_BRAND_STRING: [u32; 3] = [0x8000_0002, 0x8000_0003, 0x8000_0004];

/// Register values returned by a single CPUID execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryResult {
    /// EAX
    pub eax: u32,
    /// EBX
    pub ebx: u32,
    /// ECX
    pub ecx: u32,
    /// EDX
    pub edx: u32,
}

impl QueryResult {
    /// Builds a result from the four output registers, in EAX, EBX, ECX, EDX
    /// order.
    #[must_use]
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    /// Returns the value of `register`.
    #[must_use]
    pub const fn get(&self, register: Register) -> u32 {
        match register {
            Register::Eax => self.eax,
            Register::Ebx => self.ebx,
            Register::Ecx => self.ecx,
            Register::Edx => self.edx,
        }
    }

    /// Returns the registers as an array in EAX, EBX, ECX, EDX order.
    #[must_use]
    pub const fn to_array(&self) -> [u32; 4] {
        [self.eax, self.ebx, self.ecx, self.edx]
    }
}

impl From<raw_cpuid::CpuIdResult> for QueryResult {
    fn from(regs: raw_cpuid::CpuIdResult) -> Self {
        Self::new(regs.eax, regs.ebx, regs.ecx, regs.edx)
    }
}

/// One of the four CPUID output registers.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Register {
    /// EAX
    #[display("EAX")]
    Eax,
    /// EBX
    #[display("EBX")]
    Ebx,
    /// ECX
    #[display("ECX")]
    Ecx,
    /// EDX
    #[display("EDX")]
    Edx,
}

/// The leaf range a leaf belongs to. Each range has its own maximum leaf.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum LeafRange {
    /// Leaves 0x0 to 0x7fff_ffff.
    #[display("basic")]
    Basic,
    /// Leaves 0x8000_0000 and above.
    #[display("extended")]
    Extended,
}

impl LeafRange {
    /// Returns the range `leaf` belongs to.
    #[must_use]
    pub const fn of(leaf: u32) -> Self {
        if leaf >= LEAF_MAX_EXTENDED {
            Self::Extended
        } else {
            Self::Basic
        }
    }

    /// Returns the leaf whose EAX reports the maximum leaf of this range.
    #[must_use]
    pub const fn max_leaf_query(self) -> u32 {
        match self {
            Self::Basic => LEAF_VENDOR_AND_MAX_BASIC,
            Self::Extended => LEAF_MAX_EXTENDED,
        }
    }
}

/// The CPUID instruction as seen by the decoder.
pub trait CpuidOps {
    /// Executes CPUID once with `leaf` in EAX and `sub_leaf` in ECX, and
    /// returns the four output registers.
    ///
    /// Never fails. For a leaf above the maximum of its range the contents are
    /// unspecified and must not be interpreted.
    fn query(&self, leaf: u32, sub_leaf: u32) -> QueryResult;
}

impl<F> CpuidOps for F
where
    F: Fn(u32, u32) -> QueryResult,
{
    fn query(&self, leaf: u32, sub_leaf: u32) -> QueryResult {
        self(leaf, sub_leaf)
    }
}

/// Executes the CPUID instruction on the current processor.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeCpuid;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuidOps for NativeCpuid {
    fn query(&self, leaf: u32, sub_leaf: u32) -> QueryResult {
        let regs: QueryResult = raw_cpuid::cpuid!(leaf, sub_leaf).into();
        log::trace!("CPUID({leaf:#x},{sub_leaf:#x}) => {regs:x?}");
        regs
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{cell::RefCell, collections::BTreeMap};

    use super::{CpuidOps, QueryResult};

    /// A fake CPUID returning fixed register values and recording every query
    /// issued to it. Unscripted leaves return all zero.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedCpuid {
        script: BTreeMap<(u32, u32), QueryResult>,
        issued: RefCell<Vec<(u32, u32)>>,
    }

    impl ScriptedCpuid {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with(mut self, leaf: u32, regs: QueryResult) -> Self {
            let _ = self.script.insert((leaf, 0), regs);
            self
        }

        pub(crate) fn issued(&self) -> Vec<(u32, u32)> {
            self.issued.borrow().clone()
        }

        pub(crate) fn was_issued(&self, leaf: u32) -> bool {
            self.issued.borrow().iter().any(|&(l, _)| l == leaf)
        }
    }

    impl CpuidOps for ScriptedCpuid {
        fn query(&self, leaf: u32, sub_leaf: u32) -> QueryResult {
            self.issued.borrow_mut().push((leaf, sub_leaf));
            self.script
                .get(&(leaf, sub_leaf))
                .copied()
                .unwrap_or_default()
        }
    }
}
