//! CPUID based detection of security and instruction-set features.
//!
//! The crate is layered as follows:
//!
//! - [`cpuid`]: executes CPUID through the [`CpuidOps`] trait.
//! - [`decoder`]: turns CPUID results into the vendor ID, the brand string and
//!   feature flags, refusing to interpret leaves the processor does not
//!   support.
//! - [`report`]: renders the decoded values as text.
//!
//! ```no_run
//! use cpufeat::{Decoder, NativeCpuid, Report};
//!
//! let decoder = Decoder::new(NativeCpuid);
//! print!("{}", Report::collect(&decoder));
//! ```

#![cfg_attr(not(test), no_std)]

pub mod cpuid;
pub mod decoder;
pub mod error;
pub mod features;
pub mod identity;
pub mod report;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use cpuid::NativeCpuid;
pub use cpuid::{CpuidOps, LeafRange, QueryResult, Register};
pub use decoder::{BasicFeatures, Decoder, ExtendedFeatures, FeatureLeaf, LegacyExtendedFeatures};
pub use error::{Error, Result};
pub use features::{FEATURE_TABLE, Feature, FeatureDefinition};
pub use identity::{BrandString, VendorId};
pub use report::Report;

#[cfg(test)]
#[ctor::ctor]
fn init_test_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}
