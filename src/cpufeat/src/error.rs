//! The module containing the error type of the decoder.

use crate::cpuid::LeafRange;

/// The errors the decoder reports.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The leaf is above the maximum leaf the processor reports for its range.
    /// Its registers are not interpreted.
    #[error("CPUID {range} leaf {leaf:#x} is above the maximum leaf {max:#x}")]
    UnsupportedLeaf {
        /// The requested leaf.
        leaf: u32,
        /// The range `leaf` belongs to.
        range: LeafRange,
        /// The maximum leaf reported for `range`.
        max: u32,
    },
}

/// The result type of the decoder.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message() {
        let error = Error::UnsupportedLeaf {
            leaf: 0x8000_0004,
            range: LeafRange::Extended,
            max: 0x8000_0001,
        };
        assert_eq!(
            error.to_string(),
            "CPUID extended leaf 0x80000004 is above the maximum leaf 0x80000001"
        );
    }
}
