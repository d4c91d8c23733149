//! The module containing identification strings spread over CPUID registers.

use core::fmt::{self, Write};

use crate::cpuid::QueryResult;

/// The 12-character vendor ID, such as "GenuineIntel" and "AuthenticAMD".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VendorId([u8; 12]);

impl VendorId {
    /// Assembles the vendor ID from the result of CPUID leaf 0. The string is
    /// stored in EBX, EDX and ECX, in this order, first character in the
    /// least significant byte.
    #[must_use]
    pub fn from_registers(regs: &QueryResult) -> Self {
        let mut bytes = [0u8; 12];
        for (chunk, reg) in bytes.chunks_exact_mut(4).zip([regs.ebx, regs.edx, regs.ecx]) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Returns the vendor ID as a string, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ascii(f, &self.0)
    }
}

// 3 leaves * 4 registers * 4 bytes
const BRAND_STRING_LEN: usize = 48;

/// The processor brand string from CPUID leaves 0x8000_0002 to 0x8000_0004.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BrandString {
    bytes: [u8; BRAND_STRING_LEN + 1],
}

impl BrandString {
    /// The number of data bytes.
    pub const LEN: usize = BRAND_STRING_LEN;

    /// Assembles the brand string from the results of the three brand string
    /// leaves, in leaf order. Each leaf contributes EAX, EBX, ECX and EDX, in
    /// this order.
    #[must_use]
    pub fn from_registers(leaves: &[QueryResult; 3]) -> Self {
        let mut bytes = [0u8; Self::LEN + 1];
        let regs = leaves.iter().flat_map(QueryResult::to_array);
        for (chunk, reg) in bytes[..Self::LEN].chunks_exact_mut(4).zip(regs) {
            chunk.copy_from_slice(&reg.to_le_bytes());
        }
        bytes[Self::LEN] = 0;
        Self { bytes }
    }

    /// Returns all 48 data bytes, including any NUL padding.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.bytes[..Self::LEN]
    }

    /// Returns the bytes up to the first NUL.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.bytes.iter().position(|&c| c == 0).unwrap_or(Self::LEN);
        &self.bytes[..len]
    }

    /// Returns the brand string as a string, if it is valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }
}

impl fmt::Display for BrandString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_ascii(f, self.as_bytes())
    }
}

/// Writes printable ASCII as is and anything else as `\xNN`.
fn write_ascii(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        if b == b' ' || b.is_ascii_graphic() {
            f.write_char(char::from(b))?;
        } else {
            write!(f, "\\x{b:02x}")?;
        }
    }
    Ok(())
}
