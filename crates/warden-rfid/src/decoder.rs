//! Card frame decoding.

use crate::wiegand::check_bits;
use warden_core::{CardFormat, CredentialId, Error, Result};

/// Turns card frames into canonical credential identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardDecoder {
    format: CardFormat,
    frame_bits: usize,
}

impl CardDecoder {
    /// `frame_bits` is expected to come from a validated configuration
    /// (4-64 bits, even for the parity-stripped format).
    #[must_use]
    pub fn new(format: CardFormat, frame_bits: usize) -> Self {
        Self { format, frame_bits }
    }

    pub fn format(&self) -> CardFormat {
        self.format
    }

    pub fn frame_bits(&self) -> usize {
        self.frame_bits
    }

    /// Decode one frame.
    ///
    /// With [`CardFormat::ParityStripped`] the frame is split into two equal
    /// halves. The first bit is an even parity bit over the first half, the
    /// last bit an odd parity bit over the second half. Both are checked and
    /// dropped; the remaining data bits, concatenated, are the identifier.
    ///
    /// With [`CardFormat::Raw`] the leading `frame_bits - 1` bits are taken
    /// as-is.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedCredential` if the frame length does not match
    /// the configured frame size, an element is not a bit, or a parity check
    /// fails.
    pub fn decode(&self, bits: &[u8]) -> Result<CredentialId> {
        if bits.len() != self.frame_bits {
            return Err(Error::malformed(format!(
                "expected {} bits, got {}",
                self.frame_bits,
                bits.len()
            )));
        }
        check_bits(bits)?;

        match self.format {
            CardFormat::Raw => Ok(CredentialId::new(pack(&bits[..bits.len() - 1]))),
            CardFormat::ParityStripped => {
                let (first, second) = bits.split_at(bits.len() / 2);
                if ones(first) % 2 != 0 {
                    return Err(Error::malformed("even parity over leading half failed"));
                }
                if ones(second) % 2 != 1 {
                    return Err(Error::malformed("odd parity over trailing half failed"));
                }
                Ok(CredentialId::new(pack(&bits[1..bits.len() - 1])))
            }
        }
    }
}

fn ones(bits: &[u8]) -> usize {
    bits.iter().filter(|b| **b == 1).count()
}

fn pack(bits: &[u8]) -> u64 {
    bits.iter().fold(0u64, |acc, b| (acc << 1) | u64::from(*b))
}
