//! Classification of raw Wiegand bursts.
//!
//! Readers with an integrated keypad send each key press on the same D0/D1
//! lines as card frames, either as a bare 4-bit code or as an 8-bit burst
//! whose low nibble is the complement of the high nibble.

use warden_core::{
    Error, KeypadKey, Result,
    constants::{KEY_BURST_BITS, KEY_BURST_BITS_CHECKED},
};

/// What a single burst from a reader port carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderInput {
    /// A key press on the reader's keypad.
    Key(KeypadKey),
    /// A card frame, one element per bit.
    Frame(Vec<u8>),
}

/// Classify a burst.
///
/// A burst exactly `frame_bits` long is always a card frame, so a frame format
/// that happens to share a key burst length still decodes as a card. Shorter
/// or longer bursts that are not key bursts are returned as frames and left
/// for the decoder to reject.
///
/// # Errors
///
/// Returns `Error::MalformedCredential` if any element is not 0 or 1, or if a
/// key burst carries an unknown code or a bad complement nibble.
pub fn classify(bits: &[u8], frame_bits: usize) -> Result<ReaderInput> {
    check_bits(bits)?;

    if bits.len() == frame_bits {
        return Ok(ReaderInput::Frame(bits.to_vec()));
    }

    match bits.len() {
        KEY_BURST_BITS => key_from_code(pack(bits)).map(ReaderInput::Key),
        KEY_BURST_BITS_CHECKED => {
            let byte = pack(bits);
            let (code, check) = (byte >> 4, byte & 0x0F);
            if check != !code & 0x0F {
                return Err(Error::malformed(format!(
                    "key burst {byte:#04x} fails complement check"
                )));
            }
            key_from_code(code).map(ReaderInput::Key)
        }
        _ => Ok(ReaderInput::Frame(bits.to_vec())),
    }
}

/// Reject anything that is not a bit.
pub(crate) fn check_bits(bits: &[u8]) -> Result<()> {
    match bits.iter().position(|b| *b > 1) {
        Some(pos) => Err(Error::malformed(format!(
            "element {pos} is {} (expected 0 or 1)",
            bits[pos]
        ))),
        None => Ok(()),
    }
}

/// Pack up to eight bits, most significant first.
fn pack(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, b| (acc << 1) | b)
}

fn key_from_code(code: u8) -> Result<KeypadKey> {
    KeypadKey::from_code(code).map_err(|e| Error::malformed(e.to_string()))
}
