//! Reader input handling for Wiegand card readers.
//!
//! A reader port hands over bursts of bits. [`wiegand::classify`] tells keypad
//! bursts apart from card frames, and [`CardDecoder`] turns a card frame into a
//! canonical [`CredentialId`](warden_core::CredentialId) under the configured
//! [`CardFormat`](warden_core::CardFormat):
//!
//! ```
//! use warden_core::CardFormat;
//! use warden_rfid::CardDecoder;
//!
//! let decoder = CardDecoder::new(CardFormat::ParityStripped, 6);
//! // even parity | 1 1 | 0 1 | odd parity
//! let id = decoder.decode(&[0, 1, 1, 0, 1, 0]).unwrap();
//! assert_eq!(id.as_u64(), 0b1101);
//! ```

pub mod adapter;
pub mod decoder;
pub mod wiegand;

pub use adapter::ReaderInputAdapter;
pub use decoder::CardDecoder;
pub use wiegand::{ReaderInput, classify};
