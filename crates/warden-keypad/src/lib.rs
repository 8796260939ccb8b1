//! PIN entry for readers with an integrated keypad.
//!
//! [`KeypadInputAdapter`] accumulates digit presses into a bounded buffer and
//! clears it after a period of inactivity. Time is passed in explicitly as a
//! [`Tick`](warden_core::Tick); the adapter never sleeps.
//!
//! ```
//! use warden_core::{KeypadKey, Tick};
//! use warden_keypad::{KeypadEvent, KeypadInputAdapter};
//!
//! let mut keypad = KeypadInputAdapter::new(8, 5000, KeypadKey::Hash);
//! keypad.press(KeypadKey::Digit(4), Tick::new(10));
//! keypad.press(KeypadKey::Digit(2), Tick::new(20));
//!
//! match keypad.press(KeypadKey::Hash, Tick::new(30)) {
//!     KeypadEvent::Submitted(pin) => assert_eq!(pin.as_str(), "42"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

pub mod buffer;

pub use buffer::{InputTimedOut, KeypadBuffer, KeypadEvent, KeypadInputAdapter};
