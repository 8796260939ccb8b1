//! Mock device implementations for testing and development.
//!
//! Each mock is created together with a handle. The device half is moved into
//! the controller; the handle stays with the test (or the emulator's stdin
//! loop) to inject input and observe outputs. Handles are cheap to clone.

pub mod clock;
pub mod console;
pub mod eeprom;
pub mod output;
pub mod reader;
pub mod sensor;

// Re-export commonly used types
pub use clock::{MockClock, MockClockHandle};
pub use console::{MockConsole, MockConsoleHandle};
pub use eeprom::MemoryEeprom;
pub use output::{MockOutput, MockOutputHandle};
pub use reader::{MockReader, MockReaderHandle};
pub use sensor::{MockSensor, MockSensorHandle};
