// Parsing
mod parser;
pub use parser::{parse, parse_line};
mod inst;
pub use inst::{Inst, Line, LineKind, PresetTarget, ReadTarget, WriteTarget};

// Running
mod engine;
pub use engine::{Engine, COUNTER_LEN, DEFAULT_IO_LEN, MEMORY_LEN, SCAN_INTERVAL, TIMER_LEN};
mod bank;
mod stack;

// Devices and change publication
mod device;
pub use device::{InputDevice, OutputDevice};
mod notify;
pub use notify::Notifier;

mod error;
pub use error::Fault;
