use thiserror::Error;

/// Faults raised by the engine and its storage components.
///
/// Syntax errors are never represented here: the parser captures them as data
/// on the offending [`Line`](crate::Line). Everything below is either a usage
/// fault on the caller's thread or an execution fault that kills the scan
/// worker.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Fault {
    /// Pop or top on an empty operand stack.
    #[error("operand stack is empty")]
    StackUnderflow,

    /// Addressed a cell past the end of a bank.
    #[error("{bank} address {addr} out of range (length {len})")]
    OutOfRange {
        bank: &'static str,
        addr: usize,
        len: usize,
    },

    /// Tried to replace the program while the scan worker is active.
    #[error("cannot load a program while running")]
    LoadWhileRunning,

    /// Tried to toggle an input device that is not user-modifiable.
    #[error("input {addr} is not a switch and cannot be toggled")]
    ReadOnlyInput { addr: usize },
}

pub type Result<T> = std::result::Result<T, Fault>;
