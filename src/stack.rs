use crate::error::{Fault, Result};

/// LIFO boolean register used for all computation.
///
/// Pushing never fails; popping or peeking an empty stack is a hard fault
/// that the executor must propagate, never absorb.
#[derive(Default)]
pub struct Stack {
    items: Vec<bool>,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    pub fn push(&mut self, value: bool) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> Result<bool> {
        self.items.pop().ok_or(Fault::StackUnderflow)
    }

    pub fn top(&self) -> Result<bool> {
        self.items.last().copied().ok_or(Fault::StackUnderflow)
    }

    /// Drop residual operands at a cycle boundary.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lifo_order() {
        let mut stack = Stack::new();
        stack.push(true);
        stack.push(false);
        assert_eq!(stack.pop(), Ok(false));
        assert_eq!(stack.pop(), Ok(true));
    }

    #[test]
    fn underflow_is_a_fault() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(Fault::StackUnderflow));
        assert_eq!(stack.top(), Err(Fault::StackUnderflow));
    }

    #[test]
    fn top_does_not_consume() {
        let mut stack = Stack::new();
        stack.push(true);
        assert_eq!(stack.top(), Ok(true));
        assert_eq!(stack.pop(), Ok(true));
        assert_eq!(stack.pop(), Err(Fault::StackUnderflow));
    }

    #[test]
    fn clear_empties() {
        let mut stack = Stack::new();
        stack.push(true);
        stack.clear();
        assert_eq!(stack.pop(), Err(Fault::StackUnderflow));
    }
}
