/// Bank a value can be read from onto the operand stack.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReadTarget {
    Input,
    Output,
    Memory,
    Timer,
}

/// Bank a popped value can be written to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WriteTarget {
    Output,
    Memory,
}

/// Bank a SET/CSET immediate loads: a timer duration or a counter value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PresetTarget {
    Timer,
    Counter,
}

/// Single decoded instruction. Operands are typed per variant, so an
/// opcode/subject combination the executor cannot handle is unrepresentable
/// and gets rejected at parse time instead.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Inst {
    /// Push a constant operand.
    Push { value: bool },
    /// Push the value of an addressed cell.
    Get { subject: ReadTarget, addr: usize },
    /// Push the negated value of an addressed cell.
    GetNot { subject: ReadTarget, addr: usize },
    /// Duplicate the top of stack so it appears `count` times in total.
    Dup { count: u32 },
    Not,
    And,
    Or,
    Xor,
    /// Pop and write to an addressed cell.
    Mov { subject: WriteTarget, addr: usize },
    /// Pop a condition; on true write the immediate to an addressed cell.
    CMov { subject: WriteTarget, addr: usize, value: bool },
    /// Load a timer duration (ms) or counter value.
    Set { subject: PresetTarget, addr: usize, value: i32 },
    /// As `Set`, gated by a popped condition.
    CSet { subject: PresetTarget, addr: usize, value: i32 },
    /// Pop a condition; on true add one to a counter.
    Inc { addr: usize },
    /// Pop a condition; on true subtract one from a counter.
    Dec { addr: usize },
    /// Push counter == value.
    Cmp { addr: usize, value: i32 },
    /// Push counter > value.
    Gt { addr: usize, value: i32 },
    /// Push counter < value.
    Le { addr: usize, value: i32 },
}

/// What one source line turned out to be. A line is exactly one of these,
/// never two.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineKind {
    /// Whole-line `#` comment; never executed, never erroneous.
    Comment,
    Inst(Inst),
    /// Syntax error captured as data with a descriptive message.
    Error(String),
}

/// One parsed program line. Built once at load time, immutable afterward.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Line {
    pub number: usize,
    pub source: String,
    pub kind: LineKind,
}

impl Line {
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, LineKind::Comment)
    }

    pub fn has_error(&self) -> bool {
        matches!(self.kind, LineKind::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.kind {
            LineKind::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn inst(&self) -> Option<&Inst> {
        match &self.kind {
            LineKind::Inst(inst) => Some(inst),
            _ => None,
        }
    }
}
