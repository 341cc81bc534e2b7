use crate::inst::{Inst, Line, LineKind, PresetTarget, ReadTarget, WriteTarget};

/// Parse a whole program. Pure and total: blank lines are skipped, every
/// remaining line yields exactly one [`Line`] and any failure is captured as
/// data on that line, never raised.
pub fn parse<I, S>(source: I) -> Vec<Line>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    source
        .into_iter()
        .filter(|line| !line.as_ref().trim().is_empty())
        .enumerate()
        .map(|(number, line)| parse_line(number, line.as_ref()))
        .collect()
}

/// Parse one textual mnemonic into an immutable line record.
pub fn parse_line(number: usize, source: &str) -> Line {
    let kind = analyze(source);
    Line { number, source: source.to_string(), kind }
}

fn analyze(source: &str) -> LineKind {
    let trimmed = source.trim();
    if trimmed.starts_with('#') {
        return LineKind::Comment;
    }
    match recognize(&normalize(trimmed)) {
        Ok(inst) => LineKind::Inst(inst),
        Err(msg) => LineKind::Error(msg),
    }
}

/// Upper-case and split on whitespace. A fused subject+digits second token
/// like `I10` is split into a subject letter and a numeric token.
fn normalize(source: &str) -> Vec<String> {
    let mut items = Vec::new();
    for (i, token) in source.to_uppercase().split_whitespace().enumerate() {
        if i == 1
            && token.len() > 1
            && token.starts_with(['I', 'O', 'M', 'T', 'C'])
            && token.chars().any(|c| c.is_ascii_digit())
        {
            items.push(token[..1].to_string());
            items.push(token[1..].to_string());
        } else {
            items.push(token.to_string());
        }
    }
    items
}

/// Recognize one instruction by leading token (letter or word alias) and
/// argument count.
fn recognize(items: &[String]) -> Result<Inst, String> {
    let items: Vec<&str> = items.iter().map(String::as_str).collect();
    let inst = match items.as_slice() {
        // GET 1 => push a constant operand
        &["GET" | "G", value] => Inst::Push { value: bit(value)? },
        // GET I 10 => push the value of input 10
        &["GET" | "G", subject, addr] => Inst::Get {
            subject: read_target(subject)?,
            addr: address(addr)?,
        },
        // GETNOT M 3 => push the negated value of memory 3
        &["GETNOT" | "GN", subject, addr] => Inst::GetNot {
            subject: read_target(subject)?,
            addr: address(addr)?,
        },
        // DUP => duplicate the top operand once
        &["DUP" | "D"] => Inst::Dup { count: 2 },
        // DUP 3 => top operand ends up on the stack 3 times
        &["DUP" | "D", count] => Inst::Dup { count: number(count)? },
        &["NOT" | "N"] => Inst::Not,
        &["AND" | "A"] => Inst::And,
        &["OR" | "O"] => Inst::Or,
        &["XOR" | "X"] => Inst::Xor,
        // MOV O 10 => pop and write to output 10
        &["MOV" | "M", subject, addr] => Inst::Mov {
            subject: write_target(subject)?,
            addr: address(addr)?,
        },
        // CMOV O 10 1 => pop; on true write 1 to output 10
        &["CMOV" | "CM", subject, addr, value] => Inst::CMov {
            subject: write_target(subject)?,
            addr: address(addr)?,
            value: bit(value)?,
        },
        // SET T 10 1500 => arm timer 10 for 1500 ms
        // SET C 10 100  => load counter 10 with 100
        &["SET" | "S", subject, addr, value] => Inst::Set {
            subject: preset_target(subject)?,
            addr: address(addr)?,
            value: value_i32(value)?,
        },
        &["CSET" | "CS", subject, addr, value] => Inst::CSet {
            subject: preset_target(subject)?,
            addr: address(addr)?,
            value: value_i32(value)?,
        },
        // INC C 10 => pop; on true add one to counter 10
        &["INC" | "I", "C", addr] => Inst::Inc { addr: address(addr)? },
        &["DEC" | "D", "C", addr] => Inst::Dec { addr: address(addr)? },
        // CMP C 10 17 => push counter 10 == 17
        &["CMP" | "C", "C", addr, value] => Inst::Cmp {
            addr: address(addr)?,
            value: value_i32(value)?,
        },
        &["GT", "C", addr, value] => Inst::Gt {
            addr: address(addr)?,
            value: value_i32(value)?,
        },
        &["LE", "C", addr, value] => Inst::Le {
            addr: address(addr)?,
            value: value_i32(value)?,
        },
        _ => return Err("unknown instruction".to_string()),
    };
    Ok(inst)
}

fn bit(token: &str) -> Result<bool, String> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(format!("expected 0 or 1, found `{token}`")),
    }
}

fn address(token: &str) -> Result<usize, String> {
    token
        .parse()
        .map_err(|_| format!("invalid address `{token}`"))
}

fn number(token: &str) -> Result<u32, String> {
    token
        .parse()
        .map_err(|_| format!("invalid repeat count `{token}`"))
}

fn value_i32(token: &str) -> Result<i32, String> {
    token
        .parse()
        .map_err(|_| format!("invalid value `{token}`"))
}

fn read_target(token: &str) -> Result<ReadTarget, String> {
    match token {
        "I" => Ok(ReadTarget::Input),
        "O" => Ok(ReadTarget::Output),
        "M" => Ok(ReadTarget::Memory),
        "T" => Ok(ReadTarget::Timer),
        _ => Err(format!("expected subject I, O, M or T, found `{token}`")),
    }
}

fn write_target(token: &str) -> Result<WriteTarget, String> {
    match token {
        "O" => Ok(WriteTarget::Output),
        "M" => Ok(WriteTarget::Memory),
        _ => Err(format!("expected subject O or M, found `{token}`")),
    }
}

fn preset_target(token: &str) -> Result<PresetTarget, String> {
    match token {
        "T" => Ok(PresetTarget::Timer),
        "C" => Ok(PresetTarget::Counter),
        _ => Err(format!("expected subject T or C, found `{token}`")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inst(source: &str) -> Inst {
        match parse_line(0, source).kind {
            LineKind::Inst(inst) => inst,
            other => panic!("expected instruction for `{source}`, got {other:?}"),
        }
    }

    fn error(source: &str) -> String {
        match parse_line(0, source).kind {
            LineKind::Error(msg) => msg,
            other => panic!("expected error for `{source}`, got {other:?}"),
        }
    }

    #[test]
    fn comment_is_never_an_error() {
        let line = parse_line(0, "# note");
        assert!(line.is_comment());
        assert!(!line.has_error());
        assert!(line.inst().is_none());
    }

    #[test]
    fn constant_push() {
        assert_eq!(inst("GET 1"), Inst::Push { value: true });
        assert_eq!(inst("get 0"), Inst::Push { value: false });
        assert!(error("GET 2").contains("expected 0 or 1"));
    }

    #[test]
    fn addressed_get() {
        assert_eq!(
            inst("GET I 10"),
            Inst::Get { subject: ReadTarget::Input, addr: 10 }
        );
        assert_eq!(
            inst("GETNOT T 3"),
            Inst::GetNot { subject: ReadTarget::Timer, addr: 3 }
        );
        assert!(error("GET C 10").contains("expected subject I, O, M or T"));
    }

    #[test]
    fn fused_subject_token_splits() {
        assert_eq!(inst("GET I10"), inst("GET I 10"));
        assert_eq!(inst("MOV O3"), inst("MOV O 3"));
    }

    #[test]
    fn short_aliases_match_long_forms() {
        assert_eq!(inst("G 1"), inst("GET 1"));
        assert_eq!(inst("GN I 0"), inst("GETNOT I 0"));
        assert_eq!(inst("N"), inst("NOT"));
        assert_eq!(inst("A"), inst("AND"));
        assert_eq!(inst("O"), inst("OR"));
        assert_eq!(inst("X"), inst("XOR"));
        assert_eq!(inst("M M 1"), inst("MOV M 1"));
        assert_eq!(inst("CM O 1 1"), inst("CMOV O 1 1"));
        assert_eq!(inst("S T 0 500"), inst("SET T 0 500"));
        assert_eq!(inst("CS C 0 7"), inst("CSET C 0 7"));
        assert_eq!(inst("I C 4"), inst("INC C 4"));
        assert_eq!(inst("D C 4"), inst("DEC C 4"));
        assert_eq!(inst("C C 0 17"), inst("CMP C 0 17"));
    }

    #[test]
    fn dup_with_optional_count() {
        assert_eq!(inst("DUP"), Inst::Dup { count: 2 });
        assert_eq!(inst("DUP 3"), Inst::Dup { count: 3 });
        assert!(error("DUP -1").contains("invalid repeat count"));
    }

    #[test]
    fn set_family() {
        assert_eq!(
            inst("SET T 10 1500"),
            Inst::Set { subject: PresetTarget::Timer, addr: 10, value: 1500 }
        );
        assert_eq!(
            inst("CSET C 2 -5"),
            Inst::CSet { subject: PresetTarget::Counter, addr: 2, value: -5 }
        );
        assert!(error("SET M 0 1").contains("expected subject T or C"));
    }

    #[test]
    fn comparisons() {
        assert_eq!(inst("CMP C 10 17"), Inst::Cmp { addr: 10, value: 17 });
        assert_eq!(inst("GT C 10 17"), Inst::Gt { addr: 10, value: 17 });
        assert_eq!(inst("LE C 10 -2"), Inst::Le { addr: 10, value: -2 });
    }

    #[test]
    fn bad_number_is_an_error() {
        assert!(error("GET I x").contains("invalid address"));
        assert!(error("SET C 0 many").contains("invalid value"));
    }

    #[test]
    fn unknown_instruction() {
        assert_eq!(error("FROB 1 2"), "unknown instruction");
        // Wrong arity of a known opcode is just as unknown
        assert_eq!(error("AND 1"), "unknown instruction");
    }

    #[test]
    fn blank_lines_are_skipped_and_numbering_is_dense() {
        let lines = parse(["GET 1", "", "   ", "MOV O 0"]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 0);
        assert_eq!(lines[1].number, 1);
        assert_eq!(lines[1].source, "MOV O 0");
    }

    #[test]
    fn kinds_are_mutually_exclusive() {
        for source in ["# comment", "GET 1", "FROB"] {
            let line = parse_line(0, source);
            let flags = [line.is_comment(), line.inst().is_some(), line.has_error()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "line `{source}`");
        }
    }
}
