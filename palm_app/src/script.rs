//! Register access scripts
//!
//! One command per line:
//!
//! ```text
//! # comment
//! supervisor
//! w16 0xfffff202 0x0123
//! r16 0xfffff202 0x0123
//! run 100
//! user
//! ```
//!
//! A read with an expected value aborts the script if the value doesn't match.

use palm_lib::{AccessWidth, CycleCount};

use crate::error::{AppError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Write {
        width: AccessWidth,
        addr: u32,
        value: u32,
    },
    Read {
        width: AccessWidth,
        addr: u32,
        expected: Option<u32>,
    },
    Run(CycleCount),
    Privilege {
        supervisor: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source
    pub number: usize,
    pub command: Command,
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_number(s: &str) -> Option<u64> {
    let s = s.replace('_', "");

    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

pub fn parse(source: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();

    for (i, text) in source.lines().enumerate() {
        let number = i + 1;

        match parse_line(text) {
            Ok(Some(command)) => lines.push(Line { number, command }),
            Ok(None) => (),
            Err(msg) => return Err(AppError::Script { line: number, msg }),
        }
    }

    Ok(lines)
}

fn parse_line(text: &str) -> ::std::result::Result<Option<Command>, String> {
    let text = match text.find('#') {
        Some(pos) => &text[..pos],
        None => text,
    };

    let mut tokens = text.split_whitespace();

    let Some(op) = tokens.next() else {
        return Ok(None);
    };

    let args: Vec<&str> = tokens.collect();

    let command = match op {
        "w8" | "w16" | "w32" => {
            let width = width(&op[1..]);

            let [addr, value] = args[..] else {
                return Err(format!("`{}` takes an address and a value", op));
            };

            Command::Write {
                width,
                addr: address(addr)?,
                value: value_for(width, value)?,
            }
        }
        "r8" | "r16" | "r32" => {
            let width = width(&op[1..]);

            let (addr, expected) = match args[..] {
                [addr] => (addr, None),
                [addr, expected] => (addr, Some(value_for(width, expected)?)),
                _ => return Err(format!("`{}` takes an address and an optional value", op)),
            };

            Command::Read {
                width,
                addr: address(addr)?,
                expected,
            }
        }
        "run" => {
            let [cycles] = args[..] else {
                return Err("`run` takes a cycle count".to_string());
            };

            match parse_number(cycles) {
                Some(c) => Command::Run(c),
                None => return Err(format!("invalid cycle count `{}`", cycles)),
            }
        }
        "user" | "supervisor" if args.is_empty() => Command::Privilege {
            supervisor: op == "supervisor",
        },
        _ => return Err(format!("unknown command `{}`", text.trim())),
    };

    Ok(Some(command))
}

fn width(bits: &str) -> AccessWidth {
    match bits {
        "8" => AccessWidth::Byte,
        "16" => AccessWidth::HalfWord,
        _ => AccessWidth::Word,
    }
}

fn address(s: &str) -> ::std::result::Result<u32, String> {
    parse_number(s)
        .and_then(|a| u32::try_from(a).ok())
        .ok_or_else(|| format!("invalid address `{}`", s))
}

/// Parse `s` and check that it fits in an access of `width`
fn value_for(width: AccessWidth, s: &str) -> ::std::result::Result<u32, String> {
    let v = parse_number(s).ok_or_else(|| format!("invalid value `{}`", s))?;

    let bits = width as u32 * 8;

    if v >> bits != 0 {
        return Err(format!("value `{}` doesn't fit in {} bits", s, bits));
    }

    Ok(v as u32)
}

#[test]
fn parse_script() {
    let source = "\
# Unlock and program the PLL
supervisor
w16 0xfffff202 0x0123   # PLLFSR
r16 0xFFFFF202 0x123

r32 0x41000008
run 1_000
user
w8 0x41000000 135
";

    let lines = parse(source).unwrap();

    let commands: Vec<(usize, Command)> = lines.iter().map(|l| (l.number, l.command)).collect();

    assert_eq!(
        commands,
        vec![
            (2, Command::Privilege { supervisor: true }),
            (
                3,
                Command::Write {
                    width: AccessWidth::HalfWord,
                    addr: 0xffff_f202,
                    value: 0x123
                }
            ),
            (
                4,
                Command::Read {
                    width: AccessWidth::HalfWord,
                    addr: 0xffff_f202,
                    expected: Some(0x123)
                }
            ),
            (
                6,
                Command::Read {
                    width: AccessWidth::Word,
                    addr: 0x4100_0008,
                    expected: None
                }
            ),
            (7, Command::Run(1000)),
            (8, Command::Privilege { supervisor: false }),
            (
                9,
                Command::Write {
                    width: AccessWidth::Byte,
                    addr: 0x4100_0000,
                    value: 135
                }
            ),
        ]
    );
}

#[test]
fn parse_errors() {
    let line_of = |source: &str| match parse(source) {
        Err(AppError::Script { line, .. }) => Some(line),
        _ => None,
    };

    assert_eq!(line_of("w8 0x0 0x100"), Some(1));
    assert_eq!(line_of("\nw16 0x0"), Some(2));
    assert_eq!(line_of("run\n"), Some(1));
    assert_eq!(line_of("r32 0x1_0000_0000"), Some(1));
    assert_eq!(line_of("user 1"), Some(1));
    assert_eq!(line_of("# ok\n\njump 0x100"), Some(3));
    assert_eq!(line_of("w32 0xfffff000 zz"), Some(1));
}
