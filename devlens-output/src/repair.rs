//! Syntax repair for extracted candidates.
//!
//! The repairer restores well-formedness of text that is almost JSON. It never
//! invents values: every fix either removes noise (comments, trailing commas,
//! redundant escaping) or appends the closers the text already implies.
//!
//! Fixes run in a fixed order and each one leaves nothing for the next run of
//! itself to do, so `repair(repair(x)) == repair(x)`.
//!
//! Unquoted keys, single-quoted strings and similar "different syntax" are
//! deliberately left alone and fail at parse time.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ParseResult;
use crate::parser::{extract_candidate, Candidate};

/// A single fix applied by [`repair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairFix {
    /// `//` and `/* */` comments outside strings were removed.
    StripComments,
    /// Commas directly before `}` / `]` were removed.
    RemoveTrailingCommas,
    /// Missing closers (and an unterminated final string) were appended.
    BalanceBrackets,
    /// One level of redundant `\"` escaping was removed.
    NormalizeEscapes,
}

impl RepairFix {
    /// Short name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StripComments => "strip_comments",
            Self::RemoveTrailingCommas => "remove_trailing_commas",
            Self::BalanceBrackets => "balance_brackets",
            Self::NormalizeEscapes => "normalize_escapes",
        }
    }
}

impl std::fmt::Display for RepairFix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repair a candidate. Never fails; unchanged text records no fixes.
pub fn repair(mut candidate: Candidate) -> Candidate {
    let passes: [(RepairFix, fn(&str, bool) -> Option<String>); 4] = [
        (RepairFix::StripComments, strip_comments),
        (RepairFix::RemoveTrailingCommas, remove_trailing_commas),
        (RepairFix::BalanceBrackets, balance_brackets),
        (RepairFix::NormalizeEscapes, normalize_escapes),
    ];
    // Decided once: the first three passes keep the escaping level intact
    let over_escaped = is_over_escaped(candidate.text());

    for (fix, pass) in passes {
        if let Some(fixed) = pass(candidate.text(), over_escaped) {
            debug!(fix = fix.as_str(), before = candidate.text(), after = %fixed, "Applied repair");
            candidate.apply(fix, fixed);
        }
    }
    candidate
}

/// Repair a bare JSON string.
pub fn repair_json(text: &str) -> String {
    repair(Candidate::new(text, crate::parser::CandidateSource::BraceSpan)).into_text()
}

/// Extract, repair and parse in one step.
///
/// Returns the repaired candidate alongside the parsed value.
pub fn recover_json(text: &str) -> ParseResult<(Candidate, JsonValue)> {
    let candidate = repair(extract_candidate(text)?);
    let value = candidate.parse()?;
    Ok((candidate, value))
}

/// Tracks string-literal state while walking JSON-ish text.
#[derive(Debug, Default)]
struct Scanner {
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Feed one character; returns `true` if it is structural (outside a string
    /// and not escaped).
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        match c {
            '\\' => {
                self.escaped = true;
                false
            }
            '"' => {
                self.in_string = !self.in_string;
                false
            }
            _ => !self.in_string,
        }
    }
}

/// A character as the parser will see it, with the raw text it comes from.
#[derive(Debug, Clone, Copy)]
struct Unit<'a> {
    raw: &'a str,
    c: char,
}

/// Split text into units. Over-escaped text reads `\"` and `\\` as one
/// character each, matching what [`unescape_one_level`] produces.
fn units(text: &str, over_escaped: bool) -> Vec<Unit<'_>> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let pair = match chars.peek() {
            Some(&(_, next)) if over_escaped && c == '\\' && (next == '"' || next == '\\') => {
                Some(next)
            }
            _ => None,
        };
        match pair {
            Some(next) => {
                chars.next();
                out.push(Unit {
                    raw: &text[i..i + 2],
                    c: next,
                });
            }
            None => out.push(Unit {
                raw: &text[i..i + c.len_utf8()],
                c,
            }),
        }
    }
    out
}

fn strip_comments(text: &str, over_escaped: bool) -> Option<String> {
    let units = units(text, over_escaped);
    let mut out = String::with_capacity(text.len());
    let mut scanner = Scanner::default();
    let mut changed = false;
    let mut i = 0;

    while i < units.len() {
        let unit = units[i];
        let structural = scanner.step(unit.c);

        if structural && unit.c == '/' {
            match units.get(i + 1).map(|u| u.c) {
                Some('/') => {
                    changed = true;
                    while i < units.len() && units[i].c != '\n' {
                        i += 1;
                    }
                    continue;
                }
                Some('*') => {
                    changed = true;
                    i += 2;
                    while i < units.len()
                        && !(units[i].c == '*' && units.get(i + 1).map(|u| u.c) == Some('/'))
                    {
                        i += 1;
                    }
                    i = (i + 2).min(units.len());
                    // Keep tokens on either side apart
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }

        out.push_str(unit.raw);
        i += 1;
    }

    changed.then_some(out)
}

fn remove_trailing_commas(text: &str, over_escaped: bool) -> Option<String> {
    let units = units(text, over_escaped);
    let mut out = String::with_capacity(text.len());
    let mut scanner = Scanner::default();
    let mut changed = false;

    for (i, unit) in units.iter().enumerate() {
        let structural = scanner.step(unit.c);
        if structural && unit.c == ',' {
            // Removable when only whitespace/commas remain before a closer or the end
            let next = units[i + 1..]
                .iter()
                .map(|u| u.c)
                .find(|ch| !ch.is_whitespace() && *ch != ',');
            if matches!(next, None | Some('}') | Some(']')) {
                changed = true;
                continue;
            }
        }
        out.push_str(unit.raw);
    }

    changed.then_some(out)
}

fn balance_brackets(text: &str, over_escaped: bool) -> Option<String> {
    let mut scanner = Scanner::default();
    let mut closers: Vec<char> = Vec::new();

    for unit in units(text, over_escaped) {
        if !scanner.step(unit.c) {
            continue;
        }
        match unit.c {
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            // Excess or mismatched closers stay for the parser to reject
            c @ ('}' | ']') if closers.last() == Some(&c) => {
                closers.pop();
            }
            _ => {}
        }
    }

    // A dangling backslash would swallow any quote we append
    if scanner.escaped {
        return None;
    }
    if !scanner.in_string && closers.is_empty() {
        return None;
    }

    let mut out = text.to_string();
    if scanner.in_string {
        out.push_str(if over_escaped { "\\\"" } else { "\"" });
    }
    out.extend(closers.iter().rev());
    Some(out)
}

fn normalize_escapes(text: &str, over_escaped: bool) -> Option<String> {
    over_escaped.then(|| unescape_one_level(text))
}

/// Every quote is escaped: the payload went through one stringify too many.
fn is_over_escaped(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let has_bare_quote = chars
        .iter()
        .enumerate()
        .any(|(i, &c)| c == '"' && (i == 0 || chars[i - 1] != '\\'));
    !has_bare_quote && text.contains("\\\"")
}

fn unescape_one_level(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        match (chars[i], chars.get(i + 1)) {
            ('\\', Some(&next)) if next == '"' || next == '\\' => {
                out.push(next);
                i += 2;
            }
            (c, _) => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}
