//! Natural ("human") ordering of frame filenames.
//!
//! Names are split into alternating runs of ASCII digits and everything else. Digit runs compare
//! by numeric value, text runs compare case-insensitively, so `frame9` sorts before `frame10`.

use std::cmp::Ordering;
use std::ffi::OsStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyPart {
    /// Digit run with leading zeros stripped; compared by value.
    Num(String),
    /// Lowercased text run.
    Text(String),
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Equal-length digit strings without leading zeros compare like their values, and a
            // longer one is always larger. No integer parsing, so no overflow on long runs.
            (KeyPart::Num(a), KeyPart::Num(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Num(_), KeyPart::Text(_)) => Ordering::Less,
            (KeyPart::Text(_), KeyPart::Num(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn natural_key(name: &str) -> Vec<KeyPart> {
    let mut parts = Vec::new();
    let mut run = String::new();
    let mut in_digits = false;

    for ch in name.chars() {
        let is_digit = ch.is_ascii_digit();
        if !run.is_empty() && is_digit != in_digits {
            parts.push(finish_run(std::mem::take(&mut run), in_digits));
        }
        in_digits = is_digit;
        run.push(ch);
    }
    if !run.is_empty() {
        parts.push(finish_run(run, in_digits));
    }
    parts
}

fn finish_run(run: String, digits: bool) -> KeyPart {
    if digits {
        let trimmed = run.trim_start_matches('0');
        KeyPart::Num(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    } else {
        KeyPart::Text(run.to_lowercase())
    }
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// Sort `names` naturally, then reverse the sorted list when `reverse` is set.
///
/// The sort is stable, so names with equal keys (e.g. `a1` and `A01`) keep their input order
/// before the optional reversal. Names that are not valid UTF-8 are keyed by their lossy form.
pub fn order_names<S: AsRef<OsStr>>(names: &mut [S], reverse: bool) {
    names.sort_by_cached_key(|n| natural_key(&n.as_ref().to_string_lossy()));
    if reverse {
        names.reverse();
    }
}
