//! Upload format detection
//!
//! Separator, encoding, and decimal-mark sniffing over the raw bytes of an
//! upload. Detection runs once at ingest; the result is frozen into the
//! upload descriptor.

use crate::descriptor::TableEncoding;

/// Candidate field separators, in tie-break order
const SEPARATORS: [char; 3] = [';', ',', '\t'];

/// How many data lines the decimal-mark heuristic samples
const DECIMAL_SAMPLE_LINES: usize = 20;

/// Detected format of an uploaded table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    /// Character encoding
    pub encoding: TableEncoding,
    /// Field separator
    pub separator: char,
    /// Decimal mark (`.` or `,`)
    pub decimal_mark: char,
}

impl TableFormat {
    /// Sniff the format from raw upload bytes
    pub fn detect(bytes: &[u8]) -> Self {
        let encoding = detect_encoding(bytes);
        let text = encoding.decode(bytes);
        let separator = detect_separator(first_line(&text));
        let decimal_mark = detect_decimal_mark(&text, separator);
        Self {
            encoding,
            separator,
            decimal_mark,
        }
    }
}

/// UTF-8 when the whole buffer validates, Latin-1 otherwise
fn detect_encoding(bytes: &[u8]) -> TableEncoding {
    if std::str::from_utf8(bytes).is_ok() {
        TableEncoding::Utf8
    } else {
        TableEncoding::Latin1
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Majority vote over the header line
///
/// Ties break toward the semicolon: a European CSV with decimal commas has
/// commas inside values, so the semicolon wins whenever both appear.
fn detect_separator(header: &str) -> char {
    SEPARATORS
        .into_iter()
        .map(|sep| (sep, header.matches(sep).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(sep, count)| (*count, std::cmp::Reverse(separator_rank(*sep))))
        .map(|(sep, _)| sep)
        .unwrap_or(',')
}

fn separator_rank(sep: char) -> usize {
    SEPARATORS.iter().position(|s| *s == sep).unwrap_or(usize::MAX)
}

/// Decimal comma iff the separator leaves the comma free for numbers and a
/// sampled data field actually looks like `123,45`
fn detect_decimal_mark(text: &str, separator: char) -> char {
    if separator == ',' {
        return '.';
    }
    let found = text
        .lines()
        .skip(1)
        .take(DECIMAL_SAMPLE_LINES)
        .flat_map(|line| line.split(separator))
        .any(|field| is_decimal_comma_number(field.trim()));
    if found { ',' } else { '.' }
}

/// `-?digits,digits` with exactly one comma
fn is_decimal_comma_number(field: &str) -> bool {
    let body = field.strip_prefix('-').unwrap_or(field);
    let Some((int_part, frac_part)) = body.split_once(',') else {
        return false;
    };
    !int_part.is_empty()
        && !frac_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "sniff_test.rs"]
mod sniff_test;
