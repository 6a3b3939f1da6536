//! tiobench completion report parsing
//!
//! The driver's stdout is the only record of what it actually executed, so
//! all knowledge of its format lives here. Two shapes are recognised:
//!
//! ```text
//! n=1000
//! MAP 5f1a_93 C:1 R:48211 per sec
//! ```
//!
//! from `--run-test-parallel-data-stress`, and
//!
//! ```text
//! Total Feeders: 3
//! Symbols: PETR4 VALE3 ITUB4
//! ```
//!
//! from `--run-test-umdf-feeder-stress`.

use crate::common::{Error, Result};

const SYMBOLS_MARKER: &str = "Symbols: ";
const COUNT_MARKER: &str = "n=";
const MAP_MARKER: &str = "MAP ";

/// Facts recovered from a parallel data stress report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapReport {
    /// Records the driver claims to have written
    pub expected: u64,
    /// Name of the map container it wrote them to
    pub container: String,
}

/// Captured driver output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkReport {
    raw: String,
}

impl BenchmarkReport {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The text exactly as captured
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn map_report(&self) -> Result<MapReport> {
        parse_map_report(&self.raw)
    }

    pub fn symbols(&self) -> Result<Vec<String>> {
        parse_symbols(&self.raw)
    }
}

fn is_container_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_lowercase() || c == '_'
}

/// Extract `n=<count>` and the `MAP <container>` it refers to
///
/// Line breaks are removed first. The last `MAP` followed by at least one
/// `[0-9a-z_]` character wins, paired with the last `n=<digits>` that ends
/// before it.
pub fn parse_map_report(text: &str) -> Result<MapReport> {
    let flat: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    let (map_start, container) = flat
        .rmatch_indices(MAP_MARKER)
        .find_map(|(pos, _)| {
            let rest = &flat[pos + MAP_MARKER.len()..];
            let len = rest.find(|c| !is_container_char(c)).unwrap_or(rest.len());
            (len > 0).then(|| (pos, rest[..len].to_string()))
        })
        .ok_or_else(|| Error::Parse("no 'MAP <container>' line in driver output".to_string()))?;

    let digits = flat[..map_start]
        .rmatch_indices(COUNT_MARKER)
        .find_map(|(pos, _)| {
            let rest = &flat[pos + COUNT_MARKER.len()..map_start];
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            (len > 0).then(|| &rest[..len])
        })
        .ok_or_else(|| {
            Error::Parse(format!(
                "no 'n=<count>' before 'MAP {}' in driver output",
                container
            ))
        })?;

    let expected = digits
        .parse()
        .map_err(|_| Error::Parse(format!("record count '{}' out of range", digits)))?;

    Ok(MapReport {
        expected,
        container,
    })
}

/// Extract the space-separated list following `Symbols: `
///
/// The list ends at the first line break (`\n`, with a preceding `\r`
/// dropped) or at end of text. Tokens are split on single spaces and kept in
/// order, so doubled spaces produce empty entries.
pub fn parse_symbols(text: &str) -> Result<Vec<String>> {
    let start = text
        .find(SYMBOLS_MARKER)
        .ok_or_else(|| Error::Parse("no 'Symbols: ' line in driver output".to_string()))?;

    let rest = &text[start + SYMBOLS_MARKER.len()..];
    let line = match rest.find('\n') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let line = line.strip_suffix('\r').unwrap_or(line);

    Ok(line.split(' ').map(str::to_string).collect())
}
