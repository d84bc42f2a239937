//! The measurement extraction parser.
//!
//! Three strategies run in priority order, independently for each dimension:
//!
//! 1. labeled scan over the whole text (`p2p: 21`, `length 28cm`)
//! 2. paired `W x L` scan; the smaller side is the width
//! 3. per-line fallback with a looser label pattern, only for dimensions the
//!    first two left unresolved
//!
//! Within the first two strategies the first candidate in document order wins;
//! labeled candidates always rank ahead of paired ones.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::pair::MeasurementPair;
use crate::units::{normalize_quotes, to_inches};

const NUM: &str = r"(?P<val>[0-9]+(?:\.[0-9]+)?(?:\s+[0-9]/[0-9])?)";
const UNIT: &str = r#"(?P<unit>\s*(?:cm|mm|in|inch|inches|["″”]))?"#;
const P2P_LABELS: &str = r"(?:p2p|pit\s*[- ]?to\s*[- ]?pit|pit[- ]?to[- ]?pit|pit\s*to\s*pit|chest|width|across\s*chest)";
const LENGTH_LABELS: &str = r"(?:length|top\s*to\s*bottom|back\s*length|hps\s*to\s*hem)";
const PAIR_UNIT_1: &str = r#"(?P<u1>\s*(?:cm|mm|in|inch|inches|["″”]))?"#;
const PAIR_UNIT_2: &str = r#"(?P<u2>\s*(?:cm|mm|in|inch|inches|["″”]))?"#;

struct Patterns {
    p2p: Regex,
    length: Regex,
    pair: Regex,
    p2p_line: Regex,
    length_line: Regex,
}

static PATTERNS: Lazy<Patterns> = Lazy::new(|| {
    let labeled =
        |labels: &str| format!(r"(?i)\b{labels}\b[^0-9]{{0,10}}{NUM}{UNIT}");
    let loose = |labels: &str| format!(r"(?i)\b{labels}\b.*?{NUM}{UNIT}");
    let pair = format!(
        r"(?i)\b(?P<w>[0-9]+(?:\.[0-9]+)?){PAIR_UNIT_1}\s*[x×]\s*(?P<l>[0-9]+(?:\.[0-9]+)?){PAIR_UNIT_2}\b"
    );

    Patterns {
        p2p: compile(&labeled(P2P_LABELS)),
        length: compile(&labeled(LENGTH_LABELS)),
        pair: compile(&pair),
        p2p_line: compile(&loose(P2P_LABELS)),
        length_line: compile(&loose(LENGTH_LABELS)),
    }
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("measurement pattern is a valid regex")
}

/// Which strategy resolved a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Labeled,
    Paired,
    LineFallback,
}

/// Full result of one extraction, including every candidate seen by the
/// labeled and paired scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub pair: MeasurementPair,
    pub p2p_source: Option<Strategy>,
    pub length_source: Option<Strategy>,
    pub p2p_candidates: Vec<f64>,
    pub length_candidates: Vec<f64>,
}

/// Extracts pit-to-pit width and length from listing text.
///
/// The parser is stateless beyond its compiled pattern set, which is shared
/// process-wide, so it is cheap to construct and to copy into worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementParser;

impl MeasurementParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract `(p2p, length)` in inches. Never fails; absent values are `None`.
    pub fn extract(&self, text: &str) -> MeasurementPair {
        self.extract_detailed(text).pair
    }

    /// Like [`extract`](Self::extract), keeping the provenance of each value.
    pub fn extract_detailed(&self, text: &str) -> Extraction {
        let t = normalize_quotes(&text.to_lowercase());
        let patterns = &*PATTERNS;

        let mut p2p: Vec<(f64, Strategy)> = labeled_values(&patterns.p2p, &t);
        let mut length: Vec<(f64, Strategy)> = labeled_values(&patterns.length, &t);

        for caps in patterns.pair.captures_iter(&t) {
            let w = to_inches(&caps["w"], group(&caps, "u1"));
            let l = to_inches(&caps["l"], group(&caps, "u2"));
            let (Ok(w), Ok(l)) = (w, l) else {
                continue;
            };
            let (narrow, wide) = if l < w { (l, w) } else { (w, l) };
            p2p.push((narrow, Strategy::Paired));
            length.push((wide, Strategy::Paired));
        }

        let mut extraction = Extraction {
            pair: MeasurementPair::new(
                p2p.first().map(|(v, _)| *v),
                length.first().map(|(v, _)| *v),
            ),
            p2p_source: p2p.first().map(|(_, s)| *s),
            length_source: length.first().map(|(_, s)| *s),
            p2p_candidates: p2p.iter().map(|(v, _)| *v).collect(),
            length_candidates: length.iter().map(|(v, _)| *v).collect(),
        };

        if p2p.is_empty() && length.is_empty() {
            tracing::debug!(chars = t.len(), "no measurement candidates in text");
        } else {
            tracing::debug!(
                p2p = ?extraction.p2p_candidates,
                length = ?extraction.length_candidates,
                "parsed measurement candidates"
            );
        }

        if !extraction.pair.is_complete() {
            line_fallback(&t, &mut extraction);
        }

        extraction
    }
}

fn labeled_values(re: &Regex, text: &str) -> Vec<(f64, Strategy)> {
    re.captures_iter(text)
        .filter_map(|caps| to_inches(&caps["val"], group(&caps, "unit")).ok())
        .map(|v| (v, Strategy::Labeled))
        .collect()
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn line_fallback(text: &str, extraction: &mut Extraction) {
    let patterns = &*PATTERNS;
    for line in text.split(is_line_break) {
        if extraction.pair.p2p.is_none() {
            if let Some(v) = first_loose_value(&patterns.p2p_line, line) {
                tracing::debug!(line = line.trim(), "line fallback resolved p2p");
                extraction.pair.p2p = Some(v);
                extraction.p2p_source = Some(Strategy::LineFallback);
            }
        }
        if extraction.pair.length.is_none() {
            if let Some(v) = first_loose_value(&patterns.length_line, line) {
                tracing::debug!(line = line.trim(), "line fallback resolved length");
                extraction.pair.length = Some(v);
                extraction.length_source = Some(Strategy::LineFallback);
            }
        }
        if extraction.pair.is_complete() {
            break;
        }
    }
}

fn first_loose_value(re: &Regex, line: &str) -> Option<f64> {
    let caps = re.captures(line)?;
    to_inches(&caps["val"], group(&caps, "unit")).ok()
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{1C}' | '\u{1D}' | '\u{1E}' | '\u{85}'
            | '\u{2028}' | '\u{2029}'
    )
}
