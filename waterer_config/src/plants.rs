//! Plant dataset loader.
//!
//! Deployments export the dataset with different spreadsheet settings, so
//! parsing tries these dialects in order and keeps the first that yields a
//! complete, consistent table:
//!
//! 1. comma delimited, quotes honored
//! 2. semicolon delimited, quotes honored
//! 3. semicolon delimited, quotes taken literally
//!
//! Expected headers: `id`, `weight` and optionally `description`.
use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct PlantRecord {
    pub id: String,
    /// Target weight in grams
    pub target_weight_g: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    CommaQuoted,
    SemicolonQuoted,
    SemicolonPlain,
}

impl Dialect {
    pub const FALLBACK_ORDER: [Dialect; 3] = [
        Dialect::CommaQuoted,
        Dialect::SemicolonQuoted,
        Dialect::SemicolonPlain,
    ];

    fn reader_builder(self) -> csv::ReaderBuilder {
        let mut b = csv::ReaderBuilder::new();
        b.has_headers(true).trim(csv::Trim::All);
        match self {
            Dialect::CommaQuoted => b.delimiter(b',').quoting(true),
            Dialect::SemicolonQuoted => b.delimiter(b';').quoting(true),
            Dialect::SemicolonPlain => b.delimiter(b';').quoting(false),
        };
        b
    }
}

#[derive(Debug, Deserialize)]
struct PlantRow {
    id: String,
    weight: String,
    #[serde(default)]
    description: Option<String>,
}

fn parse_weight(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_matches('"').trim();
    s.parse::<f64>().ok().filter(|w| w.is_finite() && *w >= 0.0)
}

fn parse_with(text: &str, dialect: Dialect) -> eyre::Result<Vec<PlantRecord>> {
    let mut rdr = dialect.reader_builder().from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read dataset headers: {e}"))?
        .clone();
    for required in ["id", "weight"] {
        if !headers.iter().any(|h| h == required) {
            eyre::bail!("dataset is missing the '{required}' column");
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<PlantRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid dataset row {line}: {e}"))?;
        let id = row.id.trim().trim_matches('"').to_string();
        if id.is_empty() {
            eyre::bail!("dataset row {line} has an empty id");
        }
        let Some(target_weight_g) = parse_weight(&row.weight) else {
            eyre::bail!("dataset row {line} has an invalid weight {:?}", row.weight);
        };
        if !seen.insert(id.clone()) {
            eyre::bail!("dataset row {line} repeats plant id {id}");
        }
        let description = row
            .description
            .map(|d| d.trim().trim_matches('"').to_string())
            .filter(|d| !d.is_empty());
        out.push(PlantRecord {
            id,
            target_weight_g,
            description,
        });
    }
    Ok(out)
}

/// Parse dataset text, trying each dialect in `Dialect::FALLBACK_ORDER`.
pub fn parse_plants(text: &str) -> eyre::Result<(Vec<PlantRecord>, Dialect)> {
    let mut failures = Vec::new();
    for dialect in Dialect::FALLBACK_ORDER {
        match parse_with(text, dialect) {
            Ok(records) => return Ok((records, dialect)),
            Err(e) => failures.push(format!("{dialect:?}: {e}")),
        }
    }
    eyre::bail!("no dataset dialect matched ({})", failures.join("; "))
}

pub fn load_plants(path: &Path) -> eyre::Result<(Vec<PlantRecord>, Dialect)> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open dataset {:?}: {}", path, e))?;
    parse_plants(&text)
}
