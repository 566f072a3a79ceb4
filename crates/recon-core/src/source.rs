//! Record sources and extraction
//!
//! Record sets are loaded from CSV (header row = field names) or JSON (an
//! array of flat objects). CSV cells stay text; numeric and date coercion
//! happens at comparison time, so identifiers like `00123` keep their zeros.
//!
//! Extraction projects records onto the columns named by extraction rules.
//! It fails loudly rather than inventing rows when there is nothing to
//! extract.

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ExtractionRule, FieldValue, MatchingRule, ProfileContext, Record};
use crate::terms::aggregate_terms;

/// Load a record set from a `.csv` or `.json` file
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "Record source {} does not exist",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let records = match extension.as_deref() {
        Some("csv") => parse_csv_records(fs::File::open(path)?)?,
        Some("json") => parse_json_records(&fs::read_to_string(path)?)?,
        _ => {
            return Err(Error::InvalidRequest(format!(
                "Unsupported record source {} (expected .csv or .json)",
                path.display()
            )))
        }
    };

    debug!(path = %path.display(), records = records.len(), "Loaded record source");
    Ok(records)
}

/// Parse CSV with a header row. Short rows are allowed; missing cells are
/// simply absent from the record.
pub fn parse_csv_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result?;
        let record: Record = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .filter_map(|(i, header)| row.get(i).map(|cell| (header, cell)))
            .collect();
        if !record.is_empty() {
            records.push(record);
        }
    }

    Ok(records)
}

/// Parse a JSON array of flat objects
pub fn parse_json_records(text: &str) -> Result<Vec<Record>> {
    serde_json::from_str(text)
        .map_err(|e| Error::InvalidData(format!("Expected a JSON array of flat objects: {}", e)))
}

/// Project records onto the columns named by the extraction rules.
///
/// Every output record has exactly the aggregated term set as its fields;
/// cells missing or null in the source become empty strings.
pub fn extract_records(records: &[Record], rules: &[ExtractionRule]) -> Result<Vec<Record>> {
    let terms = aggregate_terms(rules);
    if terms.is_empty() {
        return Err(Error::Extraction(
            "No extraction terms found in the extraction rules".into(),
        ));
    }
    if records.is_empty() {
        return Err(Error::Extraction(
            "Record source is empty; nothing to extract".into(),
        ));
    }

    Ok(records
        .iter()
        .map(|record| {
            terms
                .iter()
                .map(|term| {
                    let value = match record.get(term) {
                        Some(FieldValue::Null) | None => FieldValue::Text(String::new()),
                        Some(v) => v.clone(),
                    };
                    (term.as_str(), value)
                })
                .collect()
        })
        .collect())
}

/// Rules and context for one reconciliation profile
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub profile: ProfileContext,
    #[serde(default)]
    pub matching_rules: Vec<MatchingRule>,
    #[serde(default)]
    pub extraction_rules: Vec<ExtractionRule>,
}

impl RuleSet {
    /// Load a TOML rules file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Rules file {} does not exist",
                path.display()
            )));
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid rules TOML: {}", e)))
    }
}
