//! crates/cardsmith_core/src/csv_import.rs
//!
//! The contact source: turns raw CSV text plus a user-chosen column mapping
//! into a sequence of `Contact` records. Errors are reported as values at
//! this boundary; nothing here panics on malformed input.

use serde::{Deserialize, Serialize};

use crate::domain::Contact;

/// A failure while importing contacts from CSV.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Could not parse the CSV header row: {0}")]
    HeaderParse(String),
    #[error("Could not parse CSV row {row}: {message}")]
    RowParse { row: usize, message: String },
    #[error("Mapped column '{0}' does not exist in the file")]
    ColumnNotFound(String),
    #[error("No rows with both a name and an email were found")]
    NoValidRows,
}

/// Maps the file's arbitrary column names onto the semantic fields the
/// application needs. The prompt column is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub name: String,
    pub email: String,
    pub prompt: Option<String>,
}

/// Parses just the header row of a CSV file.
pub fn parse_headers(raw: &str) -> Result<Vec<String>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ImportError::HeaderParse(e.to_string()))?;
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(ImportError::HeaderParse("the header row is empty".to_string()));
    }
    Ok(headers.iter().map(|h| h.trim().to_string()).collect())
}

/// Suggests a column mapping by fuzzy-matching header names against the
/// substrings users actually put in export files: "name", "email"/"e-mail"
/// and "prompt"/"custom". Returns what it found; unmatched required
/// fields come back as empty strings for the user to fill in.
pub fn suggest_mapping(headers: &[String]) -> ColumnMapping {
    let find = |needles: &[&str]| {
        headers
            .iter()
            .find(|h| {
                let lower = h.to_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .cloned()
    };

    ColumnMapping {
        name: find(&["name"]).unwrap_or_default(),
        email: find(&["email", "e-mail"]).unwrap_or_default(),
        prompt: find(&["prompt", "custom"]),
    }
}

/// Parses the full file into contacts using the given mapping.
///
/// Rows missing a name or an email are silently dropped; if every row is
/// dropped the whole import fails so the caller never starts an empty batch.
pub fn parse_contacts(raw: &str, mapping: &ColumnMapping) -> Result<Vec<Contact>, ImportError> {
    let headers = parse_headers(raw)?;
    let index_of = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ImportError::ColumnNotFound(column.to_string()))
    };

    let name_idx = index_of(&mapping.name)?;
    let email_idx = index_of(&mapping.email)?;
    let prompt_idx = match &mapping.prompt {
        Some(column) if !column.is_empty() => Some(index_of(column)?),
        _ => None,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw.as_bytes());

    let mut contacts = Vec::new();
    for (row_number, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImportError::RowParse {
            row: row_number + 2,
            message: e.to_string(),
        })?;

        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        let name = field(name_idx);
        let email = field(email_idx);
        if name.is_empty() || email.is_empty() {
            continue;
        }

        let custom_prompt_detail = prompt_idx.map(field).filter(|d| !d.is_empty());
        contacts.push(Contact {
            name,
            email,
            custom_prompt_detail,
        });
    }

    if contacts.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    Ok(contacts)
}

/// The manual entry path: a few typed-in names, no CSV. Each contact gets
/// a placeholder email derived from the name so card identity still works.
pub fn contacts_from_names<S: AsRef<str>>(names: &[S]) -> Vec<Contact> {
    names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .map(|name| {
            let slug: String = name
                .to_lowercase()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            Contact {
                name: name.to_string(),
                email: format!("{slug}@manual.local"),
                custom_prompt_detail: None,
            }
        })
        .collect()
}

//=========================================================================================
// Tests
//=========================================================================================
