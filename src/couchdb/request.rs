//! `_bulk_docs` request bodies

use eyre::{Context, Result};
use serde::Serialize;
use serde_json::value::RawValue;

/// How a batch of raw lines becomes a `_bulk_docs` body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyMode {
    /// Lines joined with `, ` inside `{ "docs" : [ ... ] }`, byte for byte.
    /// Lines are not checked; a malformed line yields a malformed body.
    #[default]
    Verbatim,
    /// Every line must parse as a JSON object. The array is assembled by
    /// `serde_json`, so surrounding whitespace is dropped and a bad line
    /// fails the batch before anything is sent.
    Strict,
}

/// A ready-to-send `_bulk_docs` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    body: String,
    docs: usize,
}

#[derive(Serialize)]
struct Docs<'a> {
    docs: Vec<&'a RawValue>,
}

impl BulkRequest {
    pub fn build(records: &[String], mode: BodyMode) -> Result<Self> {
        match mode {
            BodyMode::Verbatim => Ok(Self::verbatim(records)),
            BodyMode::Strict => Self::strict(records),
        }
    }

    /// `{ "docs" : [ r1, r2, ... ] }` with every record copied as-is.
    pub fn verbatim(records: &[String]) -> Self {
        Self {
            body: format!("{{ \"docs\" : [ {} ] }}", records.join(", ")),
            docs: records.len(),
        }
    }

    /// Validate each record as a JSON object and serialize the array.
    ///
    /// # Errors
    /// Returns an error naming the first record (0-based) that is not a JSON object.
    pub fn strict(records: &[String]) -> Result<Self> {
        let docs = records
            .iter()
            .enumerate()
            .map(|(i, record)| parse_doc(i, record))
            .collect::<Result<Vec<_>>>()?;

        let body = serde_json::to_string(&Docs { docs })
            .with_context(|| "Failed to serialize bulk request")?;

        Ok(Self {
            body,
            docs: records.len(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Number of documents in the request
    pub fn docs(&self) -> usize {
        self.docs
    }
}

fn parse_doc(index: usize, record: &str) -> Result<&RawValue> {
    let raw: &RawValue = serde_json::from_str(record)
        .with_context(|| format!("Record {} is not valid JSON", index))?;
    if !raw.get().starts_with('{') {
        eyre::bail!("Record {} is not a JSON object", index);
    }
    Ok(raw)
}
