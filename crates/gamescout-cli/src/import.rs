//! `import` handler: loads a companies document export into Postgres.
//!
//! Accepts either a JSON array of company documents or one document per line
//! (the usual `mongoexport` output). Only the fields used downstream are read;
//! everything else in a document is ignored.

use std::path::Path;

use anyhow::Context;
use gamescout_core::{GeoPoint, ValidationError};
use gamescout_db::NewOffice;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CompanyDoc {
    pub name: String,
    #[serde(default)]
    pub tag_list: Option<String>,
    #[serde(default)]
    pub offices: Vec<OfficeDoc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OfficeDoc {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Parse an export as a JSON array, or as JSON lines when it does not start
/// with `[`. Blank lines are ignored.
pub(crate) fn parse_companies(text: &str) -> anyhow::Result<Vec<CompanyDoc>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("failed to parse companies JSON array");
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("failed to parse company document on line {}", i + 1))
        })
        .collect()
}

/// Offices of one company that carry coordinates.
///
/// Offices missing either coordinate are dropped; present but out-of-range
/// coordinates fail with the company named.
pub(crate) fn office_inputs(doc: &CompanyDoc) -> Result<Vec<NewOffice>, ValidationError> {
    let mut offices = Vec::with_capacity(doc.offices.len());
    for office in &doc.offices {
        let Some(point) = GeoPoint::from_record(office.latitude, office.longitude, &doc.name)?
        else {
            continue;
        };
        offices.push(NewOffice {
            city: office.city.as_deref().unwrap_or_default().trim().to_string(),
            street: office
                .address1
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            point,
        });
    }
    Ok(offices)
}

/// Import every company in the export at `path`.
///
/// All documents are parsed and validated before anything is written, so a
/// bad coordinate aborts the import without a partial load.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a coordinate is out
/// of range, or a database write fails.
pub(crate) async fn run_import(pool: &sqlx::PgPool, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let docs = parse_companies(&text)?;

    let mut prepared = Vec::with_capacity(docs.len());
    let mut dropped = 0usize;
    for doc in &docs {
        if doc.name.trim().is_empty() {
            tracing::warn!("skipping company document without a name");
            continue;
        }
        let offices = office_inputs(doc)?;
        dropped += doc.offices.len() - offices.len();
        prepared.push((doc, offices));
    }

    let mut office_total = 0u64;
    for (doc, offices) in &prepared {
        let company_id =
            gamescout_db::upsert_company(pool, doc.name.trim(), doc.tag_list.as_deref()).await?;
        office_total += gamescout_db::replace_offices(pool, company_id, offices).await?;
    }

    tracing::info!(
        companies = prepared.len(),
        offices = office_total,
        dropped_offices = dropped,
        "import complete"
    );
    println!(
        "imported {} companies, {office_total} offices ({dropped} without coordinates dropped)",
        prepared.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[
        {
            "_id": { "$oid": "52cdef7c4bab8bd675297d8a" },
            "name": "Zynga",
            "tag_list": "social-gaming, games",
            "offices": [
                { "city": "San Francisco", "address1": "699 8th St", "latitude": 37.7749, "longitude": -122.4194 },
                { "city": "Austin", "address1": "", "latitude": null, "longitude": null }
            ]
        },
        { "name": "Acme", "offices": [] }
    ]"#;

    #[test]
    fn parses_json_array_and_ignores_unknown_fields() {
        let docs = parse_companies(ARRAY).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "Zynga");
        assert_eq!(docs[0].offices.len(), 2);
        assert!(docs[1].tag_list.is_none());
    }

    #[test]
    fn parses_json_lines_skipping_blank_lines() {
        let text = "{\"name\":\"A\",\"tag_list\":\"gaming\"}\n\n{\"name\":\"B\"}\n";
        let docs = parse_companies(text).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn json_lines_error_names_the_line() {
        let err = parse_companies("{\"name\":\"A\"}\nnot json\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "got: {err:#}");
    }

    #[test]
    fn office_inputs_drop_missing_coordinates_and_blank_street() {
        let docs = parse_companies(ARRAY).unwrap();
        let offices = office_inputs(&docs[0]).unwrap();
        assert_eq!(offices.len(), 1);
        assert_eq!(offices[0].city, "San Francisco");
        assert_eq!(offices[0].street.as_deref(), Some("699 8th St"));
    }

    #[test]
    fn office_inputs_reject_out_of_range_coordinates() {
        let doc: CompanyDoc = serde_json::from_str(
            r#"{ "name": "Broken Co", "offices": [{ "city": "X", "latitude": 91.0, "longitude": 0.0 }] }"#,
        )
        .unwrap();
        let err = office_inputs(&doc).unwrap_err();
        assert!(
            matches!(err, ValidationError::Record { ref label, .. } if label == "Broken Co"),
            "got {err:?}"
        );
    }
}
