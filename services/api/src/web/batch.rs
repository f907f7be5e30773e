//! services/api/src/web/batch.rs
//!
//! The server-side batch endpoint: upload a CSV plus a column mapping and
//! a template id, get back a zip of personalized cards. Branding is
//! applied when a brand kit part is supplied.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use cardsmith_core::{
    batch::run_batch,
    csv_import::{parse_contacts, ColumnMapping},
    domain::BrandKit,
    pipeline::export_cards,
    templates::find_template,
};
use tracing::{debug, error};

use crate::web::protocol::{reject, Rejection};
use crate::web::state::AppState;

/// POST /api/batch - Generate cards for a whole contact list and export them
///
/// Accepts multipart/form-data with parts `file` (the CSV), `mapping`
/// (a JSON column mapping), `template` (a catalog id) and optionally
/// `brand` (a JSON brand kit). Responds with a zip archive.
#[utoipa::path(
    post,
    path = "/api/batch",
    request_body(content_type = "multipart/form-data", description = "CSV file, column mapping, template id and optional brand kit."),
    responses(
        (status = 200, description = "Zip archive of generated cards", content_type = "application/zip"),
        (status = 400, description = "Bad CSV, mapping or template"),
        (status = 500, description = "Generation or archiving failed")
    )
)]
pub async fn batch_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, Rejection> {
    // 1. Collect the multipart parts.
    let mut csv_text: Option<String> = None;
    let mut mapping: Option<ColumnMapping> = None;
    let mut template_id: Option<String> = None;
    let mut brand = BrandKit::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(
            StatusCode::BAD_REQUEST,
            format!("Could not read the upload: {e}"),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        let text = field.text().await.map_err(|e| {
            reject(
                StatusCode::BAD_REQUEST,
                format!("Could not read part '{name}': {e}"),
            )
        })?;
        match name.as_str() {
            "file" => csv_text = Some(text),
            "mapping" => {
                mapping = Some(serde_json::from_str(&text).map_err(|_| {
                    reject(StatusCode::BAD_REQUEST, "The column mapping is malformed.")
                })?)
            }
            "template" => template_id = Some(text),
            "brand" => {
                brand = serde_json::from_str(&text).map_err(|_| {
                    reject(StatusCode::BAD_REQUEST, "The brand kit is malformed.")
                })?
            }
            _ => {}
        }
    }

    let csv_text =
        csv_text.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "A CSV file is required."))?;
    let mapping =
        mapping.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "A column mapping is required."))?;
    let template_id = template_id
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "A template id is required."))?;
    let template = find_template(&template_id)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Unknown template."))?;

    // 2. Import the contacts.
    let contacts = parse_contacts(&csv_text, &mapping)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;

    // 3. Run the batch, then brand and archive whatever succeeded.
    let mut outcome = run_batch(contacts, template, &*state.images, None, |percent| {
        debug!(percent, "batch generation progress");
    })
    .await
    .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;

    if outcome.cards.is_empty() {
        error!(failures = outcome.failures.len(), "batch produced no cards");
        return Err(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No card could be generated for this list.",
        ));
    }

    let archive = export_cards(
        &mut outcome.cards,
        &brand,
        &*state.images,
        &*state.fetcher,
        |percent| debug!(percent, "batch export progress"),
    )
    .await
    .map_err(|e| {
        error!("batch export failed: {:?}", e);
        reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "The card archive could not be built.",
        )
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"cards.zip\"",
            ),
        ],
        archive,
    ))
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testutil::{post_multipart, test_router, MockLedger};
    use http_body_util::BodyExt;
    use std::io::Cursor;

    fn csv_parts(csv: &str) -> Vec<(&'static str, String)> {
        vec![
            ("file", csv.to_string()),
            (
                "mapping",
                serde_json::json!({
                    "name": "Full Name",
                    "email": "Email",
                    "prompt": "Hobby"
                })
                .to_string(),
            ),
            ("template", "birthday-classic".to_string()),
        ]
    }

    #[tokio::test]
    async fn uploads_a_csv_and_downloads_a_zip() {
        let app = test_router(MockLedger::empty());
        let csv = "Full Name,Email,Hobby\nAnn Lee,ann@x.com,painting\nBob,bob@x.com,\n";

        let response = post_multipart(&app, "/api/batch", csv_parts(csv)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/zip"
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["Ann_Lee.png", "Bob.png"]);
    }

    #[tokio::test]
    async fn rows_without_required_fields_are_rejected_as_a_whole_when_none_survive() {
        let app = test_router(MockLedger::empty());
        let csv = "Full Name,Email,Hobby\n,missing@x.com,\n";

        let response = post_multipart(&app, "/api/batch", csv_parts(csv)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_template_is_400() {
        let app = test_router(MockLedger::empty());
        let mut parts = csv_parts("Full Name,Email,Hobby\nAnn,ann@x.com,\n");
        parts[2].1 = "no-such-theme".to_string();

        let response = post_multipart(&app, "/api/batch", parts).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
