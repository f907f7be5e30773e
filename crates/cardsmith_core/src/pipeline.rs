//! crates/cardsmith_core/src/pipeline.rs
//!
//! The export pipeline: optional branding pass over the generated cards,
//! then archiving every image into one in-memory zip. Branding occupies
//! the 0-50 range of the export progress and archiving the 50-100 range.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use tracing::{info, warn};
use zip::write::SimpleFileOptions;

use crate::domain::{BrandKit, GeneratedCard};
use crate::ports::{ImageFetcher, ImageGenerationService, PortError, PortResult};

/// Progress within the branding half of the export (0-50).
fn branding_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 50;
    }
    ((completed * 50) / total) as u8
}

/// Progress within the archiving half of the export (50-100).
fn archive_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (50 + (completed * 50) / total) as u8
}

/// Applies the brand kit to every card in place, sequentially.
///
/// A per-card branding failure is swallowed: the original image is kept
/// and the export continues. The zip step never aborts because branding
/// went wrong.
pub async fn brand_all(
    cards: &mut [GeneratedCard],
    brand: &BrandKit,
    images: &dyn ImageGenerationService,
    on_progress: &mut (dyn FnMut(u8) + Send),
) {
    let total = cards.len();
    for (index, card) in cards.iter_mut().enumerate() {
        if !brand.is_empty() {
            match images.brand_card_image(&card.image_url, brand).await {
                Ok(branded) => card.image_url = branded,
                Err(e) => {
                    warn!(contact = %card.contact.name, error = %e, "branding failed, keeping original image");
                }
            }
        }
        on_progress(branding_progress(index + 1, total));
    }
}

/// Reduces a contact's display name to a filesystem-safe token:
/// alphanumerics kept, spaces and everything else collapsed to `_`,
/// `card` when nothing survives.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }
    let out = out.trim_end_matches('_').to_string();
    if out.is_empty() {
        "card".to_string()
    } else {
        out
    }
}

/// Picks a file extension from a data URI's mime type; remote URLs and
/// unknown types default to png.
fn extension_for(image_url: &str) -> &'static str {
    if image_url.starts_with("data:image/jpeg") || image_url.ends_with(".jpg") {
        "jpg"
    } else if image_url.starts_with("data:image/webp") || image_url.ends_with(".webp") {
        "webp"
    } else {
        "png"
    }
}

/// Fetches every card image and writes all of them into one in-memory
/// zip archive.
///
/// A failed fetch is skipped with a warning and the archive continues;
/// the call errors only when the archive itself cannot be written or
/// every single fetch failed.
pub async fn archive_cards(
    cards: &[GeneratedCard],
    fetcher: &dyn ImageFetcher,
    on_progress: &mut (dyn FnMut(u8) + Send),
) -> PortResult<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut taken_names: HashSet<String> = HashSet::new();
    let total = cards.len();
    let mut archived = 0usize;

    for (index, card) in cards.iter().enumerate() {
        match fetcher.fetch(&card.image_url).await {
            Ok(bytes) => {
                let base = sanitize_filename(&card.contact.name);
                let ext = extension_for(&card.image_url);
                let mut entry_name = format!("{base}.{ext}");
                let mut suffix = 2;
                while !taken_names.insert(entry_name.clone()) {
                    entry_name = format!("{base}_{suffix}.{ext}");
                    suffix += 1;
                }

                writer
                    .start_file(entry_name.as_str(), options)
                    .map_err(|e| PortError::Unexpected(format!("zip write failed: {e}")))?;
                writer
                    .write_all(&bytes)
                    .map_err(|e| PortError::Unexpected(format!("zip write failed: {e}")))?;
                archived += 1;
            }
            Err(e) => {
                warn!(contact = %card.contact.name, error = %e, "image fetch failed, skipping archive entry");
            }
        }
        on_progress(archive_progress(index + 1, total));
    }

    if archived == 0 && total > 0 {
        return Err(PortError::Unexpected(
            "no card image could be fetched for the archive".to_string(),
        ));
    }

    let cursor = writer
        .finish()
        .map_err(|e| PortError::Unexpected(format!("zip finalize failed: {e}")))?;
    info!(entries = archived, skipped = total - archived, "card archive built");
    Ok(cursor.into_inner())
}

/// The full export: brand every card, then archive the results.
pub async fn export_cards(
    cards: &mut [GeneratedCard],
    brand: &BrandKit,
    images: &dyn ImageGenerationService,
    fetcher: &dyn ImageFetcher,
    mut on_progress: impl FnMut(u8) + Send,
) -> PortResult<Vec<u8>> {
    brand_all(cards, brand, images, &mut on_progress).await;
    archive_cards(cards, fetcher, &mut on_progress).await
}

//=========================================================================================
// Tests
//=========================================================================================
