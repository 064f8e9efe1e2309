//! Image link normalization.

use std::sync::LazyLock;

use regex::Regex;

/// Shown when a product has no image reference.
pub const FALLBACK_IMAGE: &str =
    "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&fit=crop&q=80&w=800";

const DRIVE_HOST: &str = "drive.google.com";

static DRIVE_FILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\w]{25,}").expect("Invalid regex"));

/// Rewrites a Drive sharing link into its direct thumbnail form. Anything
/// else is returned unchanged; an empty reference maps to [`FALLBACK_IMAGE`].
pub fn normalize_image_link(reference: &str) -> String {
    if reference.is_empty() {
        return FALLBACK_IMAGE.to_string();
    }
    if !reference.contains(DRIVE_HOST) {
        return reference.to_string();
    }
    match DRIVE_FILE_ID.find(reference) {
        Some(id) => format!("https://{DRIVE_HOST}/thumbnail?id={}&sz=s0", id.as_str()),
        None => reference.to_string(),
    }
}
