//! Short URL generation for newly created videos.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

use crate::constants::SHORT_URL_LENGTH;

/// Generate a URL-safe short identifier from a random UUID.
///
/// The UUID bytes are base64 encoded, `/` and `+` are swapped for `_` and `-`,
/// and the first ten characters are kept.
pub fn generate_short_url() -> String {
    let encoded = STANDARD.encode(Uuid::new_v4().as_bytes());
    encoded
        .chars()
        .map(|c| match c {
            '/' => '_',
            '+' => '-',
            other => other,
        })
        .take(SHORT_URL_LENGTH)
        .collect()
}
