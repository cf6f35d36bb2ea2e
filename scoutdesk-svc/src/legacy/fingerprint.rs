//! Resume fingerprints for duplicate detection

use sha2::{Digest, Sha256};
use std::collections::HashSet;

use scoutdesk_common::db::Store;
use scoutdesk_common::Result;

/// Lowercase and drop every whitespace character
pub fn normalize_resume(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// SHA-256 hex of the normalised resume
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(normalize_resume(text).as_bytes());
    format!("{:x}", digest)
}

/// Fingerprints of every stored report text
pub async fn load_known_fingerprints(store: &Store) -> Result<HashSet<String>> {
    let texts: Vec<String> = sqlx::query_scalar("SELECT rapport_tekst FROM rapporten")
        .fetch_all(store.pool())
        .await?;
    Ok(texts.iter().map(|t| fingerprint(t)).collect())
}
