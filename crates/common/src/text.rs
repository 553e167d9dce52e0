use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: u8 = 0x1f;

/// Stable, non-negative numeric id derived from the key fields.
///
/// Identical inputs always produce the same id across processes and builds.
/// Distinct records that share every key field collide; the id is a derived
/// key, not a uniqueness guarantee.
pub fn content_id(parts: &[&str]) -> i64 {
    let digest = digest(parts);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) & (i64::MAX as u64)) as i64
}

/// SHA-256 over the key fields, each followed by a unit separator so that
/// `("ab", "c")` and `("a", "bc")` hash differently.
fn digest(parts: &[&str]) -> sha2::digest::Output<Sha256> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([FIELD_SEPARATOR]);
    }
    hasher.finalize()
}

/// `pull_request` / `pull-request` / `pull request` -> `PullRequest`.
pub fn pascal_case(input: &str) -> String {
    input
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
