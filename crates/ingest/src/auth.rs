use std::fmt::Write;

use sha2::{Digest, Sha256};
use tokenboard_core::{Principal, normalize_handle};
use tokenboard_db::Db;

use crate::types::{AuthError, IngestError};

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{:02x}", byte);
    }
    out
}

/// One-way hash of a bearer secret. Registration and verification must run
/// the identical transform; changing it invalidates every issued secret.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex_digest(&hasher.finalize())
}

/// Resolves a bearer secret to its principal. When the report also carries
/// a claimed handle, the resolved principal must match it (case- and
/// `@`-insensitive); a valid secret presented under someone else's handle
/// is rejected.
pub fn verify(
    db: &Db,
    secret: Option<&str>,
    claimed_handle: Option<&str>,
) -> Result<Principal, IngestError> {
    let secret = match secret {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingCredential.into()),
    };
    let principal = db
        .find_principal_by_secret_hash(&hash_secret(secret))?
        .ok_or(AuthError::UnknownPrincipal)?;
    if let Some(claimed) = claimed_handle {
        if claimed.trim().is_empty() {
            return Err(AuthError::MissingCredential.into());
        }
        if normalize_handle(claimed) != normalize_handle(&principal.handle) {
            tracing::warn!(handle = %principal.handle, "secret presented under mismatched handle");
            return Err(AuthError::HandleMismatch.into());
        }
    }
    Ok(principal)
}
