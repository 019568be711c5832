//! PKCE S256 verifier and challenge generation
//!
//! Implements the Proof Key for Code Exchange extension (RFC 7636) with the
//! `S256` method. The challenge travels on the authorization request and the
//! verifier on the token request, which binds the code to this process.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use base64::Engine as _;
use rand::rngs::OsRng;
use rand::TryRngCore as _;
use sha2::{Digest, Sha256};

use crate::error::{ExporterError, Result};

/// Number of random bytes behind each verifier.
const VERIFIER_BYTES: usize = 32;

/// The only challenge method this module produces.
pub const CHALLENGE_METHOD: &str = "S256";

/// A PKCE verifier together with its derived challenge.
///
/// # Examples
///
/// ```
/// use instanton_exporter::auth::pkce::{generate, derive_challenge};
///
/// let pkce = generate().unwrap();
/// assert_eq!(pkce.verifier.len(), 43);
/// assert_eq!(pkce.challenge, derive_challenge(&pkce.verifier));
/// ```
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// base64url (no padding) encoding of 32 random bytes; 43 characters.
    pub verifier: String,

    /// base64url (no padding) SHA-256 digest of [`Self::verifier`].
    pub challenge: String,

    /// Always [`CHALLENGE_METHOD`].
    pub method: &'static str,
}

/// Generates a fresh PKCE pair from the operating system's CSPRNG.
///
/// # Errors
///
/// Returns [`ExporterError::Entropy`] if the OS random source fails. This is
/// fatal for the authentication attempt and is not retried.
pub fn generate() -> Result<PkcePair> {
    let mut random_bytes = [0u8; VERIFIER_BYTES];
    OsRng
        .try_fill_bytes(&mut random_bytes)
        .map_err(|e| ExporterError::Entropy(format!("OS random source failed: {e}")))?;

    let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes);
    let challenge = derive_challenge(&verifier);

    Ok(PkcePair {
        verifier,
        challenge,
        method: CHALLENGE_METHOD,
    })
}

/// Computes the `S256` challenge for a verifier:
/// `BASE64URL(SHA256(ASCII(verifier)))` without padding.
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}
