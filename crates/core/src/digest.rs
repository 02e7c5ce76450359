//! Random tokens and content digests.
//!
//! Object and job identifiers are 128 random bits drawn from the operating
//! system RNG. No collision check is performed anywhere; callers get the
//! guarantees randomness gives and nothing stronger.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

/// Number of random bytes in a token.
const TOKEN_BYTES: usize = 16;

/// Generate a lowercase hex token from 128 bits of OS randomness.
///
/// # Example
///
/// ```
/// let token = inboxproxy_core::random_token();
/// assert_eq!(token.len(), 32);
/// ```
#[must_use]
pub fn random_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
