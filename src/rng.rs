//! Cryptographic random tokens for temporary file names and backup identifiers.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Draws `len` alphanumeric characters from the operating system's CSPRNG.
///
/// The output alphabet is a subset of `[A-Za-z0-9_-]`, so tokens are safe to
/// embed in file names and backup identifiers without further escaping.
pub fn random_token(len: usize) -> String {
    OsRng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}
