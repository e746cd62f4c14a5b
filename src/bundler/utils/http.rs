//! HTTP utilities for downloading runtime binaries.
//!
//! Provides download with SHA-256 verification against published checksum lists.

use crate::bundler::error::{Error, Result};

/// Downloads a file from a URL.
///
/// Returns the file contents as a byte vector. Non-success status codes are errors.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading {}", url);

    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    Ok(bytes.to_vec())
}

/// Downloads a text file such as a checksum list.
pub async fn download_text(url: &str) -> Result<String> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Downloads a file and verifies its SHA-256 hash.
///
/// Returns the file contents if the hash matches, otherwise returns an error.
pub async fn download_and_verify(url: &str, expected_hash: &str) -> Result<Vec<u8>> {
    let data = download(url).await?;
    log::info!("validating hash");
    verify_hash(&data, expected_hash).await?;
    Ok(data)
}

/// Verifies that data matches the expected SHA-256 hash.
///
/// Compares the hash case-insensitively.
/// Uses spawn_blocking to prevent blocking the async runtime during CPU-bound hashing.
pub async fn verify_hash(data: &[u8], expected_hash: &str) -> Result<()> {
    use sha2::Digest as _;

    let data = data.to_vec();
    let expected_hash = expected_hash.to_string();

    tokio::task::spawn_blocking(move || {
        let mut hasher = sha2::Sha256::new();
        hasher.update(&data);
        let actual_hash = hex::encode(hasher.finalize());

        if actual_hash.eq_ignore_ascii_case(&expected_hash) {
            Ok(())
        } else {
            Err(Error::HashMismatch {
                expected: expected_hash,
                actual: actual_hash,
            })
        }
    })
    .await
    .map_err(|e| Error::GenericError(format!("Hash verification task failed: {}", e)))?
}

/// Looks up the hash of `file_name` in a `SHASUMS256.txt` style listing.
///
/// Each line is `<hex digest>  <file name>`.
pub fn find_checksum<'a>(listing: &'a str, file_name: &str) -> Option<&'a str> {
    listing.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?;
        (name == file_name).then_some(digest)
    })
}
