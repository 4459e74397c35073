//! Dump file loading and decoding
//!
//! Object-creation scripts exported from SQL Server tooling are usually
//! UTF-16LE with a BOM, but hand-edited dumps show up as UTF-8 or Windows-1252.
//! The reader sniffs the encoding unless one is forced.

use std::path::Path;

use anyhow::Result;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::SprocScanError;

/// Number of leading bytes inspected when guessing a BOM-less UTF-16 file
const SNIFF_WINDOW: usize = 4096;

/// A fully decoded dump, ready for batch splitting
#[derive(Debug, Clone)]
pub struct SourceText {
    /// Decoded text with any BOM removed
    pub text: String,
    /// Name of the encoding the bytes were decoded with
    pub encoding: &'static str,
    /// Hex SHA-256 of the decoded text
    pub sha256: String,
}

/// Requested input encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEncoding {
    /// Detect from BOM / byte distribution, falling back to UTF-8 then Windows-1252
    #[default]
    Auto,
    /// Force a specific encoding
    Forced(&'static Encoding),
}

impl std::str::FromStr for InputEncoding {
    type Err = SprocScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(InputEncoding::Auto);
        }
        Encoding::for_label(s.as_bytes())
            .map(InputEncoding::Forced)
            .ok_or_else(|| SprocScanError::UnknownEncoding {
                label: s.to_string(),
            })
    }
}

/// Read and decode the dump at `path`
pub fn read_source(path: &Path, encoding: InputEncoding) -> Result<SourceText> {
    let bytes = std::fs::read(path).map_err(|e| SprocScanError::InputReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "Loaded input dump");

    let (text, used) = decode_bytes(&bytes, encoding).ok_or_else(|| {
        SprocScanError::InputDecodeError {
            path: path.to_path_buf(),
            encoding: match encoding {
                InputEncoding::Auto => "auto".to_string(),
                InputEncoding::Forced(enc) => enc.name().to_string(),
            },
        }
    })?;
    // Raw bytes are released here; only the decoded text stays resident.
    drop(bytes);

    let sha256 = hex::encode(Sha256::digest(text.as_bytes()));
    debug!(encoding = used.name(), chars = text.len(), "Decoded input dump");

    Ok(SourceText {
        text,
        encoding: used.name(),
        sha256,
    })
}

/// Decode raw bytes according to `encoding`, returning the text and the encoding used.
///
/// Returns `None` when the bytes are not valid in the chosen (or every candidate) encoding.
pub fn decode_bytes(bytes: &[u8], encoding: InputEncoding) -> Option<(String, &'static Encoding)> {
    match encoding {
        InputEncoding::Forced(enc) => {
            let body = match Encoding::for_bom(bytes) {
                Some((bom_enc, bom_len)) if bom_enc == enc => &bytes[bom_len..],
                _ => bytes,
            };
            decode_strict(body, enc).map(|text| (text, enc))
        }
        InputEncoding::Auto => {
            if let Some((enc, bom_len)) = Encoding::for_bom(bytes) {
                return decode_strict(&bytes[bom_len..], enc).map(|text| (text, enc));
            }
            if let Some(enc) = sniff_utf16(bytes) {
                return decode_strict(bytes, enc).map(|text| (text, enc));
            }
            // Try UTF-8 first, then Windows-1252 (common for scripts saved on Windows)
            match std::str::from_utf8(bytes) {
                Ok(s) => Some((s.to_string(), UTF_8)),
                Err(_) => decode_strict(bytes, WINDOWS_1252).map(|text| (text, WINDOWS_1252)),
            }
        }
    }
}

fn decode_strict(bytes: &[u8], enc: &'static Encoding) -> Option<String> {
    let (decoded, had_errors) = enc.decode_without_bom_handling(bytes);
    if had_errors {
        None
    } else {
        Some(decoded.into_owned())
    }
}

/// Guess UTF-16 without a BOM: mostly-ASCII UTF-16 text has NUL in every other byte.
fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    if window.len() < 4 {
        return None;
    }
    let pairs = window.len() / 2;
    let (mut even_nuls, mut odd_nuls) = (0usize, 0usize);
    for pair in window.chunks_exact(2) {
        if pair[0] == 0 {
            even_nuls += 1;
        }
        if pair[1] == 0 {
            odd_nuls += 1;
        }
    }

    if odd_nuls * 10 >= pairs * 9 && even_nuls * 10 < pairs {
        Some(UTF_16LE)
    } else if even_nuls * 10 >= pairs * 9 && odd_nuls * 10 < pairs {
        Some(UTF_16BE)
    } else {
        None
    }
}
