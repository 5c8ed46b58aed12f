use std::{
    borrow::Cow,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::warn;

use crate::error::{IoError, SentimentResult};

// ================================================================================================
// Text Encodings
// ================================================================================================

/// Candidate encodings for the raw input file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum TextEncoding {
    #[strum(serialize = "utf-8")]
    Utf8,
    #[strum(serialize = "latin-1")]
    Latin1,
    #[strum(serialize = "iso-8859-1")]
    Iso8859_1,
    #[strum(serialize = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    /// The default probing order for raw input files.
    pub fn default_candidates() -> Vec<TextEncoding> {
        vec![
            Self::Utf8,
            Self::Latin1,
            Self::Iso8859_1,
            Self::Windows1252,
        ]
    }

    /// Strictly decodes `bytes`, returning `None` if any byte is invalid for this encoding.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Self::Latin1 | Self::Iso8859_1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Windows1252 => decode_cp1252(bytes),
        }
    }
}

/// Bytes with no Windows-1252 assignment; `encoding_rs` passes them through as C1 controls.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        return None;
    }
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

// ================================================================================================
// Decoding With Fallback
// ================================================================================================

/// How the raw bytes were turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeOutcome {
    /// Decoded cleanly with the given candidate.
    Strict(TextEncoding),
    /// Every candidate failed; invalid byte runs were replaced with U+FFFD.
    Lossy,
}

impl std::fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict(enc) => write!(f, "{enc}"),
            Self::Lossy => write!(f, "utf-8 (lossy)"),
        }
    }
}

/// A run of invalid bytes replaced during lossy decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteAlteration {
    /// Offset of the first replaced byte in the input file.
    pub offset: usize,
    /// 1-based line of the input file containing the run.
    pub line: usize,
    /// The replaced bytes.
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub outcome: DecodeOutcome,
    pub alterations: Vec<ByteAlteration>,
}

/// Decodes `bytes` with the first candidate that succeeds, or lossily as UTF-8.
///
/// A leading UTF-8 byte order mark is stripped before probing.
pub fn decode_with_fallback(bytes: &[u8], candidates: &[TextEncoding]) -> DecodedText {
    let (bom_len, body) = match bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()) {
        Some(rest) => (3, rest),
        None => (0, bytes),
    };

    if let Some((enc, text)) = candidates
        .iter()
        .find_map(|enc| enc.decode(body).map(|text| (*enc, text)))
    {
        return DecodedText {
            text,
            outcome: DecodeOutcome::Strict(enc),
            alterations: Vec::new(),
        };
    }

    let (text, mut alterations) = decode_utf8_lossy(body);
    for alt in &mut alterations {
        alt.offset += bom_len;
        warn!(
            offset = alt.offset,
            line = alt.line,
            bytes = ?alt.bytes,
            "Replaced undecodable bytes with U+FFFD"
        );
    }

    DecodedText {
        text,
        outcome: DecodeOutcome::Lossy,
        alterations,
    }
}

fn decode_utf8_lossy(bytes: &[u8]) -> (String, Vec<ByteAlteration>) {
    let mut text = String::with_capacity(bytes.len());
    let mut alterations = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < bytes.len() {
        match std::str::from_utf8(&bytes[pos..]) {
            Ok(valid) => {
                text.push_str(valid);
                break;
            }
            Err(e) => {
                let valid_end = pos + e.valid_up_to();
                // `valid_up_to` guarantees this prefix is valid UTF-8.
                let valid = std::str::from_utf8(&bytes[pos..valid_end]).unwrap_or_default();
                line += valid.matches('\n').count();
                text.push_str(valid);

                let bad_len = e.error_len().unwrap_or(bytes.len() - valid_end);
                let bad_end = valid_end + bad_len;
                alterations.push(ByteAlteration {
                    offset: valid_end,
                    line,
                    bytes: bytes[valid_end..bad_end].to_vec(),
                });
                text.push(char::REPLACEMENT_CHARACTER);
                pos = bad_end;
            }
        }
    }

    (text, alterations)
}

// ================================================================================================
// Local Writers
// ================================================================================================

/// Creates the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> SentimentResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir_all(dir).map_err(|e| {
                IoError::FileSystem(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Opens `path` for writing, truncating any previous content.
pub(crate) fn create_writer(path: &Path) -> SentimentResult<BufWriter<File>> {
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| {
        IoError::WriteFailed(format!("Failed to create {}: {}", path.display(), e))
    })?;
    Ok(BufWriter::new(file))
}

/// Creates `dir` (and its parents) if it does not exist yet.
pub(crate) fn ensure_dir(dir: &Path) -> SentimentResult<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            IoError::FileSystem(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;
    }
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_is_tried_first() {
        let decoded = decode_with_fallback("Date,Label\nZürich".as_bytes(), &TextEncoding::default_candidates());
        assert_eq!(decoded.outcome, DecodeOutcome::Strict(TextEncoding::Utf8));
        assert!(decoded.text.contains("Zürich"));
        assert!(decoded.alterations.is_empty());
    }

    #[test]
    fn test_latin1_fallback_maps_bytes_to_code_points() {
        // 0xFC is 'ü' in Latin-1 and an invalid lone byte in UTF-8.
        let bytes = b"Z\xFCrich";
        let decoded = decode_with_fallback(bytes, &TextEncoding::default_candidates());
        assert_eq!(decoded.outcome, DecodeOutcome::Strict(TextEncoding::Latin1));
        assert_eq!(decoded.text, "Zürich");
    }

    #[test]
    fn test_cp1252_rejects_undefined_bytes() {
        assert_eq!(TextEncoding::Windows1252.decode(b"\x93quoted\x94").as_deref(), Some("\u{201C}quoted\u{201D}"));
        assert_eq!(TextEncoding::Windows1252.decode(b"\x80 \xE9").as_deref(), Some("\u{20AC} \u{E9}"));
        for byte in CP1252_UNDEFINED {
            assert!(TextEncoding::Windows1252.decode(&[b'a', byte]).is_none());
        }
    }

    #[test]
    fn test_lossy_decode_records_alterations() {
        let bytes = b"Date,Label\n2020-01-01,1\n2020-01-02,\xFF0\n";
        let decoded = decode_with_fallback(bytes, &[TextEncoding::Utf8]);

        assert_eq!(decoded.outcome, DecodeOutcome::Lossy);
        assert_eq!(
            decoded.alterations,
            vec![ByteAlteration {
                offset: 35,
                line: 3,
                bytes: vec![0xFF],
            }]
        );
        assert!(decoded.text.contains("2020-01-02,\u{FFFD}0"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let decoded = decode_with_fallback(b"\xEF\xBB\xBFDate", &TextEncoding::default_candidates());
        assert_eq!(decoded.text, "Date");
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(TextEncoding::Windows1252.to_string(), "cp1252");
        assert_eq!(
            "latin-1".parse::<TextEncoding>().expect("failed to parse encoding"),
            TextEncoding::Latin1
        );
    }
}
