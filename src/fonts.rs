use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::Font;
use sha2::{Digest, Sha256};

use crate::error_codes::{CodedError, FONT_ASSET_HASH_MISMATCH};

/// Reads a TTF/OTF from disk. When `expected_sha256` is set the file must hash
/// to exactly that value.
pub fn load_font(path: &Path, expected_sha256: Option<&str>) -> Result<Font> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read font file '{}'", path.display()))?;

    if let Some(expected) = expected_sha256 {
        let expected = expected.trim().to_ascii_lowercase();
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(CodedError::input(
                FONT_ASSET_HASH_MISMATCH,
                format!(
                    "{} expected sha256={} actual sha256={}",
                    path.display(),
                    expected,
                    actual
                ),
            )
            .into());
        }
    }

    Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|error| anyhow!("failed to parse font {}: {error}", path.display()))
}

pub fn supports_char(font: &Font, ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\t' | ' ') || font.lookup_glyph_index(ch) != 0
}

/// Characters the font has no glyph for, in order of first appearance.
pub fn unsupported_chars(font: &Font, text: &str) -> Vec<char> {
    let mut missing = Vec::new();
    for ch in text.chars() {
        if !supports_char(font, ch) && !missing.contains(&ch) {
            missing.push(ch);
        }
    }
    missing
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_font, sha256_hex};
    use crate::error_codes::{find_coded_error, FONT_ASSET_HASH_MISMATCH};

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn pinned_hash_mismatch_is_reported_before_parsing() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("fake.ttf");
        fs::write(&path, b"not a font").expect("write fake font");

        let error = load_font(&path, Some("00")).expect_err("hash mismatch should fail");
        let coded = find_coded_error(&error).expect("coded error");
        assert_eq!(coded.code, FONT_ASSET_HASH_MISMATCH);
    }

    #[test]
    fn unparseable_font_fails_with_context() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("fake.ttf");
        fs::write(&path, b"not a font").expect("write fake font");

        let error = load_font(&path, None).expect_err("garbage should not parse");
        assert!(error.to_string().contains("failed to parse font"));
    }

    #[test]
    fn missing_font_reports_path() {
        let error = load_font(std::path::Path::new("/definitely/missing.ttf"), None)
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("missing.ttf"));
    }
}
