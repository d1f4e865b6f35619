//! Object ids and Git-LFS style pointer files.

use crate::error::ChipviewError;

const SPEC_VERSION: &str = "https://git-lfs.github.com/spec/v1";

/// A sha256 content address: 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Oid(String);

impl Oid {
    /// Parse an oid in `sha256:<hex>` form.
    pub fn parse(raw: &str) -> Result<Self, ChipviewError> {
        let hex = raw
            .strip_prefix("sha256:")
            .ok_or_else(|| ChipviewError::PointerParse {
                message: format!("oid '{raw}' is missing the 'sha256:' prefix"),
            })?;
        Self::from_hex(hex)
    }

    /// Parse a bare 64-character lowercase hex digest.
    pub fn from_hex(hex: &str) -> Result<Self, ChipviewError> {
        if hex.len() != 64 {
            return Err(ChipviewError::PointerParse {
                message: format!("oid hex must be 64 characters, found {}", hex.len()),
            });
        }
        if !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(ChipviewError::PointerParse {
                message: format!("oid '{hex}' contains non-hex characters"),
            });
        }
        Ok(Self(hex.to_string()))
    }

    pub fn hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Lowercase hex encoding of a digest.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// A parsed LFS pointer file: the content address and size of the real blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pointer {
    pub oid: Oid,
    pub size: u64,
}

impl Pointer {
    /// Quick sniff for pointer content, used to decide whether a fetched
    /// body needs a second content-addressed hop.
    pub fn looks_like_pointer(bytes: &[u8]) -> bool {
        bytes.starts_with(b"version https://git-lfs")
    }

    /// Parse the three-line pointer format. Key order is fixed by the LFS
    /// spec (`version`, `oid`, `size`); trailing whitespace is tolerated.
    pub fn parse(text: &str) -> Result<Self, ChipviewError> {
        let mut lines = text.lines().map(str::trim_end);

        let version = lines.next().ok_or_else(|| ChipviewError::PointerParse {
            message: "empty pointer file".to_string(),
        })?;
        let expected_version = format!("version {SPEC_VERSION}");
        if version != expected_version {
            return Err(ChipviewError::PointerParse {
                message: format!("unexpected version line '{version}'"),
            });
        }

        let oid_line = lines.next().ok_or_else(|| ChipviewError::PointerParse {
            message: "pointer is missing the oid line".to_string(),
        })?;
        let oid_raw = oid_line
            .strip_prefix("oid ")
            .ok_or_else(|| ChipviewError::PointerParse {
                message: format!("expected 'oid ...', found '{oid_line}'"),
            })?;
        let oid = Oid::parse(oid_raw)?;

        let size_line = lines.next().ok_or_else(|| ChipviewError::PointerParse {
            message: "pointer is missing the size line".to_string(),
        })?;
        let size_raw = size_line
            .strip_prefix("size ")
            .ok_or_else(|| ChipviewError::PointerParse {
                message: format!("expected 'size ...', found '{size_line}'"),
            })?;
        let size = size_raw
            .parse::<u64>()
            .map_err(|_| ChipviewError::PointerParse {
                message: format!("invalid size '{size_raw}'"),
            })?;

        if lines.any(|line| !line.is_empty()) {
            return Err(ChipviewError::PointerParse {
                message: "unexpected trailing content after size line".to_string(),
            });
        }

        Ok(Self { oid, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HEX: &str = "4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393";

    fn sample_pointer() -> String {
        format!(
            "version https://git-lfs.github.com/spec/v1\noid sha256:{SAMPLE_HEX}\nsize 12345\n"
        )
    }

    #[test]
    fn parse_valid_pointer() {
        let pointer = Pointer::parse(&sample_pointer()).expect("valid pointer");
        assert_eq!(pointer.oid.hex(), SAMPLE_HEX);
        assert_eq!(pointer.size, 12345);
    }

    #[test]
    fn parse_rejects_wrong_version() {
        let text = sample_pointer().replace("/spec/v1", "/spec/v2");
        let err = Pointer::parse(&text).unwrap_err();
        assert!(matches!(err, ChipviewError::PointerParse { .. }));
    }

    #[test]
    fn parse_rejects_bad_oid() {
        let text = sample_pointer().replace(SAMPLE_HEX, "not-hex");
        let err = Pointer::parse(&text).unwrap_err();
        assert!(matches!(err, ChipviewError::PointerParse { .. }));
    }

    #[test]
    fn parse_rejects_trailing_garbage() {
        let text = format!("{}extra line\n", sample_pointer());
        let err = Pointer::parse(&text).unwrap_err();
        assert!(matches!(err, ChipviewError::PointerParse { .. }));
    }

    #[test]
    fn oid_requires_sha256_prefix_and_length() {
        assert!(Oid::parse(&format!("sha256:{SAMPLE_HEX}")).is_ok());
        assert!(Oid::parse(SAMPLE_HEX).is_err());
        assert!(Oid::from_hex("abcd").is_err());
        assert!(Oid::from_hex(&SAMPLE_HEX.to_uppercase()).is_err());
    }

    #[test]
    fn looks_like_pointer_sniffs_prefix() {
        assert!(Pointer::looks_like_pointer(sample_pointer().as_bytes()));
        assert!(!Pointer::looks_like_pointer(b"\x89PNG\r\n"));
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(to_hex(&[0x00, 0xff, 0x0a]), "00ff0a");
    }
}
