//! Legacy asset identifiers (md5ext).
//!
//! An md5ext is the externally visible name of an asset inside a project
//! manifest: a 32-character lowercase hex MD5 digest, a dot, and a data
//! format suffix from a fixed set.

use crate::hash::Md5Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data formats accepted for project assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Png,
    Jpg,
    Svg,
    Mp3,
    Wav,
}

impl DataFormat {
    /// Parse a format suffix. Matched case-insensitively.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" => Ok(Self::Jpg),
            "svg" => Ok(Self::Svg),
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            other => Err(crate::Error::InvalidAssetId(format!(
                "unknown data format: {other}"
            ))),
        }
    }

    /// Get the canonical lowercase suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Svg => "svg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated md5ext identifier.
///
/// The extension keeps the casing the manifest declared it with, so the
/// rendered identifier round-trips byte for byte.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AssetId {
    md5: Md5Hash,
    extension: String,
    format: DataFormat,
}

impl AssetId {
    /// Build from the two fields a manifest entry carries.
    ///
    /// The hex part is intentionally matched case-sensitively: uppercase hex
    /// is rejected even though it would be a legal MD5 representation.
    pub fn from_parts(md5_hex: &str, data_format: &str) -> crate::Result<Self> {
        if md5_hex.len() != 32
            || !md5_hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(crate::Error::InvalidAssetId(format!(
                "invalid md5: {md5_hex}"
            )));
        }
        let md5 = Md5Hash::from_hex(md5_hex)?;
        let format = DataFormat::parse(data_format)?;
        Ok(Self {
            md5,
            extension: data_format.to_string(),
            format,
        })
    }

    /// Parse a rendered md5ext string ("<32 hex>.<format>").
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (md5_hex, extension) = s
            .split_once('.')
            .ok_or_else(|| crate::Error::InvalidAssetId(format!("missing extension: {s}")))?;
        Self::from_parts(md5_hex, extension)
    }

    /// The MD5 digest the identifier declares for the asset's bytes.
    pub fn md5(&self) -> &Md5Hash {
        &self.md5
    }

    /// The extension exactly as declared.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The recognized data format.
    pub fn format(&self) -> DataFormat {
        self.format
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({self})")
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.md5.to_hex(), self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5: &str = "4626b10e05ba7ec6386b1996e44b0a84";

    #[test]
    fn test_parse_roundtrip() {
        let id = AssetId::parse(&format!("{MD5}.svg")).unwrap();
        assert_eq!(id.to_string(), format!("{MD5}.svg"));
        assert_eq!(id.md5().to_hex(), MD5);
        assert_eq!(id.format(), DataFormat::Svg);
    }

    #[test]
    fn test_extension_case_insensitive_but_preserved() {
        let id = AssetId::from_parts(MD5, "PNG").unwrap();
        assert_eq!(id.format(), DataFormat::Png);
        assert_eq!(id.extension(), "PNG");
        assert_eq!(id.to_string(), format!("{MD5}.PNG"));
    }

    #[test]
    fn test_uppercase_md5_rejected() {
        let upper = MD5.to_ascii_uppercase();
        assert!(AssetId::from_parts(&upper, "png").is_err());
    }

    #[test]
    fn test_bad_identifiers_rejected() {
        assert!(AssetId::parse("tooshort.png").is_err());
        assert!(AssetId::parse(&format!("{MD5}.gif")).is_err());
        assert!(AssetId::parse(MD5).is_err());
        assert!(AssetId::from_parts(&format!("{}g", &MD5[..31]), "png").is_err());
    }
}
