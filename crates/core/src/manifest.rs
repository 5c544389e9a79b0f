//! Project manifest parsing and validation.
//!
//! A submitted manifest is a JSON document with a list of targets, each
//! carrying `costumes` and `sounds` arrays whose entries name an asset by
//! `assetId` (MD5 hex) and `dataFormat`. Parsing is all-or-nothing: any
//! malformed element fails the whole manifest and nothing is persisted.

use crate::asset_id::AssetId;
use serde::Deserialize;
use std::collections::HashSet;

/// Raw document shape. Decoding stops here; identifier validation is a
/// separate pass over the decoded entries.
#[derive(Debug, Deserialize)]
struct RawProject {
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    costumes: Vec<RawAssetEntry>,
    sounds: Vec<RawAssetEntry>,
}

#[derive(Debug, Deserialize)]
struct RawAssetEntry {
    #[serde(rename = "assetId")]
    asset_id: String,
    #[serde(rename = "dataFormat")]
    data_format: String,
}

/// The validated outcome of parsing a submitted manifest.
#[derive(Clone, Debug)]
pub struct ParsedManifest {
    /// Referenced md5exts in first-appearance order, deduplicated.
    pub md5exts: Vec<AssetId>,
}

/// Extract the set of asset references from raw manifest bytes.
pub fn parse_manifest(data: &[u8]) -> crate::Result<ParsedManifest> {
    let raw: RawProject =
        serde_json::from_slice(data).map_err(|e| crate::Error::InvalidManifest(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut md5exts = Vec::new();
    for target in &raw.targets {
        for entry in target.costumes.iter().chain(target.sounds.iter()) {
            let id = AssetId::from_parts(&entry.asset_id, &entry.data_format)
                .map_err(|e| crate::Error::InvalidManifest(e.to_string()))?;
            if seen.insert(id.to_string()) {
                md5exts.push(id);
            }
        }
    }

    Ok(ParsedManifest { md5exts })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_A: &str = "4626b10e05ba7ec6386b1996e44b0a84";
    const MD5_B: &str = "cd21514d0531fdffb22204e0ec5ed84a";

    fn entry(md5: &str, format: &str) -> String {
        format!(r#"{{"assetId":"{md5}","dataFormat":"{format}"}}"#)
    }

    fn manifest(costumes: &[String], sounds: &[String]) -> Vec<u8> {
        format!(
            r#"{{"targets":[{{"costumes":[{}],"sounds":[{}]}}]}}"#,
            costumes.join(","),
            sounds.join(",")
        )
        .into_bytes()
    }

    #[test]
    fn test_duplicate_reference_yields_one_identifier() {
        let data = manifest(
            &[entry(MD5_A, "svg"), entry(MD5_A, "svg")],
            &[entry(MD5_A, "svg")],
        );
        let parsed = parse_manifest(&data).unwrap();
        assert_eq!(parsed.md5exts.len(), 1);
        assert_eq!(parsed.md5exts[0].to_string(), format!("{MD5_A}.svg"));
    }

    #[test]
    fn test_order_follows_first_appearance() {
        let data = manifest(&[entry(MD5_B, "png")], &[entry(MD5_A, "wav")]);
        let parsed = parse_manifest(&data).unwrap();
        let rendered: Vec<String> = parsed.md5exts.iter().map(|id| id.to_string()).collect();
        assert_eq!(rendered, vec![format!("{MD5_B}.png"), format!("{MD5_A}.wav")]);
    }

    #[test]
    fn test_same_md5_different_format_is_distinct() {
        let data = manifest(&[entry(MD5_A, "png"), entry(MD5_A, "svg")], &[]);
        let parsed = parse_manifest(&data).unwrap();
        assert_eq!(parsed.md5exts.len(), 2);
    }

    #[test]
    fn test_not_an_object() {
        assert!(parse_manifest(b"[]").is_err());
        assert!(parse_manifest(b"not json at all").is_err());
    }

    #[test]
    fn test_targets_must_be_a_list() {
        assert!(parse_manifest(br#"{"targets":{}}"#).is_err());
        assert!(parse_manifest(br#"{}"#).is_err());
    }

    #[test]
    fn test_costumes_and_sounds_must_be_lists() {
        assert!(parse_manifest(br#"{"targets":[{"costumes":{},"sounds":[]}]}"#).is_err());
        assert!(parse_manifest(br#"{"targets":[{"costumes":[]}]}"#).is_err());
    }

    #[test]
    fn test_malformed_entry_fails_whole_parse() {
        let data = manifest(&[entry(MD5_A, "svg"), entry("nothex", "png")], &[]);
        assert!(parse_manifest(&data).is_err());

        let data = manifest(&[entry(MD5_A, "gif")], &[]);
        assert!(parse_manifest(&data).is_err());

        assert!(parse_manifest(br#"{"targets":[{"costumes":[42],"sounds":[]}]}"#).is_err());
    }

    #[test]
    fn test_empty_targets_is_valid() {
        let parsed = parse_manifest(br#"{"targets":[]}"#).unwrap();
        assert!(parsed.md5exts.is_empty());
    }
}
