//! Persisted detection results.
//!
//! A [`DetectionDocument`] is the JSON file exchanged with front-ends: the
//! page → block text array that defines the canonical offset space, the
//! detections in inclusive `(page, block, offset)` form, and optional legacy
//! coordinate caches for documents stored without a layout.
//!
//! Validation happens here, once, when a document is read. Records that do
//! not fit the text are logged and dropped; internal code only ever sees
//! well-formed [`Candidate`]s.

use crate::coords::{LegacyCoordinateMap, ReverseCoordinateMap};
use crate::error::{Error, Result};
use crate::index::{CharacterIndex, OffsetTable};
use crate::span::{Candidate, Origin, TextPosition};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::Path;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// Hex SHA-256 of the source PDF bytes.
pub fn hash_source(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Hex SHA-256 of the source file
    pub source_hash: String,
    /// Number of pages
    pub page_count: usize,
}

/// One detection on the wire, with an inclusive end position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectRecord {
    /// First character
    pub start: TextPosition,
    /// Last character (inclusive)
    pub end: TextPosition,
    /// Entity label
    pub entity: String,
    /// Covered text
    pub word: String,
    /// Provenance
    pub origin: Origin,
}

impl DetectRecord {
    /// Wire form of a candidate, or `None` when it does not fit `offsets`.
    pub fn from_candidate(candidate: &Candidate, offsets: &OffsetTable) -> Option<Self> {
        let (start, end) = offsets.to_inclusive_range(candidate.start, candidate.end)?;
        Some(Self {
            start,
            end,
            entity: candidate.entity_type.clone(),
            word: candidate.text.clone(),
            origin: candidate.origin,
        })
    }

    /// Half-open canonical range, or `None` when the record does not fit.
    pub fn range(&self, offsets: &OffsetTable) -> Option<Range<usize>> {
        offsets.from_inclusive_range(self.start, self.end)
    }

    /// Candidate form of this record.
    pub fn to_candidate(&self, offsets: &OffsetTable) -> Option<Candidate> {
        let range = self.range(offsets)?;
        Some(Candidate::new(range.start, range.end, &self.entity, &self.word, self.origin))
    }
}

/// Persisted detection results for one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Source hash and page count
    pub metadata: DocumentMetadata,
    /// Page → block → text; the canonical chunking input
    pub text: Vec<Vec<String>>,
    /// Detections in document order
    #[serde(default)]
    pub detect: Vec<DetectRecord>,
    /// Legacy offset → box cache
    #[serde(rename = "offset2coordsMap", default, skip_serializing_if = "Option::is_none")]
    pub offset2coords: Option<LegacyCoordinateMap>,
    /// Legacy box → offset cache
    #[serde(rename = "coords2offsetMap", default, skip_serializing_if = "Option::is_none")]
    pub coords2offset: Option<ReverseCoordinateMap>,
}

impl DetectionDocument {
    /// Empty document over `text`.
    pub fn new(text: Vec<Vec<String>>, source_hash: impl Into<String>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            metadata: DocumentMetadata {
                source_hash: source_hash.into(),
                page_count: text.len(),
            },
            text,
            detect: Vec::new(),
            offset2coords: None,
            coords2offset: None,
        }
    }

    /// Document for an indexed PDF, with coordinate caches filled in.
    pub fn from_index(index: &CharacterIndex, source: &[u8]) -> Self {
        let mut doc = Self::new(index.block_texts(), hash_source(source));
        let forward = LegacyCoordinateMap::from_index(index);
        doc.coords2offset = Some(ReverseCoordinateMap::from_forward(&forward));
        doc.offset2coords = Some(forward);
        doc
    }

    /// Parse and validate a document.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: Self = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut doc: Self = serde_json::from_reader(BufReader::new(file))?;
        doc.validate()?;
        log::debug!(
            "Loaded {} with {} detections",
            path.as_ref().display(),
            doc.detect.len()
        );
        Ok(doc)
    }

    /// Write the document to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.version > DOCUMENT_VERSION {
            return Err(Error::InvalidDocument(format!(
                "unsupported version {} (newest known is {})",
                self.version, DOCUMENT_VERSION
            )));
        }
        if self.metadata.page_count != self.text.len() {
            return Err(Error::InvalidDocument(format!(
                "metadata lists {} pages but text has {}",
                self.metadata.page_count,
                self.text.len()
            )));
        }

        let offsets = self.offsets();
        self.detect.retain(|record| {
            let valid = record.range(&offsets).is_some();
            if !valid {
                log::warn!(
                    "Dropping detection '{}' ({}) at {:?}..={:?}: outside the text",
                    record.word,
                    record.entity,
                    record.start,
                    record.end
                );
            }
            valid
        });
        Ok(())
    }

    /// Offset table of the stored text.
    pub fn offsets(&self) -> OffsetTable {
        OffsetTable::from_texts(&self.text)
    }

    /// The canonical text: every block concatenated without separators.
    pub fn canonical_text(&self) -> String {
        self.text.iter().flatten().map(String::as_str).collect()
    }

    /// Stored detections as candidates.
    pub fn candidates(&self) -> Vec<Candidate> {
        let offsets = self.offsets();
        self.detect
            .iter()
            .filter_map(|record| record.to_candidate(&offsets))
            .collect()
    }

    /// Replace the stored detections; candidates outside the text are logged
    /// and skipped.
    pub fn set_detections<'a, I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let offsets = self.offsets();
        self.detect = candidates
            .into_iter()
            .filter_map(|c| {
                let record = DetectRecord::from_candidate(c, &offsets);
                if record.is_none() {
                    log::warn!("Not storing '{}' at [{}, {}): outside the text", c.text, c.start, c.end);
                }
                record
            })
            .collect();
    }
}

/// Overwrite the characters covered by `spans` with `placeholder` in the
/// stored text, and in the words of stored detections that touch them.
///
/// Character counts are unchanged, so canonical offsets stay valid. Returns
/// the number of distinct characters covered; overlapping spans count shared
/// characters once.
pub fn apply_redactions(document: &mut DetectionDocument, spans: &[Candidate], placeholder: char) -> usize {
    let offsets = document.offsets();
    let mut replaced = 0usize;

    for range in merged_ranges(spans) {
        for (page, block, piece) in offsets.split_by_block(range) {
            let Some(text) = document.text.get_mut(page).and_then(|p| p.get_mut(block)) else {
                continue;
            };
            *text = text
                .chars()
                .enumerate()
                .map(|(i, c)| if piece.contains(&i) { placeholder } else { c })
                .collect();
            replaced += piece.len();
        }
    }

    if replaced > 0 {
        let canonical: Vec<char> = document.canonical_text().chars().collect();
        for record in &mut document.detect {
            let Some(range) = record.range(&offsets) else {
                continue;
            };
            if spans.iter().any(|s| s.start < range.end && range.start < s.end) {
                record.word = canonical[range].iter().collect();
            }
        }
    }

    log::debug!("Redacted {} characters in {} spans", replaced, spans.len());
    replaced
}

/// Non-empty span ranges, sorted, with overlapping and touching ranges joined.
fn merged_ranges(spans: &[Candidate]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = spans.iter().filter(|s| !s.is_empty()).map(|s| s.start..s.end).collect();
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DetectionDocument {
        DetectionDocument::new(
            vec![vec!["Call Ann".into(), "at 555".into()], vec!["Bye".into()]],
            hash_source(b"%PDF-1.7"),
        )
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        assert_eq!(
            hash_source(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_record_round_trip_through_offsets() {
        let doc = doc();
        let offsets = doc.offsets();
        let candidate = Candidate::new(5, 11, "PERSON", "Annat ", Origin::Manual);
        let record = DetectRecord::from_candidate(&candidate, &offsets).unwrap();
        assert_eq!(record.start, TextPosition::new(0, 0, 5));
        assert_eq!(record.end, TextPosition::new(0, 1, 2));
        assert_eq!(record.to_candidate(&offsets), Some(candidate));
    }

    #[test]
    fn test_invalid_records_are_dropped_on_load() {
        let json = r#"{
            "metadata": {"source_hash": "x", "page_count": 1},
            "text": [["abc"]],
            "detect": [
                {"start": {"page":0,"block":0,"offset":0}, "end": {"page":0,"block":0,"offset":1}, "entity":"A", "word":"ab", "origin":"auto"},
                {"start": {"page":0,"block":0,"offset":2}, "end": {"page":0,"block":0,"offset":1}, "entity":"B", "word":"", "origin":"auto"},
                {"start": {"page":0,"block":0,"offset":0}, "end": {"page":0,"block":0,"offset":9}, "entity":"C", "word":"", "origin":"custom"}
            ]
        }"#;
        let doc = DetectionDocument::from_json(json).unwrap();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert_eq!(doc.detect.len(), 1);
        assert_eq!(doc.detect[0].entity, "A");
    }

    #[test]
    fn test_page_count_mismatch_is_an_error() {
        let json = r#"{"metadata": {"source_hash": "x", "page_count": 2}, "text": [["abc"]]}"#;
        assert!(matches!(DetectionDocument::from_json(json), Err(Error::InvalidDocument(_))));
        let json = r#"{"version": 99, "metadata": {"source_hash": "x", "page_count": 0}, "text": []}"#;
        assert!(matches!(DetectionDocument::from_json(json), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_legacy_maps_use_wire_names() {
        let mut doc = doc();
        doc.offset2coords = Some(LegacyCoordinateMap::new(vec![vec![vec![None]]]));
        let json = doc.to_json().unwrap();
        assert!(json.contains("\"offset2coordsMap\""));
        assert!(!json.contains("coords2offsetMap"));
    }

    #[test]
    fn test_apply_redactions_across_blocks() {
        let mut doc = doc();
        let span = Candidate::new(5, 10, "PERSON", "Annat", Origin::Auto);
        doc.set_detections([&span]);

        let replaced = apply_redactions(&mut doc, &[span], '*');
        assert_eq!(replaced, 5);
        assert_eq!(doc.text[0], vec!["Call ***".to_string(), "** 555".to_string()]);
        assert_eq!(doc.detect[0].word, "*****");
        assert_eq!(doc.canonical_text().chars().count(), 17);
    }

    #[test]
    fn test_overlapping_redactions_count_each_char_once() {
        let mut doc = doc();
        let name = Candidate::new(5, 8, "PERSON", "Ann", Origin::Auto);
        let wider = Candidate::new(6, 10, "PERSON", "nnat", Origin::Manual);
        let bye = Candidate::new(14, 17, "PERSON", "Bye", Origin::Auto);
        doc.set_detections([&name, &wider]);

        let replaced = apply_redactions(&mut doc, &[wider, name.clone(), name, bye.clone(), bye], '#');
        assert_eq!(replaced, 8);
        assert_eq!(doc.canonical_text(), "Call ##### 555###");
        assert_eq!(doc.detect[0].word, "###");
        assert_eq!(doc.detect[1].word, "####");
    }
}
