//! Content diffing that emits significant operation records
//!
//! Given old/new content for one file the engine produces zero or more
//! operation descriptors. Small and whitespace-only edits are filtered
//! out; when filtering removes everything, a single full-content edit
//! covering the whole file is emitted instead so a real change is never
//! silently dropped.

use std::path::Path;

use similar::{ChangeTag, TextDiff};

use crate::operation::{
    ChangeCategory, EditMode, Operation, OperationKind, OperationMetadata,
};

/// Minimum length (in bytes) either side of an edit must reach to count
/// as significant
const MIN_SIGNIFICANT_LEN: usize = 3;

/// Confidence assigned to the whole-file fallback edit
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Bytes of neighboring text pulled into a pure insertion or deletion
/// so both sides of the replacement are non-empty needles
const ANCHOR_LEN: usize = 16;

/// One merged run of removed/inserted text at a byte offset in the old
/// content
#[derive(Debug, Clone, PartialEq)]
struct EditCandidate {
    offset: usize,
    removed: String,
    inserted: String,
}

impl EditCandidate {
    fn at(offset: usize) -> Self {
        EditCandidate {
            offset,
            removed: String::new(),
            inserted: String::new(),
        }
    }

    /// Worth recording: large enough on at least one side and not a
    /// pure formatting change
    fn is_significant(&self) -> bool {
        if self.removed.len() < MIN_SIGNIFICANT_LEN && self.inserted.len() < MIN_SIGNIFICANT_LEN {
            return false;
        }
        self.removed.trim() != self.inserted.trim()
    }
}

/// Emits operation records for content transitions of a single file
#[derive(Debug, Clone, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new DiffEngine instance
    pub fn new() -> Self {
        Self
    }

    /// Diff one file's content transition into operation records
    ///
    /// `None` old content means the file appeared; `None` new content
    /// means it was removed. Equal contents produce no records.
    pub fn diff(&self, file: &Path, old: Option<&str>, new: Option<&str>) -> Vec<Operation> {
        match (old, new) {
            (None, None) => Vec::new(),
            (None, Some(new)) => vec![Operation::new(OperationKind::FileCreate {
                file: file.to_path_buf(),
                after: Some(new.to_string()),
            })],
            (Some(old), None) => vec![Operation::new(OperationKind::FileDelete {
                file: file.to_path_buf(),
                before: Some(old.to_string()),
            })],
            (Some(old), new_content @ Some(new)) => {
                if old == new {
                    return Vec::new();
                }
                let significant: Vec<EditCandidate> = Self::edit_candidates(old, new)
                    .into_iter()
                    .filter(EditCandidate::is_significant)
                    .collect();
                if significant.is_empty() {
                    // Whole-file fallback: something changed but no
                    // candidate survived filtering
                    return vec![Operation::new(OperationKind::FileEdit {
                        file: file.to_path_buf(),
                        mode: EditMode::FullContent {
                            before: Some(old.to_string()),
                            after: new_content.map(str::to_string),
                        },
                    })
                    .with_metadata(OperationMetadata {
                        confidence: FALLBACK_CONFIDENCE,
                        category: ChangeCategory::General,
                        context: Vec::new(),
                    })];
                }
                significant
                    .into_iter()
                    .map(|candidate| {
                        // Classify the raw change, then widen it so the
                        // replacement is applicable in both directions
                        let metadata = OperationMetadata {
                            confidence: Self::confidence(&candidate),
                            category: Self::classify(&candidate),
                            context: Vec::new(),
                        };
                        let candidate = Self::anchor(old, candidate);
                        Operation::new(OperationKind::FileEdit {
                            file: file.to_path_buf(),
                            mode: EditMode::StringReplace {
                                line_number: Some(Self::line_number(old, candidate.offset)),
                                old_string: candidate.removed,
                                new_string: candidate.inserted,
                            },
                        })
                        .with_metadata(metadata)
                    })
                    .collect()
            }
        }
    }

    /// Character-level edit script with consecutive non-equal runs merged
    fn edit_candidates(old: &str, new: &str) -> Vec<EditCandidate> {
        let text_diff = TextDiff::from_chars(old, new);

        let mut candidates = Vec::new();
        let mut current: Option<EditCandidate> = None;
        let mut old_offset = 0usize;

        for change in text_diff.iter_all_changes() {
            let value = change.value();
            match change.tag() {
                ChangeTag::Equal => {
                    if let Some(candidate) = current.take() {
                        candidates.push(candidate);
                    }
                    old_offset += value.len();
                }
                ChangeTag::Delete => {
                    current
                        .get_or_insert_with(|| EditCandidate::at(old_offset))
                        .removed
                        .push_str(value);
                    old_offset += value.len();
                }
                ChangeTag::Insert => {
                    current
                        .get_or_insert_with(|| EditCandidate::at(old_offset))
                        .inserted
                        .push_str(value);
                }
            }
        }
        if let Some(candidate) = current {
            candidates.push(candidate);
        }
        candidates
    }

    /// Pull neighboring text into a one-sided candidate
    ///
    /// A pure insertion or deletion leaves one side of the replacement
    /// empty, which cannot be located when the edit is later reversed or
    /// replayed. Prefer text before the edit; at the very start of the
    /// file, use text after it.
    fn anchor(old: &str, mut candidate: EditCandidate) -> EditCandidate {
        if !candidate.removed.is_empty() && !candidate.inserted.is_empty() {
            return candidate;
        }

        let mut start = candidate.offset.saturating_sub(ANCHOR_LEN);
        while !old.is_char_boundary(start) {
            start -= 1;
        }
        let prefix = &old[start..candidate.offset];
        if !prefix.is_empty() {
            candidate.removed = format!("{}{}", prefix, candidate.removed);
            candidate.inserted = format!("{}{}", prefix, candidate.inserted);
            candidate.offset = start;
            return candidate;
        }

        let tail = &old[candidate.offset + candidate.removed.len()..];
        let mut end = tail.len().min(ANCHOR_LEN);
        while !tail.is_char_boundary(end) {
            end -= 1;
        }
        let suffix = &tail[..end];
        if !suffix.is_empty() {
            candidate.removed.push_str(suffix);
            candidate.inserted.push_str(suffix);
        }
        candidate
    }

    /// 1-based line number of a byte offset in the old content
    fn line_number(old: &str, offset: usize) -> usize {
        old[..offset.min(old.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1
    }

    /// Heuristic confidence: grows with edit size, dampened when the
    /// removed/inserted sizes are badly mismatched
    fn confidence(candidate: &EditCandidate) -> f64 {
        let removed = candidate.removed.len();
        let inserted = candidate.inserted.len();
        let total = removed + inserted;
        if total == 0 {
            return FALLBACK_CONFIDENCE;
        }

        let mut score = 0.6 + 0.4 * (total.min(200) as f64 / 200.0);
        let delta = removed.abs_diff(inserted) as f64;
        score -= 0.2 * (delta / total as f64);
        score.clamp(0.1, 1.0)
    }

    /// Coarse category from superficial keyword presence
    fn classify(candidate: &EditCandidate) -> ChangeCategory {
        let text = if candidate.inserted.trim().is_empty() {
            candidate.removed.trim()
        } else {
            candidate.inserted.trim()
        };

        if text.starts_with("//") || text.starts_with("/*") || text.starts_with('#') {
            return ChangeCategory::Comment;
        }
        if text.contains("use ") || text.contains("import ") || text.contains("include ") {
            return ChangeCategory::Import;
        }
        if text.contains("fn ")
            || text.contains("struct ")
            || text.contains("enum ")
            || text.contains("class ")
            || text.contains("def ")
            || text.contains("function ")
        {
            return ChangeCategory::Declaration;
        }
        if text.contains('=') {
            return ChangeCategory::Assignment;
        }
        ChangeCategory::General
    }
}
