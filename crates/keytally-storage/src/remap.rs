//! Raw→logical button map file.
//!
//! Keypads are wired by hand, so the physical scan order of the buttons
//! rarely matches their labels. Calibration writes a small text file that
//! maps each raw button number to the logical one:
//!
//! ```text
//! # Keypad button mapping
//! # Format: raw_button:logical_button
//!
//! 1:3
//! 2:2
//! 3:1
//! ```
//!
//! The firmware normally applies this map itself. When it does not, the
//! host applies it to incoming events with [`ButtonRemap::apply`].

use crate::error::{StorageError, StorageResult};
use keytally_core::ButtonId;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

/// How strictly duplicate entries are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// A raw button may appear only once.
    #[default]
    RawOnly,

    /// Raw and logical buttons may each appear only once.
    RawAndLogical,
}

/// Mapping from raw to logical button numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonRemap {
    map: BTreeMap<ButtonId, ButtonId>,
}

impl ButtonRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text of a map file.
    ///
    /// `#` starts a comment; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns a parse error naming the line for a missing `:`, a value
    /// outside 1-9, or a duplicate forbidden by `policy`.
    ///
    /// # Example
    ///
    /// ```
    /// use keytally_storage::remap::{ButtonRemap, DuplicatePolicy};
    /// use keytally_core::ButtonId;
    ///
    /// let remap = ButtonRemap::parse("# swapped\n1:3\n3:1\n", DuplicatePolicy::RawOnly).unwrap();
    /// let one = ButtonId::new(1).unwrap();
    /// let two = ButtonId::new(2).unwrap();
    /// assert_eq!(remap.apply(one).as_u8(), 3);
    /// assert_eq!(remap.apply(two), two);
    /// ```
    pub fn parse(text: &str, policy: DuplicatePolicy) -> StorageResult<Self> {
        Self::parse_named(text, policy, "key map")
    }

    /// Read and parse a map file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`parse`](Self::parse).
    pub fn load(path: &Path, policy: DuplicatePolicy) -> StorageResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        let remap = Self::parse_named(&text, policy, &path.display().to_string())?;
        debug!(file = %path.display(), entries = remap.len(), "Loaded button map");
        Ok(remap)
    }

    /// Write the map to `path`, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        fs::write(path, self.to_file_string()).map_err(|e| StorageError::io(path, e))
    }

    fn parse_named(text: &str, policy: DuplicatePolicy, file: &str) -> StorageResult<Self> {
        let mut map = BTreeMap::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line
                .split_once('#')
                .map_or(raw_line, |(before, _)| before)
                .trim();
            if line.is_empty() {
                continue;
            }

            let (raw, logical) = line
                .split_once(':')
                .ok_or_else(|| StorageError::parse(file, line_no, "expected raw:logical"))?;
            let raw: ButtonId = raw
                .trim()
                .parse()
                .map_err(|e| StorageError::parse(file, line_no, format!("raw button: {e}")))?;
            let logical: ButtonId = logical
                .trim()
                .parse()
                .map_err(|e| StorageError::parse(file, line_no, format!("logical button: {e}")))?;

            if map.contains_key(&raw) {
                return Err(StorageError::parse(
                    file,
                    line_no,
                    format!("raw button {raw} mapped twice"),
                ));
            }
            if policy == DuplicatePolicy::RawAndLogical && map.values().any(|&l| l == logical) {
                return Err(StorageError::parse(
                    file,
                    line_no,
                    format!("logical button {logical} mapped twice"),
                ));
            }
            map.insert(raw, logical);
        }

        Ok(Self { map })
    }

    pub fn insert(&mut self, raw: ButtonId, logical: ButtonId) -> Option<ButtonId> {
        self.map.insert(raw, logical)
    }

    pub fn get(&self, raw: ButtonId) -> Option<ButtonId> {
        self.map.get(&raw).copied()
    }

    /// Logical button for `raw`; unmapped buttons pass through unchanged.
    pub fn apply(&self, raw: ButtonId) -> ButtonId {
        self.get(raw).unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// File representation, entries sorted by raw button.
    pub fn to_file_string(&self) -> String {
        let mut out = String::from("# Keypad button mapping\n# Format: raw_button:logical_button\n\n");
        for (raw, logical) in &self.map {
            let _ = writeln!(out, "{raw}:{logical}");
        }
        out
    }

    /// 3×3 grid in keypad layout, each cell showing `raw -> logical`.
    ///
    /// Logical positions nobody maps to show `?` as raw button.
    pub fn grid(&self) -> String {
        const BORDER: &str = "+----------+----------+----------+\n";

        let mut out = String::from(BORDER);
        for row in 0..3u8 {
            out.push('|');
            for col in 0..3u8 {
                let logical = row * 3 + col + 1;
                let raw = self
                    .map
                    .iter()
                    .find(|(_, l)| l.as_u8() == logical)
                    .map_or_else(|| "?".to_string(), |(r, _)| r.to_string());
                let _ = write!(out, " {raw:>2} -> {logical} |");
            }
            out.push('\n');
            out.push_str(BORDER);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn b(id: u8) -> ButtonId {
        ButtonId::new(id).unwrap()
    }

    #[test]
    fn test_parse_with_comments_and_blanks() {
        let text = "# header\n\n1:3  # swapped\n 2 : 2 \n3:1\n";
        let remap = ButtonRemap::parse(text, DuplicatePolicy::RawOnly).unwrap();

        assert_eq!(remap.len(), 3);
        assert_eq!(remap.apply(b(1)), b(3));
        assert_eq!(remap.apply(b(3)), b(1));
        assert_eq!(remap.apply(b(9)), b(9));
    }

    #[rstest]
    #[case("1-3", 1)]
    #[case("# ok\n0:1", 2)]
    #[case("1:10", 1)]
    #[case("1:x", 1)]
    #[case("1:2\n1:3", 2)]
    fn test_parse_errors(#[case] text: &str, #[case] line: usize) {
        match ButtonRemap::parse(text, DuplicatePolicy::RawOnly) {
            Err(StorageError::Parse { line: got, .. }) => assert_eq!(got, line),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_logical_depends_on_policy() {
        let text = "1:5\n2:5\n";
        assert!(ButtonRemap::parse(text, DuplicatePolicy::RawOnly).is_ok());
        assert!(matches!(
            ButtonRemap::parse(text, DuplicatePolicy::RawAndLogical),
            Err(StorageError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".key_map");

        let mut remap = ButtonRemap::new();
        remap.insert(b(7), b(1));
        remap.insert(b(1), b(7));
        remap.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("1:7\n7:1\n"));
        assert_eq!(
            ButtonRemap::load(&path, DuplicatePolicy::RawAndLogical).unwrap(),
            remap
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = ButtonRemap::load(Path::new("/nonexistent/.key_map"), DuplicatePolicy::RawOnly)
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn test_grid() {
        let remap = ButtonRemap::parse("3:1\n2:2\n1:3\n", DuplicatePolicy::RawOnly).unwrap();
        let grid = remap.grid();
        let lines: Vec<&str> = grid.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1], "|  3 -> 1 |  2 -> 2 |  1 -> 3 |");
        assert_eq!(lines[3], "|  ? -> 4 |  ? -> 5 |  ? -> 6 |");
    }
}
