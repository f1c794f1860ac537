use anyhow::{bail, Result};
use std::collections::VecDeque;
use tracing::warn;

/// Splits text on a separator and merges the pieces into overlapping windows.
///
/// Lengths are measured in characters.
#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    separator: String,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterTextSplitter {
    /// # Errors
    ///
    /// Returns an error if the overlap is larger than the chunk size.
    pub fn new(separator: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap > chunk_size {
            bail!(
                "Got a larger chunk overlap ({chunk_overlap}) than chunk size ({chunk_size}), should be smaller."
            );
        }

        Ok(Self {
            separator: separator.to_string(),
            chunk_size,
            chunk_overlap,
        })
    }

    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let splits = if self.separator.is_empty() {
            text.chars().map(String::from).collect::<Vec<_>>()
        } else {
            text.split(self.separator.as_str())
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        };

        self.merge_splits(&splits)
    }

    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let separator_len = self.separator.chars().count();
        let mut docs = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for split in splits {
            let len = split.chars().count();
            let joiner = |current: &VecDeque<_>| if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner(&current) > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {total}, which is longer than the specified {}",
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = self.join(&current) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len + joiner(&current) > self.chunk_size && total > 0)
                    {
                        let Some((_, first_len)) = current.pop_front() else {
                            break;
                        };

                        total -= first_len + if current.is_empty() { 0 } else { separator_len };
                    }
                }
            }

            current.push_back((split, len));
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(doc) = self.join(&current) {
            docs.push(doc);
        }

        docs
    }

    fn join(&self, pieces: &VecDeque<(&str, usize)>) -> Option<String> {
        let doc = pieces
            .iter()
            .map(|(piece, _)| *piece)
            .collect::<Vec<_>>()
            .join(&self.separator);
        let doc = doc.trim();

        if doc.is_empty() {
            None
        } else {
            Some(doc.to_string())
        }
    }
}

impl Default for CharacterTextSplitter {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_lines_into_windows() {
        let splitter = CharacterTextSplitter::new(" ", 7, 3).unwrap();

        assert_eq!(
            splitter.split_text("foo bar baz 123"),
            vec!["foo bar", "bar baz", "baz 123"]
        );
    }

    #[test]
    fn drops_empty_pieces() {
        let splitter = CharacterTextSplitter::new("\n", 1000, 200).unwrap();

        assert_eq!(
            splitter.split_text("first\n\n\nsecond\n"),
            vec!["first\nsecond"]
        );
    }

    #[test]
    fn keeps_oversized_pieces_whole() {
        let splitter = CharacterTextSplitter::new("\n", 5, 0).unwrap();

        assert_eq!(
            splitter.split_text("ab\nthis line is long\ncd"),
            vec!["ab", "this line is long", "cd"]
        );
    }

    #[test]
    fn overlap_is_carried_into_next_chunk() {
        let splitter = CharacterTextSplitter::default();
        let line = "x".repeat(150);
        let text = vec![line.as_str(); 10].join("\n");

        let chunks = splitter.split_text(&text);

        // 6 lines of 150 plus 5 separators fit in 1000 characters.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 6 * 150 + 5);
        // The last line of the first chunk starts the second one.
        assert_eq!(chunks[1].chars().count(), 5 * 150 + 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn measures_characters_not_bytes() {
        let splitter = CharacterTextSplitter::new(" ", 5, 0).unwrap();

        assert_eq!(splitter.split_text("ééé ééé"), vec!["ééé", "ééé"]);
    }

    #[test]
    fn rejects_overlap_larger_than_size() {
        assert!(CharacterTextSplitter::new("\n", 10, 20).is_err());
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(CharacterTextSplitter::default().split_text("").is_empty());
        assert!(CharacterTextSplitter::default().split_text("\n\n").is_empty());
    }
}
