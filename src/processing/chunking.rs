//! Paragraph-aware splitting of document text into bounded chunks.
//!
//! Sizes are measured in characters. Concatenating the returned chunk texts in order always
//! reproduces the input exactly.

use super::types::Chunk;

const PARAGRAPH_BREAK: &str = "\n\n";

/// Split `text` into chunks of at most `max_chunk_size` characters.
///
/// Each non-final cut moves back to the nearest paragraph break inside the window, but only if
/// that break lies past the window's midpoint; otherwise the hard cut is used. Empty text yields
/// no chunks. A `max_chunk_size` of zero is treated as one.
pub fn split(text: &str, max_chunk_size: usize) -> Vec<Chunk<'_>> {
    let max_chunk_size = max_chunk_size.max(1);
    // Byte offset of every character, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut slices = Vec::new();
    let mut start = 0;
    while start < char_len {
        let mut end = (start + max_chunk_size).min(char_len);
        if end < char_len {
            let window = &text[boundaries[start]..boundaries[end]];
            if let Some(found) = window.rfind(PARAGRAPH_BREAK) {
                let break_at = start + window[..found].chars().count();
                if break_at > start + max_chunk_size / 2 {
                    end = break_at + PARAGRAPH_BREAK.len();
                }
            }
        }
        slices.push(&text[boundaries[start]..boundaries[end]]);
        start = end;
    }

    let total = slices.len();
    tracing::trace!(chars = char_len, max_chunk_size, total, "Split document");
    slices
        .into_iter()
        .enumerate()
        .map(|(position, text)| Chunk {
            index: position + 1,
            total,
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(chunks: &[Chunk<'_>]) -> Vec<usize> {
        chunks.iter().map(|chunk| chunk.text.chars().count()).collect()
    }

    fn rejoin(chunks: &[Chunk<'_>]) -> String {
        chunks.iter().map(|chunk| chunk.text).collect()
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split("", 10).is_empty());
    }

    #[test]
    fn hard_cuts_without_paragraph_breaks() {
        let text = "x".repeat(25);
        let chunks = split(&text, 10);
        assert_eq!(lengths(&chunks), vec![10, 10, 5]);
        assert_eq!(chunks[2].index, 3);
        assert!(chunks.iter().all(|chunk| chunk.total == 3));
    }

    #[test]
    fn cuts_at_paragraph_break_past_midpoint() {
        let text = format!("{}\n\n{}", "A".repeat(20), "B".repeat(5));
        let chunks = split(&text, 22);
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text).collect();
        assert_eq!(texts, vec![format!("{}\n\n", "A".repeat(20)), "B".repeat(5)]);
    }

    #[test]
    fn ignores_paragraph_break_before_midpoint() {
        let text = format!("{}\n\n{}", "A".repeat(3), "B".repeat(30));
        let chunks = split(&text, 20);
        assert_eq!(lengths(&chunks), vec![20, 15]);
    }

    #[test]
    fn final_chunk_may_be_short() {
        let chunks = split("short", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short");
        assert_eq!((chunks[0].index, chunks[0].total), (1, 1));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "論文".repeat(10);
        let chunks = split(&text, 7);
        assert_eq!(lengths(&chunks), vec![7, 7, 6]);
        assert_eq!(rejoin(&chunks), text);
    }

    #[test]
    fn concatenation_reproduces_input() {
        let samples = [
            String::from("a\n\nb\n\nc\n\nd"),
            "para one.\n\npara two is longer.\n\n\n\nthree\n".repeat(7),
            "第1章 序論\n\n本研究は...\n\n".repeat(13),
            "\n\n".repeat(9),
            "no breaks at all ".repeat(31),
        ];
        for text in &samples {
            for size in [1, 2, 3, 5, 8, 13, 64, 1000] {
                let chunks = split(text, size);
                assert_eq!(&rejoin(&chunks), text, "size {size}");
                assert!(
                    lengths(&chunks).iter().all(|len| *len <= size && *len > 0),
                    "size {size}"
                );
            }
        }
    }
}
