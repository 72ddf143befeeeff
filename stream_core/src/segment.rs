//! Sentence-aware text buffering for LLM token streams.
//!
//! Collects incoming fragments until a natural break point so each
//! synthesis call gets a linguistically coherent unit instead of a
//! ragged token tail.

/// Minimum characters before a boundary is allowed to win.
pub const DEFAULT_MIN_CHARS: usize = 20;

/// Buffer length past which clause boundaries become acceptable.
const CLAUSE_FALLBACK_LEN: usize = 50;

const SENTENCE_MARKS: &[char] = &['.', '!', '?'];
const CLAUSE_MARKS: &[char] = &[',', ';', ':'];

/// Accumulates text fragments and drains a prefix whenever a
/// qualifying sentence (or, as a fallback, clause) boundary appears.
///
/// Boundary detection is ASCII-only: `.`, `!`, `?` (and `,`, `;`, `:`
/// for the clause fallback) each followed by whitespace.
#[derive(Debug)]
pub struct SentenceBoundaryBuffer {
    accumulated: String,
    min_chars: usize,
}

impl Default for SentenceBoundaryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceBoundaryBuffer {
    pub fn new() -> Self {
        Self::with_min_chars(DEFAULT_MIN_CHARS)
    }

    pub fn with_min_chars(min_chars: usize) -> Self {
        Self {
            accumulated: String::new(),
            min_chars,
        }
    }

    /// Append a fragment; if the buffer now contains a qualifying
    /// boundary, return the trimmed prefix up to it and keep the
    /// remainder buffered.
    ///
    /// Among sentence boundaries past the minimum length the
    /// *rightmost* wins (prefer the longest complete segment). The
    /// clause fallback only kicks in once the buffer exceeds 50
    /// characters and takes the *first* qualifying boundary instead,
    /// so a long boundary-poor stream does not over-accumulate.
    pub fn add(&mut self, fragment: &str) -> Option<String> {
        self.accumulated.push_str(fragment);

        let end = self.find_boundary()?;
        let chunk = self.accumulated[..end].trim().to_string();
        self.accumulated.drain(..end);
        Some(chunk)
    }

    /// Drain whatever is left, trimmed. Returns `None` when the buffer
    /// is empty or whitespace-only. Must be called once at
    /// end-of-session so trailing text that never hit a boundary is
    /// not silently dropped.
    pub fn flush(&mut self) -> Option<String> {
        let remainder = std::mem::take(&mut self.accumulated);
        let trimmed = remainder.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.accumulated.chars().count()
    }

    /// Byte offset just past the winning boundary's whitespace run, or
    /// `None` when nothing qualifies yet.
    fn find_boundary(&self) -> Option<usize> {
        if let Some(end) = self.scan(SENTENCE_MARKS, true) {
            return Some(end);
        }
        if self.pending_len() > CLAUSE_FALLBACK_LEN {
            return self.scan(CLAUSE_MARKS, false);
        }
        None
    }

    /// Scan for `mark` + whitespace-run boundaries whose end offset (in
    /// chars, past the whole whitespace run) is >= `min_chars`. Returns
    /// the rightmost match's end byte offset, or the first when
    /// `rightmost` is false.
    fn scan(&self, marks: &[char], rightmost: bool) -> Option<usize> {
        let chars: Vec<(usize, char)> = self.accumulated.char_indices().collect();
        let mut best: Option<usize> = None;

        let mut i = 0;
        while i < chars.len() {
            let is_boundary =
                marks.contains(&chars[i].1) && i + 1 < chars.len() && chars[i + 1].1.is_whitespace();
            if !is_boundary {
                i += 1;
                continue;
            }

            // Consume the whole whitespace run, mirroring `\s+`.
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            let end_byte = chars.get(j).map_or(self.accumulated.len(), |&(b, _)| b);

            if j >= self.min_chars {
                if !rightmost {
                    return Some(end_byte);
                }
                best = Some(end_byte);
            }
            i = j;
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_until_boundary_qualifies() {
        let mut buf = SentenceBoundaryBuffer::new();
        assert_eq!(buf.add("Hello"), None);
        assert_eq!(buf.add(" there, how"), None);
        let chunk = buf.add(" are you today? I").unwrap();
        assert_eq!(chunk, "Hello there, how are you today?");
        // Remainder stays buffered for the next call.
        assert_eq!(buf.flush().as_deref(), Some("I"));
    }

    #[test]
    fn rightmost_sentence_boundary_wins() {
        let mut buf = SentenceBoundaryBuffer::with_min_chars(5);
        // "Hi. " ends at 4 chars and is below the minimum; both longer
        // candidates qualify and the rightmost is chosen.
        let chunk = buf.add("Hi. This is a test. Go. ").unwrap();
        assert_eq!(chunk, "Hi. This is a test. Go.");
        assert!(buf.is_empty());
    }

    #[test]
    fn boundary_below_min_chars_is_skipped() {
        let mut buf = SentenceBoundaryBuffer::new();
        assert_eq!(buf.add("Hi. Short"), None);
        assert_eq!(buf.flush().as_deref(), Some("Hi. Short"));
    }

    #[test]
    fn clause_fallback_takes_first_match_past_fifty_chars() {
        let mut buf = SentenceBoundaryBuffer::new();
        // 60 chars, no terminal punctuation, commas past the minimum.
        let text = "one two three four five six seven, eight nine ten, eleven tw";
        assert_eq!(text.len(), 60);
        let chunk = buf.add(text).unwrap();
        assert_eq!(chunk, "one two three four five six seven,");
        assert_eq!(buf.flush().as_deref(), Some("eight nine ten, eleven tw"));
    }

    #[test]
    fn clause_fallback_not_used_for_short_buffers() {
        let mut buf = SentenceBoundaryBuffer::new();
        assert_eq!(buf.add("short clause here, and then some"), None);
    }

    #[test]
    fn punctuation_without_trailing_whitespace_is_not_a_boundary() {
        let mut buf = SentenceBoundaryBuffer::with_min_chars(5);
        assert_eq!(buf.add("This sentence ends here."), None);
        let chunk = buf.add(" And continues").unwrap();
        assert_eq!(chunk, "This sentence ends here.");
        assert_eq!(buf.flush().as_deref(), Some("And continues"));
    }

    #[test]
    fn multiple_boundaries_drain_one_segment_per_call() {
        let mut buf = SentenceBoundaryBuffer::with_min_chars(5);
        let first = buf.add("One sentence here. Then another one. And a tail").unwrap();
        // Rightmost qualifying boundary covers both sentences at once.
        assert_eq!(first, "One sentence here. Then another one.");
        assert_eq!(buf.add(""), None);
        assert_eq!(buf.flush().as_deref(), Some("And a tail"));
    }

    #[test]
    fn empty_fragment_is_a_noop() {
        let mut buf = SentenceBoundaryBuffer::new();
        assert_eq!(buf.add(""), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn flush_is_idempotent() {
        let mut buf = SentenceBoundaryBuffer::new();
        buf.add("trailing text");
        assert_eq!(buf.flush().as_deref(), Some("trailing text"));
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn whitespace_only_flush_returns_nothing() {
        let mut buf = SentenceBoundaryBuffer::new();
        buf.add("   \n\t ");
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn drained_prefix_plus_remainder_reconstructs_input() {
        let mut buf = SentenceBoundaryBuffer::with_min_chars(5);
        let input = "First part done. Second part pending";
        let chunk = buf.add(input).unwrap();
        assert_eq!(chunk, "First part done.");
        let rest = buf.flush().unwrap();
        assert_eq!(format!("{chunk} {rest}"), input);
    }
}
