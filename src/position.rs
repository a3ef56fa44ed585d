// WHY: All public offsets are character offsets while Rust slices by byte.
// These accumulators do the conversion incrementally so no caller re-scans text.

/// 0-based byte position in source text
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub struct BytePos(pub usize);

/// 0-based character position in source text
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default)]
pub struct CharPos(pub usize);

impl From<BytePos> for usize {
    fn from(pos: BytePos) -> Self {
        pos.0
    }
}

impl From<CharPos> for usize {
    fn from(pos: CharPos) -> Self {
        pos.0
    }
}

/// Forward-moving byte to char converter.
///
/// Threaded through the tag parser and word extractor: every consumed token
/// advances the same tracker, so the running char cursor is never recomputed.
#[derive(Debug, Clone)]
pub struct OffsetTracker<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    char_pos: usize,
}

impl<'a> OffsetTracker<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            byte_pos: 0,
            char_pos: 0,
        }
    }

    /// Current byte position
    pub fn byte_pos(&self) -> BytePos {
        BytePos(self.byte_pos)
    }

    /// Current character position
    pub fn char_pos(&self) -> CharPos {
        CharPos(self.char_pos)
    }

    /// Advance to target byte position and return the matching char position.
    /// O(1) amortized: only bytes between the current and target position are visited.
    /// Seeking backwards restarts the count from the beginning of the text.
    pub fn advance_to_byte(&mut self, target: BytePos) -> CharPos {
        let target = target.0.min(self.bytes.len());
        if target < self.byte_pos {
            self.byte_pos = 0;
            self.char_pos = 0;
        }

        while self.byte_pos < target {
            let byte = self.bytes[self.byte_pos];
            // ASCII (0xxxxxxx) or multi-byte start (11xxxxxx); continuation bytes don't count
            if (byte & 0x80) == 0 || (byte & 0xC0) == 0xC0 {
                self.char_pos += 1;
            }
            self.byte_pos += 1;
        }

        CharPos(self.char_pos)
    }
}

/// Random-access char to byte table for a whole document.
///
/// The page splitter jumps around inside boundary windows, which a
/// forward-only tracker can't do.
#[derive(Debug, Clone)]
pub struct CharIndex {
    /// Byte offset of every char, plus a trailing entry for the text length
    byte_offsets: Vec<usize>,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        byte_offsets.push(text.len());
        Self { byte_offsets }
    }

    /// Number of chars in the indexed text
    pub fn char_len(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    /// Byte offset of a char position, clamped to the text length
    pub fn byte_of(&self, pos: CharPos) -> BytePos {
        let idx = pos.0.min(self.char_len());
        BytePos(self.byte_offsets[idx])
    }

    /// Char position of a byte offset; offsets inside a char round down
    pub fn char_of(&self, pos: BytePos) -> CharPos {
        match self.byte_offsets.binary_search(&pos.0) {
            Ok(idx) => CharPos(idx),
            Err(idx) => CharPos(idx.saturating_sub(1)),
        }
    }
}

/// Length of a string in chars
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Slice a string by char range
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let mut indices = text.char_indices().map(|(b, _)| b).chain(std::iter::once(text.len()));
    let start_byte = indices.by_ref().nth(start).unwrap_or(text.len());
    let end_byte = if end > start {
        indices.nth(end - start - 1).unwrap_or(text.len())
    } else {
        start_byte
    };
    &text[start_byte..end_byte]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_multibyte_chars_once() {
        let text = "añb世c";
        let mut tracker = OffsetTracker::new(text);

        assert_eq!(tracker.advance_to_byte(BytePos(1)), CharPos(1));
        // 'ñ' is two bytes
        assert_eq!(tracker.advance_to_byte(BytePos(3)), CharPos(2));
        // '世' is three bytes
        assert_eq!(tracker.advance_to_byte(BytePos(7)), CharPos(4));
        assert_eq!(tracker.advance_to_byte(BytePos(text.len())), CharPos(5));
    }

    #[test]
    fn test_tracker_backwards_seek_restarts() {
        let text = "héllo";
        let mut tracker = OffsetTracker::new(text);
        tracker.advance_to_byte(BytePos(text.len()));
        assert_eq!(tracker.advance_to_byte(BytePos(1)), CharPos(1));
        assert_eq!(tracker.byte_pos(), BytePos(1));
    }

    #[test]
    fn test_char_index_round_trip() {
        let text = "ça va, 世界";
        let index = CharIndex::new(text);
        assert_eq!(index.char_len(), 9);
        for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
            assert_eq!(index.byte_of(CharPos(char_idx)), BytePos(byte_idx));
            assert_eq!(index.char_of(BytePos(byte_idx)), CharPos(char_idx));
        }
        assert_eq!(index.byte_of(CharPos(100)), BytePos(text.len()));
    }

    #[test]
    fn test_slice_chars() {
        let text = "añb世c";
        assert_eq!(slice_chars(text, 1, 4), "ñb世");
        assert_eq!(slice_chars(text, 0, 0), "");
        assert_eq!(slice_chars(text, 3, 10), "世c");
    }
}
