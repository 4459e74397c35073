//! Mapping between tokenizer locations and byte offsets.
//!
//! sqlparser reports token spans as 1-based (line, column) pairs where the
//! column counts characters. Slicing the original text needs byte offsets.

use sqlparser::tokenizer::Location;

/// Line-start table for one piece of SQL text
pub struct LineIndex<'a> {
    text: &'a str,
    line_offsets: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_offsets = vec![0]; // Line 1 starts at offset 0
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i + 1);
            }
        }
        Self { text, line_offsets }
    }

    /// Convert a (1-based line, 1-based column) location to a byte offset.
    ///
    /// Out-of-range locations clamp to the end of the text.
    pub fn offset(&self, location: Location) -> usize {
        let line = location.line as usize;
        if line == 0 || line > self.line_offsets.len() {
            return self.text.len();
        }
        let line_start = self.line_offsets[line - 1];
        let column = (location.column as usize).saturating_sub(1);
        self.text[line_start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(self.text.len())
    }
}
