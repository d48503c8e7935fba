//! Byte offset to line/column conversion for diagnostics.

use memchr::memchr_iter;

#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr_iter(b'\n', source.as_bytes()).map(|i| i + 1));
        Self { line_starts }
    }

    /// 1-based line and column. Columns count characters, not bytes.
    pub fn line_col(&self, source: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line as u32 + 1, column as u32 + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_starts_at_one() {
        let src = "x = 1\ny = 2\n";
        let index = LineIndex::new(src);
        assert_eq!(index.line_col(src, 0), (1, 1));
        assert_eq!(index.line_col(src, 4), (1, 5));
    }

    #[test]
    fn offsets_after_newline() {
        let src = "x = 1\ny ?? 2\n";
        let index = LineIndex::new(src);
        assert_eq!(index.line_col(src, 6), (2, 1));
        assert_eq!(index.line_col(src, 8), (2, 3));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn columns_count_chars() {
        let src = "é = 1";
        let index = LineIndex::new(src);
        assert_eq!(index.line_col(src, 3), (1, 3));
    }
}
