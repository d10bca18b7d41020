//! Error types for the data model.

use thiserror::Error;

/// Errors that can occur while building or parsing model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// A cell digit outside 0..=9
    #[error("invalid digit: {0}")]
    InvalidDigit(u8),

    /// A row or column index outside the 9×9 grid
    #[error("cell position out of range: row {row}, column {col}")]
    OutOfRange {
        /// Row index that was requested.
        row: usize,
        /// Column index that was requested.
        col: usize,
    },

    /// A cell identifier that does not match `box:X,Y,cell:x,y`
    #[error("malformed cell id: {0}")]
    MalformedCellId(String),

    /// Puzzle text that is not 81 cells long
    #[error("puzzle text must have 81 cells, got {0}")]
    PuzzleTextLength(usize),

    /// Unrecognized puzzle text character
    #[error("invalid puzzle character: {0:?}")]
    PuzzleTextChar(char),

    /// Unknown difficulty label
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::InvalidDigit(12);
        assert_eq!(err.to_string(), "invalid digit: 12");

        let err = TypesError::OutOfRange { row: 9, col: 2 };
        assert_eq!(err.to_string(), "cell position out of range: row 9, column 2");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
