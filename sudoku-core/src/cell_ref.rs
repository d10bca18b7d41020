//! Lenient parsing of persisted cell identifiers.

use sudoku_types::CellId;
use tracing::warn;

/// Parse a `box:X,Y,cell:x,y` identifier, falling back to the top-left
/// cell when it is malformed. Persisted selections must never brick a
/// session, so the failure is logged rather than returned.
pub fn resolve_cell_id(raw: &str) -> CellId {
    match raw.parse() {
        Ok(id) => id,
        Err(e) => {
            warn!(raw, error = %e, "malformed cell id, using top-left cell");
            CellId::ORIGIN
        }
    }
}
