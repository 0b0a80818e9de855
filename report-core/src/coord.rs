//! FILENAME: report-core/src/coord.rs
//! PURPOSE: Conversions between column letters / A1 references and 0-based indices.
//! CONTEXT: Templates address cells with letters ("A", "U") and merge ranges
//! ("A1:F1"). Everything past template loading works with 0-based (row, col)
//! indices; letters are only produced again at the spreadsheet boundary.
//! Column "A" = 0, "Z" = 25, "AA" = 26. Row 1 in A1 notation = row 0.

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// An inclusive rectangular range of cells, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

impl CellRange {
    /// True when the range covers one cell only. Such a "merge" is a no-op.
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// Parses a column string ("A", "aa") into a 0-based index.
/// Returns None for empty input, non-letters, or columns past "XFD".
pub fn col_to_index(col_str: &str) -> Option<u32> {
    let col_str = col_str.trim();
    if col_str.is_empty() || col_str.len() > 3 {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result * 26 + digit;
    }
    let index = result - 1;
    (index < MAX_COLUMNS).then_some(index)
}

/// Number of columns a worksheet can hold (A..XFD).
pub const MAX_COLUMNS: u32 = 16_384;

/// Converts a 0-based column index to its letters.
/// 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Parses a single A1 reference ("B12", "$C$3") into a 0-based coordinate.
pub fn parse_a1(reference: &str) -> Option<CellCoord> {
    let cleaned: String = reference.trim().chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    let col = col_to_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Parses a range reference ("A1:F1"). A single reference yields a one-cell range.
/// Corners are normalized so `first_*` <= `last_*`.
pub fn parse_range(range: &str) -> Option<CellRange> {
    let (start, end) = match range.split_once(':') {
        Some((a, b)) => (parse_a1(a)?, parse_a1(b)?),
        None => {
            let single = parse_a1(range)?;
            (single, single)
        }
    };
    Some(CellRange {
        first_row: start.0.min(end.0),
        first_col: start.1.min(end.1),
        last_row: start.0.max(end.0),
        last_col: start.1.max(end.1),
    })
}

/// Converts a 0-based coordinate to an A1 reference string.
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_to_index() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("U"), Some(20));
        assert_eq!(col_to_index("XFD"), Some(16_383));
        assert_eq!(col_to_index("XFE"), None);
        assert_eq!(col_to_index("A1"), None);
        assert_eq!(col_to_index(""), None);
    }

    #[test]
    fn test_index_to_col() {
        assert_eq!(index_to_col(0), "A");
        assert_eq!(index_to_col(21), "V");
        assert_eq!(index_to_col(26), "AA");
        assert_eq!(index_to_col(701), "ZZ");
        assert_eq!(index_to_col(702), "AAA");
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!(parse_a1("A1"), Some((0, 0)));
        assert_eq!(parse_a1("$C$3"), Some((2, 2)));
        assert_eq!(parse_a1("AA100"), Some((99, 26)));
        assert_eq!(parse_a1("A0"), None);
        assert_eq!(parse_a1("12"), None);
    }

    #[test]
    fn test_parse_range_normalizes_corners() {
        let range = parse_range("F3:A1").unwrap();
        assert_eq!(
            range,
            CellRange { first_row: 0, first_col: 0, last_row: 2, last_col: 5 }
        );
        assert!(parse_range("B2").unwrap().is_single_cell());
        assert!(parse_range("A1:??").is_none());
    }

    #[test]
    fn test_coord_to_a1() {
        assert_eq!(coord_to_a1((0, 0)), "A1");
        assert_eq!(coord_to_a1((49, 25)), "Z50");
    }
}
