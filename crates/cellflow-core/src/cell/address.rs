//! A1-notation cell addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address as written in a formula (`A1`, `$B$2`, `C$3`).
///
/// Rows and columns are 0-based. The `$` markers are kept so a reference can
/// be re-anchored: absolute axes stay put, relative axes move with the cell
/// the formula is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl CellAddress {
    /// Relative address
    pub fn new(row: u32, col: u16) -> Self {
        Self::with_absolute(row, col, false, false)
    }

    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Parse `[$]LETTERS[$]DIGITS`, case-insensitive, surrounding whitespace ignored
    ///
    /// ```
    /// use cellflow_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("c$7").unwrap();
    /// assert_eq!((addr.row, addr.col), (6, 2));
    /// assert!(addr.row_absolute && !addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, text));

        let (col_absolute, rest) = match text.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(invalid("missing column"));
        }
        let col = column_index(&rest[..letters_end])?;

        let (row_absolute, digits) = match rest[letters_end..].strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, &rest[letters_end..]),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("missing row"));
        }
        let row = match digits.parse::<u32>() {
            Ok(0) => return Err(invalid("row 0")),
            Ok(n) => n - 1,
            // Too many digits for u32 is past the last row anyway
            Err(_) => return Err(Error::RowOutOfBounds(u32::MAX, MAX_ROWS - 1)),
        };
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row, col, row_absolute, col_absolute))
    }

    /// Shift by a row/column delta, keeping the `$` markers; `None` off the grid
    pub fn offset(&self, d_row: i64, d_col: i64) -> Option<CellAddress> {
        let row = u32::try_from(self.row as i64 + d_row).ok()?;
        let col = u16::try_from(self.col as i64 + d_col).ok()?;
        if row >= MAX_ROWS || col >= MAX_COLS {
            return None;
        }
        Some(Self::with_absolute(row, col, self.row_absolute, self.col_absolute))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollar = |absolute: bool| if absolute { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            dollar(self.col_absolute),
            column_name(self.col),
            dollar(self.row_absolute),
            self.row + 1
        )
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Column letters for a 0-based index (0 = A, 26 = AA)
fn column_name(col: u16) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut n = col as u32 + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// 0-based index for column letters
fn column_index(letters: &str) -> Result<u16> {
    let mut n: u32 = 0;
    for b in letters.bytes() {
        n = n * 26 + (b.to_ascii_uppercase() - b'A') as u32 + 1;
        if n > MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(n - 1, MAX_COLS - 1));
        }
    }
    Ok((n - 1) as u16)
}

/// Two corners of a rectangle, normalized so `start` is top-left.
///
/// Each corner keeps the `$` markers of the axis it ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (top, bottom) = if a.row <= b.row { (a, b) } else { (b, a) };
        let (left, right) = if a.col <= b.col { (a, b) } else { (b, a) };
        Self {
            start: CellAddress::with_absolute(top.row, left.col, top.row_absolute, left.col_absolute),
            end: CellAddress::with_absolute(
                bottom.row,
                right.col,
                bottom.row_absolute,
                right.col_absolute,
            ),
        }
    }

    /// Relative range from 0-based corner indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
