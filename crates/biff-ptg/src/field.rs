//! Packed row/column fields shared by reference-style tokens.
//!
//! BIFF8 stores a cell coordinate as a 16-bit row plus a 16-bit column field
//! whose top two bits are the relative flags:
//!
//! - bit 15: row-relative
//! - bit 14: column-relative
//! - bits 0..=13: column index (0..=16383)
//!
//! The row field is nominally signed; logical rows above 32767 wrap into the
//! negative half on encode and are recovered on decode. All in-memory
//! reasoning uses the logical (unwrapped) `u16` row.

/// Highest logical row index (0-based).
pub const MAX_ROW: u16 = u16::MAX;
/// Highest column index representable in the 14-bit column payload.
pub const MAX_COL: u16 = 0x3FFF;

const ROW_RELATIVE_BIT: u16 = 0x8000;
const COL_RELATIVE_BIT: u16 = 0x4000;
const COL_MASK: u16 = 0x3FFF;

/// Encode a logical row (0..=65535) into the signed 16-bit stream field.
///
/// Rows above 32767 wrap modulo 65536 into the negative half; row 32768
/// encodes as `i16::MIN`.
#[inline]
pub const fn encode_row(row: u16) -> i16 {
    row as i16
}

/// Recover the logical row from the signed 16-bit stream field.
#[inline]
pub const fn decode_row(field: i16) -> u16 {
    field as u16
}

/// A 0-based cell coordinate in the logical (unwrapped) domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellCoord {
    pub row: u16,
    pub col: u16,
}

impl CellCoord {
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// The packed BIFF8 column field: relative flags plus a 14-bit column index.
///
/// Flag and column accessors are independent; mutating one never disturbs the
/// others, in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColumnField(u16);

impl ColumnField {
    /// Build a field from its parts. `col` is masked to 14 bits.
    pub const fn new(col: u16, row_relative: bool, col_relative: bool) -> Self {
        let mut raw = col & COL_MASK;
        if row_relative {
            raw |= ROW_RELATIVE_BIT;
        }
        if col_relative {
            raw |= COL_RELATIVE_BIT;
        }
        Self(raw)
    }

    /// Wrap the raw 16-bit field exactly as stored in the stream.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw 16-bit field exactly as stored in the stream.
    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn column(self) -> u16 {
        self.0 & COL_MASK
    }

    pub fn set_column(&mut self, col: u16) {
        self.0 = (self.0 & !COL_MASK) | (col & COL_MASK);
    }

    pub const fn row_relative(self) -> bool {
        self.0 & ROW_RELATIVE_BIT != 0
    }

    pub fn set_row_relative(&mut self, relative: bool) {
        if relative {
            self.0 |= ROW_RELATIVE_BIT;
        } else {
            self.0 &= !ROW_RELATIVE_BIT;
        }
    }

    pub const fn col_relative(self) -> bool {
        self.0 & COL_RELATIVE_BIT != 0
    }

    pub fn set_col_relative(&mut self, relative: bool) {
        if relative {
            self.0 |= COL_RELATIVE_BIT;
        } else {
            self.0 &= !COL_RELATIVE_BIT;
        }
    }
}

/// Row/column payload of a single-cell reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RefFields {
    /// Logical (unwrapped) row, 0..=65535.
    pub row: u16,
    pub col: ColumnField,
}

/// Row/column payload of a rectangular-area reference token. Each corner has
/// its own relative flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AreaFields {
    pub first_row: u16,
    pub last_row: u16,
    pub first_col: ColumnField,
    pub last_col: ColumnField,
}

/// Append the alphabetic label for a 0-based column (`0 -> A`, `26 -> AA`).
pub fn push_column_label(col: u16, out: &mut String) {
    let mut n = col as u32 + 1;
    let mut buf = [0u8; 4];
    let mut len = 0usize;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        buf[len] = b'A' + rem;
        len += 1;
        n = (n - 1) / 26;
    }
    for i in (0..len).rev() {
        out.push(buf[i] as char);
    }
}
