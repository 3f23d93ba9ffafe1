//! The ptg variants: one binary-encoded unit of a postfix formula stream.
//!
//! Tokens are immutable value data; "retagging" the operand class produces a
//! new token via [`Ptg::with_class`]. `Clone` is a deep copy (array grids are
//! owned, never shared), which matters when a shared/array formula is
//! replicated across many cells.

use crate::class::OperandClass;
use crate::error::InvalidOperandClass;
use crate::field::{AreaFields, RefFields};

// Base identity bytes, [MS-XLS] 2.5.198.
pub(crate) const PTG_EXP: u8 = 0x01;
pub(crate) const PTG_TBL: u8 = 0x02;
pub(crate) const PTG_ADD: u8 = 0x03;
pub(crate) const PTG_SUB: u8 = 0x04;
pub(crate) const PTG_MUL: u8 = 0x05;
pub(crate) const PTG_DIV: u8 = 0x06;
pub(crate) const PTG_POWER: u8 = 0x07;
pub(crate) const PTG_CONCAT: u8 = 0x08;
pub(crate) const PTG_LT: u8 = 0x09;
pub(crate) const PTG_LE: u8 = 0x0A;
pub(crate) const PTG_EQ: u8 = 0x0B;
pub(crate) const PTG_GE: u8 = 0x0C;
pub(crate) const PTG_GT: u8 = 0x0D;
pub(crate) const PTG_NE: u8 = 0x0E;
pub(crate) const PTG_ISECT: u8 = 0x0F;
pub(crate) const PTG_UNION: u8 = 0x10;
pub(crate) const PTG_RANGE: u8 = 0x11;
pub(crate) const PTG_UPLUS: u8 = 0x12;
pub(crate) const PTG_UMINUS: u8 = 0x13;
pub(crate) const PTG_PERCENT: u8 = 0x14;
pub(crate) const PTG_PAREN: u8 = 0x15;
pub(crate) const PTG_MISSARG: u8 = 0x16;
pub(crate) const PTG_STR: u8 = 0x17;
pub(crate) const PTG_ATTR: u8 = 0x19;
pub(crate) const PTG_ERR: u8 = 0x1C;
pub(crate) const PTG_BOOL: u8 = 0x1D;
pub(crate) const PTG_INT: u8 = 0x1E;
pub(crate) const PTG_NUM: u8 = 0x1F;
pub(crate) const PTG_ARRAY: u8 = 0x20;
pub(crate) const PTG_FUNC: u8 = 0x21;
pub(crate) const PTG_FUNC_VAR: u8 = 0x22;
pub(crate) const PTG_NAME: u8 = 0x23;
pub(crate) const PTG_REF: u8 = 0x24;
pub(crate) const PTG_AREA: u8 = 0x25;
pub(crate) const PTG_MEM_AREA: u8 = 0x26;
pub(crate) const PTG_MEM_ERR: u8 = 0x27;
pub(crate) const PTG_MEM_FUNC: u8 = 0x29;
pub(crate) const PTG_REF_ERR: u8 = 0x2A;
pub(crate) const PTG_AREA_ERR: u8 = 0x2B;
pub(crate) const PTG_REF_N: u8 = 0x2C;
pub(crate) const PTG_AREA_N: u8 = 0x2D;
pub(crate) const PTG_NAME_X: u8 = 0x39;
pub(crate) const PTG_REF_3D: u8 = 0x3A;
pub(crate) const PTG_AREA_3D: u8 = 0x3B;
pub(crate) const PTG_REF_ERR_3D: u8 = 0x3C;
pub(crate) const PTG_AREA_ERR_3D: u8 = 0x3D;

/// `PtgAttr.grbit` bit for the optimized-SUM shortcut.
pub(crate) const ATTR_SUM: u8 = 0x10;
/// `PtgAttr.grbit` bit for the optimized-CHOOSE jump table.
pub(crate) const ATTR_CHOOSE: u8 = 0x04;

/// Literal text rendered for deleted (error) references.
pub const REF_ERROR_TEXT: &str = "#REF!";

/// Display text for a BIFF error code, if the code is one Excel defines.
pub fn error_code_text(code: u8) -> Option<&'static str> {
    Some(match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        _ => return None,
    })
}

/// A BIFF string payload, kept as raw UTF-16 code units.
///
/// Streams may carry ill-formed UTF-16 (unpaired surrogates); holding the
/// units instead of a `String` keeps those byte-exact through a round-trip.
/// `wide` records whether the stream stored two-byte units (vs. compressed
/// single-byte characters), so ASCII text stored wide re-encodes unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utf16Text {
    units: Vec<u16>,
    wide: bool,
}

impl Utf16Text {
    /// Wrap raw code units with an explicit storage width. Units above 0xFF
    /// cannot be stored compressed, so `wide` is forced on when any appear.
    pub fn new(units: Vec<u16>, wide: bool) -> Self {
        let wide = wide || units.iter().any(|&u| u > 0xFF);
        Self { units, wide }
    }

    /// Build from text, compressed when every unit fits a single byte.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.encode_utf16().collect(), false)
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn is_wide(&self) -> bool {
        self.wide
    }

    /// Lossy text view; ill-formed sequences display as U+FFFD.
    pub fn to_text(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}

impl From<&str> for Utf16Text {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

/// `PtgAttr` payload: evaluation hints and, for optimized CHOOSE, a jump table
/// of `u16` offsets. The offsets are stream bookkeeping only and are never
/// evaluated here; they are preserved for byte-exact round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrFields {
    pub grbit: u8,
    pub w_attr: u16,
    pub choose_table: Vec<u16>,
}

impl AttrFields {
    pub fn is_sum(&self) -> bool {
        self.grbit & ATTR_SUM != 0
    }
}

/// One literal cell inside an array-literal grid.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Empty,
    Number(f64),
    Text(Utf16Text),
    Bool(bool),
    Err(u8),
}

/// The out-of-band grid of an array-literal token, row-major.
///
/// `values.len() == cols * rows`; the extent is stored in the trailing data as
/// `cols - 1` (u8) and `rows - 1` (u16), so cols is 1..=256 and rows is
/// 1..=65536.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGrid {
    pub cols: u16,
    pub rows: u32,
    pub values: Vec<ArrayValue>,
}

impl ArrayGrid {
    pub fn get(&self, row: u32, col: u16) -> Option<&ArrayValue> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.values.get(row as usize * self.cols as usize + col as usize)
    }
}

/// In-stream header of an array-literal token: 5 reserved bytes plus the
/// little-endian sub-expression length. The grid itself lives after the whole
/// token stream and is filled by the second decode pass ([`crate::decode::read_rgcb`]);
/// until then `grid` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFields {
    pub reserved: [u8; 5],
    pub cce: u16,
    pub grid: Option<ArrayGrid>,
}

/// A parsed formula token.
///
/// Classable operand variants carry their [`OperandClass`] explicitly; the
/// serialized identity byte is always recomposed as `base + class offset` on
/// encode. Operator/control variants ignore the class bits entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Ptg {
    /// Migration placeholder: the cell still points at a shared/array formula
    /// definition and has not been rewritten into a direct token sequence.
    /// Must never reach the encoder or the reconstructor.
    Exp { base_row: u16, base_col: u16 },
    /// Migration placeholder for data-table cells; same contract as [`Ptg::Exp`].
    Tbl { base_row: u16, base_col: u16 },

    Add,
    Sub,
    Mul,
    Div,
    Power,
    Concat,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
    Intersect,
    Union,
    Range,
    UnaryPlus,
    UnaryMinus,
    Percent,
    Paren,
    MissArg,

    /// String literal, at most 255 code units on the wire.
    Str(Utf16Text),
    Attr(AttrFields),
    ErrLit(u8),
    BoolLit(bool),
    IntLit(u16),
    NumLit(f64),

    ArrayLit {
        class: OperandClass,
        fields: ArrayFields,
    },
    Func {
        class: OperandClass,
        iftab: u16,
    },
    FuncVar {
        class: OperandClass,
        argc: u8,
        iftab: u16,
    },
    /// Defined-name reference; `index` is 1-based into the external name table.
    Name {
        class: OperandClass,
        index: u16,
        reserved: u16,
    },
    /// Cross-workbook name reference.
    NameX {
        class: OperandClass,
        ixti: u16,
        index: u16,
        reserved: u16,
    },
    Ref {
        class: OperandClass,
        fields: RefFields,
    },
    Area {
        class: OperandClass,
        fields: AreaFields,
    },
    /// Relative (shared-formula) cell reference; row/column are offsets from a
    /// base cell when the corresponding relative flag is set.
    RefN {
        class: OperandClass,
        fields: RefFields,
    },
    AreaN {
        class: OperandClass,
        fields: AreaFields,
    },
    /// Deleted cell reference; renders as `#REF!` regardless of the preserved
    /// payload bytes.
    RefErr {
        class: OperandClass,
        raw: [u8; 4],
    },
    AreaErr {
        class: OperandClass,
        raw: [u8; 8],
    },
    MemArea {
        class: OperandClass,
        reserved: u32,
        cce: u16,
    },
    MemErr {
        class: OperandClass,
        reserved: u32,
        cce: u16,
    },
    MemFunc {
        class: OperandClass,
        cce: u16,
    },
    Ref3d {
        class: OperandClass,
        ixti: u16,
        fields: RefFields,
    },
    Area3d {
        class: OperandClass,
        ixti: u16,
        fields: AreaFields,
    },
    RefErr3d {
        class: OperandClass,
        ixti: u16,
        raw: [u8; 4],
    },
    AreaErr3d {
        class: OperandClass,
        ixti: u16,
        raw: [u8; 8],
    },

    /// An identity byte with no known mapping. The raw payload-less bytes are
    /// preserved opaquely so newer writers' tokens round-trip unchanged.
    Unknown { id: u8, data: Vec<u8> },
}

impl Ptg {
    /// The base identity byte (class offset stripped). For [`Ptg::Unknown`]
    /// this is the raw identity byte as read.
    pub fn base_id(&self) -> u8 {
        match self {
            Ptg::Exp { .. } => PTG_EXP,
            Ptg::Tbl { .. } => PTG_TBL,
            Ptg::Add => PTG_ADD,
            Ptg::Sub => PTG_SUB,
            Ptg::Mul => PTG_MUL,
            Ptg::Div => PTG_DIV,
            Ptg::Power => PTG_POWER,
            Ptg::Concat => PTG_CONCAT,
            Ptg::Lt => PTG_LT,
            Ptg::Le => PTG_LE,
            Ptg::Eq => PTG_EQ,
            Ptg::Ge => PTG_GE,
            Ptg::Gt => PTG_GT,
            Ptg::Ne => PTG_NE,
            Ptg::Intersect => PTG_ISECT,
            Ptg::Union => PTG_UNION,
            Ptg::Range => PTG_RANGE,
            Ptg::UnaryPlus => PTG_UPLUS,
            Ptg::UnaryMinus => PTG_UMINUS,
            Ptg::Percent => PTG_PERCENT,
            Ptg::Paren => PTG_PAREN,
            Ptg::MissArg => PTG_MISSARG,
            Ptg::Str { .. } => PTG_STR,
            Ptg::Attr(_) => PTG_ATTR,
            Ptg::ErrLit(_) => PTG_ERR,
            Ptg::BoolLit(_) => PTG_BOOL,
            Ptg::IntLit(_) => PTG_INT,
            Ptg::NumLit(_) => PTG_NUM,
            Ptg::ArrayLit { .. } => PTG_ARRAY,
            Ptg::Func { .. } => PTG_FUNC,
            Ptg::FuncVar { .. } => PTG_FUNC_VAR,
            Ptg::Name { .. } => PTG_NAME,
            Ptg::NameX { .. } => PTG_NAME_X,
            Ptg::Ref { .. } => PTG_REF,
            Ptg::Area { .. } => PTG_AREA,
            Ptg::RefN { .. } => PTG_REF_N,
            Ptg::AreaN { .. } => PTG_AREA_N,
            Ptg::RefErr { .. } => PTG_REF_ERR,
            Ptg::AreaErr { .. } => PTG_AREA_ERR,
            Ptg::MemArea { .. } => PTG_MEM_AREA,
            Ptg::MemErr { .. } => PTG_MEM_ERR,
            Ptg::MemFunc { .. } => PTG_MEM_FUNC,
            Ptg::Ref3d { .. } => PTG_REF_3D,
            Ptg::Area3d { .. } => PTG_AREA_3D,
            Ptg::RefErr3d { .. } => PTG_REF_ERR_3D,
            Ptg::AreaErr3d { .. } => PTG_AREA_ERR_3D,
            Ptg::Unknown { id, .. } => *id,
        }
    }

    /// The stored operand class, if this kind carries one.
    pub fn class(&self) -> Option<OperandClass> {
        match self {
            Ptg::ArrayLit { class, .. }
            | Ptg::Func { class, .. }
            | Ptg::FuncVar { class, .. }
            | Ptg::Name { class, .. }
            | Ptg::NameX { class, .. }
            | Ptg::Ref { class, .. }
            | Ptg::Area { class, .. }
            | Ptg::RefN { class, .. }
            | Ptg::AreaN { class, .. }
            | Ptg::RefErr { class, .. }
            | Ptg::AreaErr { class, .. }
            | Ptg::MemArea { class, .. }
            | Ptg::MemErr { class, .. }
            | Ptg::MemFunc { class, .. }
            | Ptg::Ref3d { class, .. }
            | Ptg::Area3d { class, .. }
            | Ptg::RefErr3d { class, .. }
            | Ptg::AreaErr3d { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// The class for callers that query generically: the stored class for
    /// classable kinds, VALUE by convention for everything else. The
    /// conventional value is never serialized with an offset.
    pub fn operand_class(&self) -> OperandClass {
        self.class().unwrap_or(OperandClass::Value)
    }

    pub fn is_classable(&self) -> bool {
        self.class().is_some()
    }

    /// The default class a fresh token of this base kind receives when built
    /// by a formula author: reference-shaped kinds default to REFERENCE,
    /// computed operands (arrays, function results, names) to VALUE.
    pub fn default_class_for_base(base: u8) -> Option<OperandClass> {
        match base {
            PTG_REF | PTG_AREA | PTG_REF_N | PTG_AREA_N | PTG_REF_3D | PTG_AREA_3D
            | PTG_REF_ERR | PTG_AREA_ERR | PTG_REF_ERR_3D | PTG_AREA_ERR_3D | PTG_MEM_AREA
            | PTG_MEM_ERR | PTG_MEM_FUNC => Some(OperandClass::Reference),
            PTG_ARRAY | PTG_FUNC | PTG_FUNC_VAR | PTG_NAME | PTG_NAME_X => {
                Some(OperandClass::Value)
            }
            _ => None,
        }
    }

    /// Produce a copy of this token carrying `class`.
    ///
    /// Legal only for classable kinds; asking an operator or control token to
    /// carry a class is an upstream logic error and is reported, not patched.
    pub fn with_class(&self, class: OperandClass) -> Result<Ptg, InvalidOperandClass> {
        let mut out = self.clone();
        match &mut out {
            Ptg::ArrayLit { class: c, .. }
            | Ptg::Func { class: c, .. }
            | Ptg::FuncVar { class: c, .. }
            | Ptg::Name { class: c, .. }
            | Ptg::NameX { class: c, .. }
            | Ptg::Ref { class: c, .. }
            | Ptg::Area { class: c, .. }
            | Ptg::RefN { class: c, .. }
            | Ptg::AreaN { class: c, .. }
            | Ptg::RefErr { class: c, .. }
            | Ptg::AreaErr { class: c, .. }
            | Ptg::MemArea { class: c, .. }
            | Ptg::MemErr { class: c, .. }
            | Ptg::MemFunc { class: c, .. }
            | Ptg::Ref3d { class: c, .. }
            | Ptg::Area3d { class: c, .. }
            | Ptg::RefErr3d { class: c, .. }
            | Ptg::AreaErr3d { class: c, .. } => {
                *c = class;
                Ok(out)
            }
            _ => Err(InvalidOperandClass {
                base: self.base_id(),
                class,
            }),
        }
    }

    /// Number of bytes this token occupies in the stream, identity byte
    /// included. For array literals this is the in-stream header only; the
    /// grid lives out-of-band.
    pub fn encoded_size(&self) -> usize {
        match self {
            Ptg::Exp { .. } | Ptg::Tbl { .. } => 5,
            Ptg::Add
            | Ptg::Sub
            | Ptg::Mul
            | Ptg::Div
            | Ptg::Power
            | Ptg::Concat
            | Ptg::Lt
            | Ptg::Le
            | Ptg::Eq
            | Ptg::Ge
            | Ptg::Gt
            | Ptg::Ne
            | Ptg::Intersect
            | Ptg::Union
            | Ptg::Range
            | Ptg::UnaryPlus
            | Ptg::UnaryMinus
            | Ptg::Percent
            | Ptg::Paren
            | Ptg::MissArg => 1,
            Ptg::Str(s) => 3 + s.units.len() * if s.wide { 2 } else { 1 },
            Ptg::Attr(attr) => 4 + attr.choose_table.len() * 2,
            Ptg::ErrLit(_) | Ptg::BoolLit(_) => 2,
            Ptg::IntLit(_) => 3,
            Ptg::NumLit(_) => 9,
            Ptg::ArrayLit { .. } => 8,
            Ptg::Func { .. } | Ptg::MemFunc { .. } => 3,
            Ptg::FuncVar { .. } => 4,
            Ptg::Name { .. } => 5,
            Ptg::NameX { .. } => 7,
            Ptg::Ref { .. } | Ptg::RefN { .. } | Ptg::RefErr { .. } => 5,
            Ptg::Area { .. } | Ptg::AreaN { .. } | Ptg::AreaErr { .. } => 9,
            Ptg::MemArea { .. } | Ptg::MemErr { .. } => 7,
            Ptg::Ref3d { .. } | Ptg::RefErr3d { .. } => 7,
            Ptg::Area3d { .. } | Ptg::AreaErr3d { .. } => 11,
            Ptg::Unknown { data, .. } => 1 + data.len(),
        }
    }

    /// True for the migration-only placeholder kinds that must never reach the
    /// encoder or the reconstructor.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Ptg::Exp { .. } | Ptg::Tbl { .. })
    }
}
