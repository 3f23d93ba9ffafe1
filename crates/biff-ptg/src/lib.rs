//! BIFF8 formula token (`Ptg`) codec and formula-text reconstruction.
//!
//! A BIFF8 cell formula is a postfix (`rgce`) stream of typed binary tokens;
//! array literals park their grids after the whole stream (`rgcb`). This crate
//! provides:
//!
//! - [`decode_rgce`] / [`read_rgcb`]: two-phase decoding of raw bytes into a
//!   typed [`Ptg`] sequence (plus [`decode_formula`] for record-shaped input)
//! - [`encode_rgce`]: the inverse, byte-for-byte round-trip safe, including
//!   opaque pass-through of tokens introduced by newer writers
//! - [`to_formula_text`]: reconstruction of infix formula text from the
//!   postfix sequence, via a caller-supplied [`Resolver`] for the
//!   workbook-owned sheet/name/function tables
//!
//! The outer record framing (FORMULA/ARRAY/SHRFMLA, CONTINUE fragments) and
//! the workbook tables themselves are deliberately out of scope; callers hand
//! in byte ranges and a resolver snapshot. Everything here is a pure,
//! synchronous transformation with no shared state.

pub mod class;
pub mod decode;
pub mod encode;
pub mod error;
pub mod field;
pub mod ftab;
pub mod render;
pub mod resolve;
pub mod token;

pub use class::{compose_ptg_id, split_ptg_id, OperandClass};
pub use decode::{decode_formula, decode_one, decode_rgce, read_rgcb};
pub use encode::{encode_one, encode_rgce, EncodedFormula};
pub use error::{DecodeError, EncodeError, InvalidOperandClass, RenderError};
pub use field::{CellCoord, ColumnField};
pub use ftab::{function_spec_from_id, function_spec_from_name, FunctionSpec, FTAB_USER_DEFINED};
pub use render::{to_formula_text, to_formula_text_with_base};
pub use resolve::{EmptyTables, Resolver, WorkbookTables};
pub use token::{ArrayGrid, ArrayValue, Ptg, Utf16Text};
