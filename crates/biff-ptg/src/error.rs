//! Error types for decoding, encoding, and formula reconstruction.
//!
//! Everything is returned as a typed result; nothing is retried internally.
//! Unknown identity bytes are deliberately *not* errors (they round-trip as
//! opaque tokens); truncation, malformed postfix streams, and migration
//! placeholders reaching encode/render are.

use thiserror::Error;

use crate::class::OperandClass;

/// Structured decode failure with ptg id + byte offset, so callers can point
/// at the exact spot in the raw stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not enough bytes remained in the token stream for the current token.
    #[error("unexpected end of stream decoding ptg=0x{ptg:02X} at offset {offset} (needed {needed} bytes, {remaining} remaining)")]
    TruncatedInput {
        offset: usize,
        ptg: u8,
        needed: usize,
        remaining: usize,
    },
    /// The trailing (out-of-band) array data ran out before every pending
    /// array grid was filled.
    #[error("trailing array data exhausted at offset {offset} (needed {needed} bytes, {remaining} remaining)")]
    TruncatedArrayData {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    /// An array constant cell used a type byte we do not recognize.
    #[error("invalid array constant type 0x{value:02X} at trailing-data offset {offset}")]
    InvalidConstant { offset: usize, value: u8 },
    /// More trailing array data was supplied than the pending grids consume.
    #[error("{extra} unread bytes remain after filling all array grids")]
    TrailingArrayData { extra: usize },
    /// The enclosing record declared more rgce bytes than it actually holds.
    #[error("record shorter than its declared token stream (declared {declared} bytes, actual {actual})")]
    TruncatedRecord { declared: usize, actual: usize },
}

/// Encode failure. Encoding is total for every token the decoder can
/// produce; the failures are contract violations by token-building callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A migration-only placeholder token (`PtgExp`/`PtgTbl`) reached the byte
    /// writer. The formula should have been rewritten into a direct token
    /// sequence before this point; this is fatal by design.
    #[error("unresolved migration placeholder ptg=0x{ptg:02X} reached the encoder")]
    UnresolvedPlaceholder { ptg: u8 },
    /// An array token still has its grid pending (first-pass decode only).
    #[error("array token is missing its grid; two-phase decode was not completed")]
    MissingArrayGrid,
    /// A string payload does not fit its length field (u8 for string
    /// literals, u16 for array-grid cells).
    #[error("string of {len} UTF-16 units exceeds the {max}-unit length field")]
    StringTooLong { len: usize, max: usize },
    /// An array grid's extent cannot be stored in the biased cols-1/rows-1
    /// fields (cols 1..=256, rows 1..=65536).
    #[error("array grid extent {cols}x{rows} is outside 1..=256 x 1..=65536")]
    GridExtentOutOfRange { cols: u16, rows: u32 },
    /// An array grid's cell vector disagrees with its declared extent.
    #[error("array grid holds {actual} cells but its extent declares {expected}")]
    GridShapeMismatch { expected: usize, actual: usize },
}

/// A token kind was asked to carry an operand class it cannot represent.
/// Returned by [`crate::token::Ptg::with_class`]; the token model keeps
/// classes off unclassable kinds, so this never arises during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ptg base 0x{base:02X} is not classable and cannot carry {class:?}")]
pub struct InvalidOperandClass {
    pub base: u8,
    pub class: OperandClass,
}

/// Formula reconstruction failure.
///
/// The stack-shape variants (`StackUnderflow`, `StackNotSingular`) report a
/// malformed postfix stream; the rest are contract or context gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    /// An operator/function token did not find enough operands below it.
    #[error("malformed formula: operand stack underflow at token #{index} (ptg=0x{ptg:02X})")]
    StackUnderflow { index: usize, ptg: u8 },
    /// The walk ended with a stack size other than one.
    #[error("malformed formula: {stack_len} values left on the operand stack (expected 1)")]
    StackNotSingular { stack_len: usize },
    /// A migration-only placeholder token reached the reconstructor; fatal by
    /// design, mirroring [`EncodeError::UnresolvedPlaceholder`].
    #[error("unresolved migration placeholder ptg=0x{ptg:02X} at token #{index} reached the reconstructor")]
    UnresolvedPlaceholder { index: usize, ptg: u8 },
    /// An opaque unknown token has no textual rendering.
    #[error("unknown ptg=0x{id:02X} at token #{index} cannot be rendered")]
    UnknownToken { index: usize, id: u8 },
    /// A fixed-arity function id is not in the function table, so its arity
    /// (and name) cannot be determined.
    #[error("no function table entry for iftab={iftab} at token #{index}")]
    UnknownFunction { index: usize, iftab: u16 },
    /// An array token still has its grid pending (first-pass decode only).
    #[error("array token #{index} is missing its grid; two-phase decode was not completed")]
    MissingArrayGrid { index: usize },
    /// An error literal carried a code Excel does not define.
    #[error("invalid error code 0x{code:02X} at token #{index}")]
    InvalidErrorCode { index: usize, code: u8 },
}
