//! Token stream encoding.
//!
//! Every variant writes its own bytes; the identity byte is always recomposed
//! as `base + class offset`, even though class and base live in separate
//! fields in memory. Array grids are emitted into a separate trailing buffer
//! ([`EncodedFormula::rgcb`]) mirroring the two-phase read path.

use crate::class::{compose_ptg_id, OperandClass};
use crate::error::EncodeError;
use crate::field::{encode_row, AreaFields, RefFields};
use crate::token::{ArrayGrid, ArrayValue, Ptg};

const STR_FLAG_HIGH_BYTE: u8 = 0x01;

const SER_NIL: u8 = 0x00;
const SER_NUM: u8 = 0x01;
const SER_STR: u8 = 0x02;
const SER_BOOL: u8 = 0x04;
const SER_ERR: u8 = 0x10;

/// A formula encoded back to record-ready bytes: the token stream and the
/// trailing out-of-band array data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedFormula {
    pub rgce: Vec<u8>,
    pub rgcb: Vec<u8>,
}

impl EncodedFormula {
    /// Total declared size of the enclosing formula payload.
    pub fn total_len(&self) -> usize {
        self.rgce.len() + self.rgcb.len()
    }

    /// The two buffers concatenated, as stored in a record.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        out.extend_from_slice(&self.rgce);
        out.extend_from_slice(&self.rgcb);
        out
    }
}

fn push_ref_fields(out: &mut Vec<u8>, fields: &RefFields) {
    out.extend_from_slice(&encode_row(fields.row).to_le_bytes());
    out.extend_from_slice(&fields.col.raw().to_le_bytes());
}

fn push_area_fields(out: &mut Vec<u8>, fields: &AreaFields) {
    out.extend_from_slice(&encode_row(fields.first_row).to_le_bytes());
    out.extend_from_slice(&encode_row(fields.last_row).to_le_bytes());
    out.extend_from_slice(&fields.first_col.raw().to_le_bytes());
    out.extend_from_slice(&fields.last_col.raw().to_le_bytes());
}

fn classed_id(token: &Ptg, class: OperandClass) -> u8 {
    compose_ptg_id(token.base_id(), class)
}

/// Encode one token into `rgce`, appending any out-of-band grid to `rgcb`.
///
/// Returns the number of in-stream bytes written (always equal to
/// [`Ptg::encoded_size`]).
pub fn encode_one(
    token: &Ptg,
    rgce: &mut Vec<u8>,
    rgcb: &mut Vec<u8>,
) -> Result<usize, EncodeError> {
    let start = rgce.len();
    match token {
        Ptg::Exp { .. } | Ptg::Tbl { .. } => {
            return Err(EncodeError::UnresolvedPlaceholder {
                ptg: token.base_id(),
            });
        }

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
        | Ptg::MissArg => rgce.push(token.base_id()),

        Ptg::Str(s) => {
            let units = s.units();
            if units.len() > u8::MAX as usize {
                return Err(EncodeError::StringTooLong {
                    len: units.len(),
                    max: u8::MAX as usize,
                });
            }
            rgce.push(token.base_id());
            rgce.push(units.len() as u8);
            if s.is_wide() {
                rgce.push(STR_FLAG_HIGH_BYTE);
                for unit in units {
                    rgce.extend_from_slice(&unit.to_le_bytes());
                }
            } else {
                rgce.push(0x00);
                for &unit in units {
                    rgce.push(unit as u8);
                }
            }
        }
        Ptg::Attr(attr) => {
            rgce.push(token.base_id());
            rgce.push(attr.grbit);
            rgce.extend_from_slice(&attr.w_attr.to_le_bytes());
            for entry in &attr.choose_table {
                rgce.extend_from_slice(&entry.to_le_bytes());
            }
        }
        Ptg::ErrLit(code) => {
            rgce.push(token.base_id());
            rgce.push(*code);
        }
        Ptg::BoolLit(b) => {
            rgce.push(token.base_id());
            rgce.push(*b as u8);
        }
        Ptg::IntLit(n) => {
            rgce.push(token.base_id());
            rgce.extend_from_slice(&n.to_le_bytes());
        }
        Ptg::NumLit(n) => {
            rgce.push(token.base_id());
            rgce.extend_from_slice(&n.to_le_bytes());
        }

        Ptg::ArrayLit { class, fields } => {
            let Some(grid) = &fields.grid else {
                return Err(EncodeError::MissingArrayGrid);
            };
            check_array_grid(grid)?;
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&fields.reserved);
            rgce.extend_from_slice(&fields.cce.to_le_bytes());
            push_array_grid(rgcb, grid);
        }
        Ptg::Func { class, iftab } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&iftab.to_le_bytes());
        }
        Ptg::FuncVar { class, argc, iftab } => {
            rgce.push(classed_id(token, *class));
            rgce.push(*argc);
            rgce.extend_from_slice(&iftab.to_le_bytes());
        }
        Ptg::Name {
            class,
            index,
            reserved,
        } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&index.to_le_bytes());
            rgce.extend_from_slice(&reserved.to_le_bytes());
        }
        Ptg::NameX {
            class,
            ixti,
            index,
            reserved,
        } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&ixti.to_le_bytes());
            rgce.extend_from_slice(&index.to_le_bytes());
            rgce.extend_from_slice(&reserved.to_le_bytes());
        }
        Ptg::Ref { class, fields } | Ptg::RefN { class, fields } => {
            rgce.push(classed_id(token, *class));
            push_ref_fields(rgce, fields);
        }
        Ptg::Area { class, fields } | Ptg::AreaN { class, fields } => {
            rgce.push(classed_id(token, *class));
            push_area_fields(rgce, fields);
        }
        Ptg::RefErr { class, raw } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(raw);
        }
        Ptg::AreaErr { class, raw } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(raw);
        }
        Ptg::MemArea {
            class,
            reserved,
            cce,
        }
        | Ptg::MemErr {
            class,
            reserved,
            cce,
        } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&reserved.to_le_bytes());
            rgce.extend_from_slice(&cce.to_le_bytes());
        }
        Ptg::MemFunc { class, cce } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&cce.to_le_bytes());
        }
        Ptg::Ref3d {
            class,
            ixti,
            fields,
        } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&ixti.to_le_bytes());
            push_ref_fields(rgce, fields);
        }
        Ptg::Area3d {
            class,
            ixti,
            fields,
        } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&ixti.to_le_bytes());
            push_area_fields(rgce, fields);
        }
        Ptg::RefErr3d { class, ixti, raw } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&ixti.to_le_bytes());
            rgce.extend_from_slice(raw);
        }
        Ptg::AreaErr3d { class, ixti, raw } => {
            rgce.push(classed_id(token, *class));
            rgce.extend_from_slice(&ixti.to_le_bytes());
            rgce.extend_from_slice(raw);
        }

        Ptg::Unknown { id, data } => {
            rgce.push(*id);
            rgce.extend_from_slice(data);
        }
    }

    let written = rgce.len() - start;
    debug_assert_eq!(written, token.encoded_size());
    Ok(written)
}

// Everything the grid writer could reject, checked up front so a failing
// token leaves both output buffers untouched.
fn check_array_grid(grid: &ArrayGrid) -> Result<(), EncodeError> {
    let extent_ok = (1..=256).contains(&(grid.cols as u32)) && (1..=65536).contains(&grid.rows);
    if !extent_ok {
        return Err(EncodeError::GridExtentOutOfRange {
            cols: grid.cols,
            rows: grid.rows,
        });
    }
    let expected = grid.cols as usize * grid.rows as usize;
    if grid.values.len() != expected {
        return Err(EncodeError::GridShapeMismatch {
            expected,
            actual: grid.values.len(),
        });
    }
    for value in &grid.values {
        if let ArrayValue::Text(text) = value {
            if text.units().len() > u16::MAX as usize {
                return Err(EncodeError::StringTooLong {
                    len: text.units().len(),
                    max: u16::MAX as usize,
                });
            }
        }
    }
    Ok(())
}

fn push_array_grid(rgcb: &mut Vec<u8>, grid: &ArrayGrid) {
    rgcb.push((grid.cols - 1) as u8);
    rgcb.extend_from_slice(&((grid.rows - 1) as u16).to_le_bytes());
    for value in &grid.values {
        push_array_value(rgcb, value);
    }
}

fn push_array_value(rgcb: &mut Vec<u8>, value: &ArrayValue) {
    match value {
        ArrayValue::Empty => {
            rgcb.push(SER_NIL);
            rgcb.extend_from_slice(&[0u8; 8]);
        }
        ArrayValue::Number(n) => {
            rgcb.push(SER_NUM);
            rgcb.extend_from_slice(&n.to_le_bytes());
        }
        ArrayValue::Text(text) => {
            rgcb.push(SER_STR);
            let units = text.units();
            rgcb.extend_from_slice(&(units.len() as u16).to_le_bytes());
            if text.is_wide() {
                rgcb.push(STR_FLAG_HIGH_BYTE);
                for unit in units {
                    rgcb.extend_from_slice(&unit.to_le_bytes());
                }
            } else {
                rgcb.push(0x00);
                for &unit in units {
                    rgcb.push(unit as u8);
                }
            }
        }
        ArrayValue::Bool(b) => {
            rgcb.push(SER_BOOL);
            rgcb.push(*b as u8);
            rgcb.extend_from_slice(&[0u8; 7]);
        }
        ArrayValue::Err(code) => {
            rgcb.push(SER_ERR);
            rgcb.push(*code);
            rgcb.extend_from_slice(&[0u8; 7]);
        }
    }
}

/// Encode a full token sequence into its `rgce` and trailing `rgcb` buffers.
pub fn encode_rgce(tokens: &[Ptg]) -> Result<EncodedFormula, EncodeError> {
    let mut out = EncodedFormula::default();
    for token in tokens {
        encode_one(token, &mut out.rgce, &mut out.rgcb)?;
    }
    Ok(out)
}
