//! Token stream decoding.
//!
//! Decoding is two-phase. The first pass ([`decode_rgce`]) walks the postfix
//! token stream one identity byte at a time; array-literal tokens contribute
//! only their fixed in-stream header and leave their grid pending. The second
//! pass ([`read_rgcb`]) consumes the trailing bytes of the enclosing record
//! and fills each pending grid in token order.
//!
//! Identity bytes with no known mapping are preserved opaquely as
//! [`Ptg::Unknown`] rather than failing; real-world files contain tokens
//! introduced by newer writers, and the outer layer decides whether lossless
//! pass-through is acceptable.

use log::debug;

use crate::class::{split_ptg_id, OperandClass};
use crate::error::DecodeError;
use crate::field::{AreaFields, ColumnField, RefFields};
use crate::token::{
    ArrayFields, ArrayGrid, ArrayValue, AttrFields, Ptg, Utf16Text, ATTR_CHOOSE, PTG_ADD, PTG_AREA,
    PTG_AREA_3D, PTG_AREA_ERR, PTG_AREA_ERR_3D, PTG_AREA_N, PTG_ARRAY, PTG_ATTR, PTG_BOOL,
    PTG_CONCAT, PTG_DIV, PTG_EQ, PTG_ERR, PTG_EXP, PTG_FUNC, PTG_FUNC_VAR, PTG_GE, PTG_GT,
    PTG_INT, PTG_ISECT, PTG_LE, PTG_LT, PTG_MEM_AREA, PTG_MEM_ERR, PTG_MEM_FUNC, PTG_MISSARG,
    PTG_MUL, PTG_NAME, PTG_NAME_X, PTG_NE, PTG_NUM, PTG_PAREN, PTG_PERCENT, PTG_POWER, PTG_RANGE,
    PTG_REF, PTG_REF_3D, PTG_REF_ERR, PTG_REF_ERR_3D, PTG_REF_N, PTG_STR, PTG_SUB, PTG_TBL,
    PTG_UMINUS, PTG_UNION, PTG_UPLUS,
};

// ShortXLUnicodeString option flag: characters are UTF-16 code units.
const STR_FLAG_HIGH_BYTE: u8 = 0x01;

// Array constant type bytes (SerAr). Nil/number/bool/error occupy 8 bytes
// after the type byte; strings are variable-length.
const SER_NIL: u8 = 0x00;
const SER_NUM: u8 = 0x01;
const SER_STR: u8 = 0x02;
const SER_BOOL: u8 = 0x04;
const SER_ERR: u8 = 0x10;

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, ptg: u8, token_offset: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::TruncatedInput {
                offset: token_offset,
                ptg,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self, ptg: u8, token_offset: usize) -> Result<u8, DecodeError> {
        Ok(self.take(1, ptg, token_offset)?[0])
    }

    fn u16(&mut self, ptg: u8, token_offset: usize) -> Result<u16, DecodeError> {
        let b = self.take(2, ptg, token_offset)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, ptg: u8, token_offset: usize) -> Result<u32, DecodeError> {
        let b = self.take(4, ptg, token_offset)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f64(&mut self, ptg: u8, token_offset: usize) -> Result<f64, DecodeError> {
        let b = self.take(8, ptg, token_offset)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(f64::from_le_bytes(buf))
    }
}

fn read_ref_fields(r: &mut Reader<'_>, ptg: u8, at: usize) -> Result<RefFields, DecodeError> {
    let row = r.u16(ptg, at)?;
    let col = ColumnField::from_raw(r.u16(ptg, at)?);
    Ok(RefFields { row, col })
}

fn read_area_fields(r: &mut Reader<'_>, ptg: u8, at: usize) -> Result<AreaFields, DecodeError> {
    let first_row = r.u16(ptg, at)?;
    let last_row = r.u16(ptg, at)?;
    let first_col = ColumnField::from_raw(r.u16(ptg, at)?);
    let last_col = ColumnField::from_raw(r.u16(ptg, at)?);
    Ok(AreaFields {
        first_row,
        last_row,
        first_col,
        last_col,
    })
}

/// Decode one token starting at `offset`.
///
/// Returns the token and the number of bytes consumed. Unknown identity bytes
/// swallow the remainder of the buffer (their length cannot be known) and are
/// preserved verbatim.
pub fn decode_one(data: &[u8], offset: usize) -> Result<(Ptg, usize), DecodeError> {
    let mut r = Reader::new(data);
    r.pos = offset;
    let at = offset;

    let id = r.u8(0x00, at)?;
    let Some((base, class)) = split_ptg_id(id) else {
        return Ok(unknown_rest(id, &mut r, at));
    };

    let token = match base {
        PTG_EXP | PTG_TBL => {
            let base_row = r.u16(id, at)?;
            let base_col = r.u16(id, at)?;
            if base == PTG_EXP {
                Ptg::Exp { base_row, base_col }
            } else {
                Ptg::Tbl { base_row, base_col }
            }
        }
        PTG_ADD => Ptg::Add,
        PTG_SUB => Ptg::Sub,
        PTG_MUL => Ptg::Mul,
        PTG_DIV => Ptg::Div,
        PTG_POWER => Ptg::Power,
        PTG_CONCAT => Ptg::Concat,
        PTG_LT => Ptg::Lt,
        PTG_LE => Ptg::Le,
        PTG_EQ => Ptg::Eq,
        PTG_GE => Ptg::Ge,
        PTG_GT => Ptg::Gt,
        PTG_NE => Ptg::Ne,
        PTG_ISECT => Ptg::Intersect,
        PTG_UNION => Ptg::Union,
        PTG_RANGE => Ptg::Range,
        PTG_UPLUS => Ptg::UnaryPlus,
        PTG_UMINUS => Ptg::UnaryMinus,
        PTG_PERCENT => Ptg::Percent,
        PTG_PAREN => Ptg::Paren,
        PTG_MISSARG => Ptg::MissArg,
        PTG_STR => {
            // ShortXLUnicodeString: cch (u8) + option flags (u8) + characters.
            let cch = r.u8(id, at)? as usize;
            let flags = r.u8(id, at)?;
            let wide = flags & STR_FLAG_HIGH_BYTE != 0;
            if wide {
                let raw = r.take(cch * 2, id, at)?;
                let units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                Ptg::Str(Utf16Text::new(units, true))
            } else {
                let raw = r.take(cch, id, at)?;
                let units: Vec<u16> = raw.iter().map(|&b| b as u16).collect();
                Ptg::Str(Utf16Text::new(units, false))
            }
        }
        PTG_ATTR => {
            let grbit = r.u8(id, at)?;
            let w_attr = r.u16(id, at)?;
            let choose_table = if grbit & ATTR_CHOOSE != 0 {
                let mut table = Vec::with_capacity(w_attr as usize);
                for _ in 0..w_attr {
                    table.push(r.u16(id, at)?);
                }
                table
            } else {
                Vec::new()
            };
            Ptg::Attr(AttrFields {
                grbit,
                w_attr,
                choose_table,
            })
        }
        PTG_ERR => Ptg::ErrLit(r.u8(id, at)?),
        PTG_BOOL => Ptg::BoolLit(r.u8(id, at)? != 0),
        PTG_INT => Ptg::IntLit(r.u16(id, at)?),
        PTG_NUM => Ptg::NumLit(r.f64(id, at)?),
        _ => {
            let Some(class) = class else {
                // Control-range id with no mapped kind (0x18, 0x1A, 0x1B, ...).
                return Ok(unknown_rest(id, &mut r, at));
            };
            match decode_classed(&mut r, base, class, id, at)? {
                Some(token) => token,
                None => return Ok(unknown_rest(id, &mut r, at)),
            }
        }
    };

    Ok((token, r.pos - offset))
}

/// Decode a classed operand kind; `None` means the base id has no mapping.
fn decode_classed(
    r: &mut Reader<'_>,
    base: u8,
    class: OperandClass,
    id: u8,
    at: usize,
) -> Result<Option<Ptg>, DecodeError> {
    let token = match base {
        PTG_ARRAY => {
            let header = r.take(5, id, at)?;
            let mut reserved = [0u8; 5];
            reserved.copy_from_slice(header);
            let cce = r.u16(id, at)?;
            Ptg::ArrayLit {
                class,
                fields: ArrayFields {
                    reserved,
                    cce,
                    grid: None,
                },
            }
        }
        PTG_FUNC => Ptg::Func {
            class,
            iftab: r.u16(id, at)?,
        },
        PTG_FUNC_VAR => {
            let argc = r.u8(id, at)?;
            let iftab = r.u16(id, at)?;
            Ptg::FuncVar { class, argc, iftab }
        }
        PTG_NAME => {
            let index = r.u16(id, at)?;
            let reserved = r.u16(id, at)?;
            Ptg::Name {
                class,
                index,
                reserved,
            }
        }
        PTG_NAME_X => {
            let ixti = r.u16(id, at)?;
            let index = r.u16(id, at)?;
            let reserved = r.u16(id, at)?;
            Ptg::NameX {
                class,
                ixti,
                index,
                reserved,
            }
        }
        PTG_REF => Ptg::Ref {
            class,
            fields: read_ref_fields(r, id, at)?,
        },
        PTG_AREA => Ptg::Area {
            class,
            fields: read_area_fields(r, id, at)?,
        },
        PTG_REF_N => Ptg::RefN {
            class,
            fields: read_ref_fields(r, id, at)?,
        },
        PTG_AREA_N => Ptg::AreaN {
            class,
            fields: read_area_fields(r, id, at)?,
        },
        PTG_REF_ERR => {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(r.take(4, id, at)?);
            Ptg::RefErr { class, raw }
        }
        PTG_AREA_ERR => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(r.take(8, id, at)?);
            Ptg::AreaErr { class, raw }
        }
        PTG_MEM_AREA | PTG_MEM_ERR => {
            let reserved = r.u32(id, at)?;
            let cce = r.u16(id, at)?;
            if base == PTG_MEM_AREA {
                Ptg::MemArea {
                    class,
                    reserved,
                    cce,
                }
            } else {
                Ptg::MemErr {
                    class,
                    reserved,
                    cce,
                }
            }
        }
        PTG_MEM_FUNC => Ptg::MemFunc {
            class,
            cce: r.u16(id, at)?,
        },
        PTG_REF_3D => {
            let ixti = r.u16(id, at)?;
            Ptg::Ref3d {
                class,
                ixti,
                fields: read_ref_fields(r, id, at)?,
            }
        }
        PTG_AREA_3D => {
            let ixti = r.u16(id, at)?;
            Ptg::Area3d {
                class,
                ixti,
                fields: read_area_fields(r, id, at)?,
            }
        }
        PTG_REF_ERR_3D => {
            let ixti = r.u16(id, at)?;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(r.take(4, id, at)?);
            Ptg::RefErr3d { class, ixti, raw }
        }
        PTG_AREA_ERR_3D => {
            let ixti = r.u16(id, at)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(r.take(8, id, at)?);
            Ptg::AreaErr3d { class, ixti, raw }
        }
        _ => return Ok(None),
    };
    Ok(Some(token))
}

fn unknown_rest(id: u8, r: &mut Reader<'_>, at: usize) -> (Ptg, usize) {
    debug!("preserving unknown ptg=0x{id:02X} at offset {at} ({} trailing bytes)", r.remaining());
    let data = r.data[r.pos..].to_vec();
    let consumed = 1 + data.len();
    r.pos = r.data.len();
    (Ptg::Unknown { id, data }, consumed)
}

/// First pass: decode a complete `rgce` buffer into its token sequence.
pub fn decode_rgce(rgce: &[u8]) -> Result<Vec<Ptg>, DecodeError> {
    let mut tokens = Vec::new();
    let mut offset = 0usize;
    while offset < rgce.len() {
        let (token, consumed) = decode_one(rgce, offset)?;
        debug_assert_eq!(consumed, token.encoded_size());
        tokens.push(token);
        offset += consumed;
    }
    Ok(tokens)
}

/// Second pass: fill every pending array grid from the trailing (`rgcb`)
/// bytes of the enclosing record, in token order.
///
/// Returns the number of trailing bytes consumed. Exhausting the buffer
/// mid-grid is [`DecodeError::TruncatedArrayData`]; leftover bytes after all
/// grids are filled are [`DecodeError::TrailingArrayData`]. Neither produces a
/// partial result.
pub fn read_rgcb(tokens: &mut [Ptg], rgcb: &[u8]) -> Result<usize, DecodeError> {
    let mut r = Reader::new(rgcb);

    for token in tokens.iter_mut() {
        if let Ptg::ArrayLit { fields, .. } = token {
            if fields.grid.is_none() {
                fields.grid = Some(read_array_grid(&mut r)?);
            }
        }
    }

    if r.remaining() > 0 {
        return Err(DecodeError::TrailingArrayData {
            extra: r.remaining(),
        });
    }
    Ok(r.pos)
}

fn array_truncated(r: &Reader<'_>, needed: usize) -> DecodeError {
    DecodeError::TruncatedArrayData {
        offset: r.pos,
        needed,
        remaining: r.remaining(),
    }
}

fn read_array_grid(r: &mut Reader<'_>) -> Result<ArrayGrid, DecodeError> {
    // Extent is stored biased: cols-1 (u8), rows-1 (u16).
    if r.remaining() < 3 {
        return Err(array_truncated(r, 3));
    }
    let cols = r.data[r.pos] as u16 + 1;
    let rows = u16::from_le_bytes([r.data[r.pos + 1], r.data[r.pos + 2]]) as u32 + 1;
    r.pos += 3;

    let count = cols as usize * rows as usize;
    // The extent bytes are untrusted; the smallest cell is 4 bytes, so never
    // reserve more than the buffer could actually hold.
    let mut values = Vec::with_capacity(count.min(r.remaining() / 4));
    for _ in 0..count {
        values.push(read_array_value(r)?);
    }

    Ok(ArrayGrid { cols, rows, values })
}

fn read_array_value(r: &mut Reader<'_>) -> Result<ArrayValue, DecodeError> {
    let type_offset = r.pos;
    if r.remaining() < 1 {
        return Err(array_truncated(r, 1));
    }
    let ty = r.data[r.pos];
    r.pos += 1;

    match ty {
        SER_NIL => {
            if r.remaining() < 8 {
                return Err(array_truncated(r, 8));
            }
            r.pos += 8;
            Ok(ArrayValue::Empty)
        }
        SER_NUM => {
            if r.remaining() < 8 {
                return Err(array_truncated(r, 8));
            }
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&r.data[r.pos..r.pos + 8]);
            r.pos += 8;
            Ok(ArrayValue::Number(f64::from_le_bytes(buf)))
        }
        SER_STR => {
            // XLUnicodeString: cch (u16) + option flags (u8) + characters.
            if r.remaining() < 3 {
                return Err(array_truncated(r, 3));
            }
            let cch = u16::from_le_bytes([r.data[r.pos], r.data[r.pos + 1]]) as usize;
            let flags = r.data[r.pos + 2];
            r.pos += 3;

            if flags & STR_FLAG_HIGH_BYTE != 0 {
                if r.remaining() < cch * 2 {
                    return Err(array_truncated(r, cch * 2));
                }
                let units: Vec<u16> = r.data[r.pos..r.pos + cch * 2]
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                r.pos += cch * 2;
                Ok(ArrayValue::Text(Utf16Text::new(units, true)))
            } else {
                if r.remaining() < cch {
                    return Err(array_truncated(r, cch));
                }
                let units: Vec<u16> = r.data[r.pos..r.pos + cch]
                    .iter()
                    .map(|&b| b as u16)
                    .collect();
                r.pos += cch;
                Ok(ArrayValue::Text(Utf16Text::new(units, false)))
            }
        }
        SER_BOOL | SER_ERR => {
            if r.remaining() < 8 {
                return Err(array_truncated(r, 8));
            }
            let value = r.data[r.pos];
            r.pos += 8;
            if ty == SER_BOOL {
                Ok(ArrayValue::Bool(value != 0))
            } else {
                Ok(ArrayValue::Err(value))
            }
        }
        _ => Err(DecodeError::InvalidConstant {
            offset: type_offset,
            value: ty,
        }),
    }
}

/// Convenience for record-shaped input: the buffer holds `cce` bytes of token
/// stream followed by the out-of-band array data. Runs both passes.
pub fn decode_formula(data: &[u8], cce: usize) -> Result<Vec<Ptg>, DecodeError> {
    if data.len() < cce {
        return Err(DecodeError::TruncatedRecord {
            declared: cce,
            actual: data.len(),
        });
    }
    let (rgce, rgcb) = data.split_at(cce);
    let mut tokens = decode_rgce(rgce)?;
    read_rgcb(&mut tokens, rgcb)?;
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_identity_byte_preserves_trailing_bytes() {
        let bytes = [0x8Au8, 0xDE, 0xAD, 0xBE];
        let (token, consumed) = decode_one(&bytes, 0).expect("decode");
        assert_eq!(consumed, 4);
        assert_eq!(
            token,
            Ptg::Unknown {
                id: 0x8A,
                data: vec![0xDE, 0xAD, 0xBE],
            }
        );
    }

    #[test]
    fn truncated_fixed_size_token_reports_ptg_and_offset() {
        // PtgNum needs 8 payload bytes; give it 3.
        let bytes = [0x1Fu8, 0x00, 0x00, 0x00];
        let err = decode_one(&bytes, 0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedInput {
                offset: 0,
                ptg: 0x1F,
                needed: 8,
                remaining: 3,
            }
        );
    }

    #[test]
    fn consumed_bytes_match_encoded_size_for_a_mixed_stream() {
        // A1 (PtgRef, relative) then 3 (PtgInt) then multiply.
        let mut rgce = Vec::new();
        rgce.extend_from_slice(&[0x44, 0x00, 0x00, 0x00, 0xC0]); // value-class PtgRef A1
        rgce.extend_from_slice(&[0x1E, 0x03, 0x00]);
        rgce.push(0x05);

        let tokens = decode_rgce(&rgce).expect("decode");
        assert_eq!(tokens.len(), 3);
        let total: usize = tokens.iter().map(|t| t.encoded_size()).sum();
        assert_eq!(total, rgce.len());
        assert_eq!(tokens[0].class(), Some(OperandClass::Value));
    }

    #[test]
    fn attr_choose_jump_table_is_consumed_and_preserved() {
        let rgce = [0x19u8, 0x04, 0x02, 0x00, 0x08, 0x00, 0x10, 0x00];
        let (token, consumed) = decode_one(&rgce, 0).expect("decode");
        assert_eq!(consumed, rgce.len());
        assert_eq!(
            token,
            Ptg::Attr(AttrFields {
                grbit: 0x04,
                w_attr: 2,
                choose_table: vec![8, 16],
            })
        );
    }
}
