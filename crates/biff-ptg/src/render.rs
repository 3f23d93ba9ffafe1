//! Formula reconstruction: postfix token sequence to infix formula text.
//!
//! The walk keeps a stack of formatted fragments. Operands push their own
//! rendering; operators and functions pop what they consume and push the
//! combined text. The stream is already postfix, so parentheses are never
//! needed for evaluation order; the explicit parenthesis token is preserved
//! anyway so user-entered grouping survives a round-trip display.

use crate::error::RenderError;
use crate::field::{push_column_label, CellCoord, AreaFields, ColumnField, RefFields};
use crate::ftab::FTAB_USER_DEFINED;
use crate::resolve::Resolver;
use crate::token::{error_code_text, ArrayGrid, ArrayValue, Ptg, REF_ERROR_TEXT};

/// Reconstruct formula text (without a leading `=`) from a postfix token
/// sequence.
///
/// Relative (shared-formula) references are resolved against cell A1; use
/// [`to_formula_text_with_base`] when the owning cell is known.
pub fn to_formula_text(tokens: &[Ptg], resolver: &dyn Resolver) -> Result<String, RenderError> {
    to_formula_text_with_base(tokens, resolver, CellCoord::new(0, 0))
}

/// Reconstruct formula text, resolving relative references against `base`
/// (the cell that owns the formula).
pub fn to_formula_text_with_base(
    tokens: &[Ptg],
    resolver: &dyn Resolver,
    base: CellCoord,
) -> Result<String, RenderError> {
    if tokens.is_empty() {
        return Ok(String::new());
    }

    let mut stack: Vec<String> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        let pop = |stack: &mut Vec<String>| {
            stack.pop().ok_or(RenderError::StackUnderflow {
                index,
                ptg: token.base_id(),
            })
        };

        match token {
            Ptg::Exp { .. } | Ptg::Tbl { .. } => {
                return Err(RenderError::UnresolvedPlaceholder {
                    index,
                    ptg: token.base_id(),
                });
            }
            Ptg::Unknown { id, .. } => {
                return Err(RenderError::UnknownToken { index, id: *id });
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
            | Ptg::Range => {
                let rhs = pop(&mut stack)?;
                let lhs = pop(&mut stack)?;
                let op = binary_symbol(token);
                stack.push(format!("{lhs}{op}{rhs}"));
            }
            Ptg::UnaryPlus => {
                let value = pop(&mut stack)?;
                stack.push(format!("+{value}"));
            }
            Ptg::UnaryMinus => {
                let value = pop(&mut stack)?;
                stack.push(format!("-{value}"));
            }
            Ptg::Percent => {
                let value = pop(&mut stack)?;
                stack.push(format!("{value}%"));
            }
            Ptg::Paren => {
                let value = pop(&mut stack)?;
                stack.push(format!("({value})"));
            }
            Ptg::MissArg => stack.push(String::new()),

            Ptg::Str(s) => stack.push(quote_string(&s.to_text())),
            Ptg::ErrLit(code) => match error_code_text(*code) {
                Some(text) => stack.push(text.to_string()),
                None => return Err(RenderError::InvalidErrorCode { index, code: *code }),
            },
            Ptg::BoolLit(b) => stack.push(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Ptg::IntLit(n) => stack.push(n.to_string()),
            Ptg::NumLit(n) => stack.push(n.to_string()),

            Ptg::Attr(attr) => {
                if attr.is_sum() {
                    let value = pop(&mut stack)?;
                    stack.push(format!("SUM({value})"));
                }
                // Other attrs (volatile/if/choose/goto/space) are evaluation
                // hints with no textual footprint.
            }
            Ptg::MemArea { .. } | Ptg::MemErr { .. } | Ptg::MemFunc { .. } => {}

            Ptg::Ref { fields, .. } => stack.push(cell_text(fields, None)),
            Ptg::RefN { fields, .. } => stack.push(cell_text(fields, Some(base))),
            Ptg::Area { fields, .. } => stack.push(area_text(fields, None)),
            Ptg::AreaN { fields, .. } => stack.push(area_text(fields, Some(base))),
            Ptg::RefErr { .. } | Ptg::AreaErr { .. } => stack.push(REF_ERROR_TEXT.to_string()),

            Ptg::Ref3d { ixti, fields, .. } => {
                let mut out = sheet_prefix(resolver, *ixti);
                out.push_str(&cell_text(fields, None));
                stack.push(out);
            }
            Ptg::Area3d { ixti, fields, .. } => {
                let mut out = sheet_prefix(resolver, *ixti);
                out.push_str(&area_text(fields, None));
                stack.push(out);
            }
            Ptg::RefErr3d { ixti, .. } | Ptg::AreaErr3d { ixti, .. } => {
                let mut out = sheet_prefix(resolver, *ixti);
                out.push_str(REF_ERROR_TEXT);
                stack.push(out);
            }

            Ptg::Name { index: name_index, .. } => {
                let text = resolver
                    .defined_name(*name_index)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Name{name_index}"));
                stack.push(text);
            }
            Ptg::NameX {
                ixti,
                index: name_index,
                ..
            } => {
                let text = resolver
                    .external_name(*ixti, *name_index)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Name{name_index}"));
                stack.push(text);
            }

            Ptg::ArrayLit { fields, .. } => {
                let Some(grid) = &fields.grid else {
                    return Err(RenderError::MissingArrayGrid { index });
                };
                stack.push(array_text(grid, index)?);
            }

            Ptg::Func { iftab, .. } => {
                let (Some(name), Some(arity)) = (
                    resolver.function_name(*iftab),
                    resolver.function_arity(*iftab),
                ) else {
                    return Err(RenderError::UnknownFunction {
                        index,
                        iftab: *iftab,
                    });
                };
                let name = name.to_string();
                let call = pop_call(&mut stack, &name, arity as usize, index, token)?;
                stack.push(call);
            }
            Ptg::FuncVar { argc, iftab, .. } => {
                if *iftab == FTAB_USER_DEFINED {
                    // The function name travels as the call's first operand.
                    let argc = (*argc as usize).max(1);
                    let mut args = pop_n(&mut stack, argc, index, token)?;
                    let name = args.remove(0);
                    stack.push(format!("{name}({})", args.join(",")));
                } else {
                    let Some(name) = resolver.function_name(*iftab) else {
                        return Err(RenderError::UnknownFunction {
                            index,
                            iftab: *iftab,
                        });
                    };
                    let name = name.to_string();
                    let call = pop_call(&mut stack, &name, *argc as usize, index, token)?;
                    stack.push(call);
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(RenderError::StackNotSingular {
            stack_len: stack.len(),
        });
    }
    Ok(stack.remove(0))
}

fn binary_symbol(token: &Ptg) -> &'static str {
    match token {
        Ptg::Add => "+",
        Ptg::Sub => "-",
        Ptg::Mul => "*",
        Ptg::Div => "/",
        Ptg::Power => "^",
        Ptg::Concat => "&",
        Ptg::Lt => "<",
        Ptg::Le => "<=",
        Ptg::Eq => "=",
        Ptg::Ge => ">=",
        Ptg::Gt => ">",
        Ptg::Ne => "<>",
        Ptg::Intersect => " ",
        Ptg::Union => ",",
        Ptg::Range => ":",
        _ => unreachable!("not a binary operator"),
    }
}

fn pop_n(
    stack: &mut Vec<String>,
    n: usize,
    index: usize,
    token: &Ptg,
) -> Result<Vec<String>, RenderError> {
    if stack.len() < n {
        return Err(RenderError::StackUnderflow {
            index,
            ptg: token.base_id(),
        });
    }
    Ok(stack.split_off(stack.len() - n))
}

fn pop_call(
    stack: &mut Vec<String>,
    name: &str,
    argc: usize,
    index: usize,
    token: &Ptg,
) -> Result<String, RenderError> {
    let args = pop_n(stack, argc, index, token)?;
    Ok(format!("{name}({})", args.join(",")))
}

fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

// Sign-extend the 14-bit relative column offset.
fn col_offset(stored: u16) -> i32 {
    (((stored << 2) as i16) >> 2) as i32
}

fn resolved_row(row: u16, relative: bool, base: Option<CellCoord>) -> u16 {
    match (relative, base) {
        (true, Some(base)) => base.row.wrapping_add(row),
        _ => row,
    }
}

fn resolved_col(col: ColumnField, relative: bool, base: Option<CellCoord>) -> u16 {
    match (relative, base) {
        (true, Some(base)) => {
            (base.col as i32 + col_offset(col.column())).rem_euclid(0x4000) as u16
        }
        _ => col.column(),
    }
}

fn push_cell(out: &mut String, row: u16, col: ColumnField, base: Option<CellCoord>) {
    let col_rel = col.col_relative();
    let row_rel = col.row_relative();
    if !col_rel {
        out.push('$');
    }
    push_column_label(resolved_col(col, col_rel, base), out);
    if !row_rel {
        out.push('$');
    }
    let row = resolved_row(row, row_rel, base);
    out.push_str(&(row as u32 + 1).to_string());
}

fn cell_text(fields: &RefFields, base: Option<CellCoord>) -> String {
    let mut out = String::new();
    push_cell(&mut out, fields.row, fields.col, base);
    out
}

fn area_text(fields: &AreaFields, base: Option<CellCoord>) -> String {
    let mut out = String::new();
    push_cell(&mut out, fields.first_row, fields.first_col, base);
    out.push(':');
    push_cell(&mut out, fields.last_row, fields.last_col, base);
    out
}

fn sheet_needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if first.is_ascii_digit() {
        return true;
    }
    std::iter::once(first)
        .chain(chars)
        .any(|c| !(c.is_alphanumeric() || c == '_' || c == '.'))
}

fn sheet_prefix(resolver: &dyn Resolver, ixti: u16) -> String {
    let mut out = String::new();
    match resolver.sheet_name(ixti) {
        Some(name) if sheet_needs_quoting(name) => {
            out.push('\'');
            for ch in name.chars() {
                if ch == '\'' {
                    out.push('\'');
                }
                out.push(ch);
            }
            out.push('\'');
        }
        Some(name) => out.push_str(name),
        // Unresolvable extern-sheet entries display like a deleted sheet.
        None => out.push_str("#REF"),
    }
    out.push('!');
    out
}

fn array_text(grid: &ArrayGrid, index: usize) -> Result<String, RenderError> {
    let mut out = String::from("{");
    for row in 0..grid.rows {
        if row > 0 {
            out.push(';');
        }
        for col in 0..grid.cols {
            if col > 0 {
                out.push(',');
            }
            let value = grid
                .get(row, col)
                .unwrap_or(&ArrayValue::Empty);
            match value {
                ArrayValue::Empty => {}
                ArrayValue::Number(n) => out.push_str(&n.to_string()),
                ArrayValue::Text(text) => out.push_str(&quote_string(&text.to_text())),
                ArrayValue::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
                ArrayValue::Err(code) => match error_code_text(*code) {
                    Some(text) => out.push_str(text),
                    None => {
                        return Err(RenderError::InvalidErrorCode { index, code: *code });
                    }
                },
            }
        }
    }
    out.push('}');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::OperandClass;
    use crate::resolve::EmptyTables;
    use pretty_assertions::assert_eq;

    fn rel_ref(row: u16, col: u16) -> Ptg {
        Ptg::Ref {
            class: OperandClass::Value,
            fields: RefFields {
                row,
                col: ColumnField::new(col, true, true),
            },
        }
    }

    #[test]
    fn binary_precedence_is_irrelevant_in_postfix_order() {
        // A1 B2 3 * +  ->  A1+B2*3
        let tokens = [
            rel_ref(0, 0),
            rel_ref(1, 1),
            Ptg::IntLit(3),
            Ptg::Mul,
            Ptg::Add,
        ];
        let text = to_formula_text(&tokens, &EmptyTables).expect("render");
        assert_eq!(text, "A1+B2*3");
    }

    #[test]
    fn parenthesis_token_preserves_user_grouping() {
        let tokens = [rel_ref(0, 0), Ptg::Paren];
        assert_eq!(to_formula_text(&tokens, &EmptyTables).expect("render"), "(A1)");
    }

    #[test]
    fn absolute_flags_render_dollar_markers() {
        let tokens = [Ptg::Ref {
            class: OperandClass::Reference,
            fields: RefFields {
                row: 2,
                col: ColumnField::new(1, false, true),
            },
        }];
        // Row absolute, column relative.
        assert_eq!(to_formula_text(&tokens, &EmptyTables).expect("render"), "B$3");
    }

    #[test]
    fn stack_underflow_is_reported_not_panicked() {
        let err = to_formula_text(&[Ptg::Add], &EmptyTables).unwrap_err();
        assert_eq!(err, RenderError::StackUnderflow { index: 0, ptg: 0x03 });
    }

    #[test]
    fn leftover_operands_are_malformed() {
        let tokens = [Ptg::IntLit(1), Ptg::IntLit(2)];
        let err = to_formula_text(&tokens, &EmptyTables).unwrap_err();
        assert_eq!(err, RenderError::StackNotSingular { stack_len: 2 });
    }

    #[test]
    fn optimized_sum_attr_renders_as_sum_call() {
        let tokens = [
            rel_ref(0, 0),
            Ptg::Attr(crate::token::AttrFields {
                grbit: crate::token::ATTR_SUM,
                w_attr: 0,
                choose_table: Vec::new(),
            }),
        ];
        assert_eq!(
            to_formula_text(&tokens, &EmptyTables).expect("render"),
            "SUM(A1)"
        );
    }

    #[test]
    fn string_literals_double_embedded_quotes() {
        let tokens = [Ptg::Str(crate::token::Utf16Text::from_text("say \"hi\""))];
        assert_eq!(
            to_formula_text(&tokens, &EmptyTables).expect("render"),
            "\"say \"\"hi\"\"\""
        );
    }
}
