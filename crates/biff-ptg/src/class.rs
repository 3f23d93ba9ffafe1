//! Operand-class arithmetic for serialized ptg identity bytes.
//!
//! BIFF folds a 2-bit "operand class" into the identity byte of every operand
//! token: `serialized = base + offset`, where the offset is `0x00` (reference),
//! `0x20` (value), or `0x40` (array). Operator and control tokens live below
//! `0x20` and never carry a class. This module is pure arithmetic; no I/O.

/// Contextual evaluation class of an operand token.
///
/// The class is metadata assigned when the formula was tokenized; it is not
/// derivable from the token's payload and must survive decode/encode/clone
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    Reference,
    Value,
    Array,
}

impl OperandClass {
    /// Offset added to a classable base id when serializing.
    pub const fn offset(self) -> u8 {
        match self {
            OperandClass::Reference => 0x00,
            OperandClass::Value => 0x20,
            OperandClass::Array => 0x40,
        }
    }

    pub const ALL: [OperandClass; 3] = [
        OperandClass::Reference,
        OperandClass::Value,
        OperandClass::Array,
    ];
}

/// First base id that carries an operand class.
pub const CLASSED_BASE_MIN: u8 = 0x20;
/// Last base id that carries an operand class.
pub const CLASSED_BASE_MAX: u8 = 0x3F;

/// Split a serialized ptg identity byte into `(base, class)`.
///
/// Ids `0x00..=0x1F` are operators/controls with no class. Ids `>= 0x80` have
/// no legal decomposition and are reported as `None` so callers can preserve
/// them opaquely.
pub fn split_ptg_id(id: u8) -> Option<(u8, Option<OperandClass>)> {
    match id {
        0x00..=0x1F => Some((id, None)),
        0x20..=0x3F => Some((id, Some(OperandClass::Reference))),
        0x40..=0x5F => Some((id - 0x20, Some(OperandClass::Value))),
        0x60..=0x7F => Some((id - 0x40, Some(OperandClass::Array))),
        _ => None,
    }
}

/// Compose a serialized identity byte from a classable base id and a class.
///
/// The caller must pass a base in `CLASSED_BASE_MIN..=CLASSED_BASE_MAX`; the
/// token layer enforces this before calling.
pub fn compose_ptg_id(base: u8, class: OperandClass) -> u8 {
    debug_assert!((CLASSED_BASE_MIN..=CLASSED_BASE_MAX).contains(&base));
    base + class.offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decomposition_is_inverse_of_composition_for_all_classed_ids() {
        for base in CLASSED_BASE_MIN..=CLASSED_BASE_MAX {
            for class in OperandClass::ALL {
                let id = compose_ptg_id(base, class);
                assert_eq!(split_ptg_id(id), Some((base, Some(class))));
            }
        }
    }

    #[test]
    fn control_ids_carry_no_class() {
        for id in 0x00u8..=0x1F {
            assert_eq!(split_ptg_id(id), Some((id, None)));
        }
    }

    #[test]
    fn ids_above_class_ranges_do_not_decompose() {
        for id in 0x80u8..=0xFF {
            assert_eq!(split_ptg_id(id), None);
        }
    }

    #[test]
    fn class_offsets_match_serialized_ranges() {
        assert_eq!(OperandClass::Reference.offset(), 0x00);
        assert_eq!(OperandClass::Value.offset(), 0x20);
        assert_eq!(OperandClass::Array.offset(), 0x40);
    }
}
