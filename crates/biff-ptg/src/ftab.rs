//! Built-in function table.
//!
//! Function-call tokens carry a 16-bit function identifier (`iftab`) that
//! indexes Excel's fixed built-in function table. This module carries the
//! classic worksheet subset (names + argument ranges) so fixed-arity calls
//! render without a custom resolver; hosts with richer tables supply their own
//! via [`crate::resolve::Resolver`].
//!
//! Ids are the BIFF function codes from the Microsoft binary format
//! documentation; the argument ranges follow current Excel behavior.

use std::collections::HashMap;
use std::sync::OnceLock;

/// `iftab` value reserved for user-defined / add-in functions. The function
/// name arrives as the call's first operand rather than from this table.
pub const FTAB_USER_DEFINED: u16 = 255;

/// Upper bound Excel uses for variadic argument lists.
pub const MAX_VAR_ARGS: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub id: u16,
    pub name: &'static str,
    pub min_args: u8,
    pub max_args: u8,
}

impl FunctionSpec {
    /// The implicit arity of a fixed-arity function, if this spec has one.
    pub fn fixed_arity(&self) -> Option<u8> {
        (self.min_args == self.max_args).then_some(self.min_args)
    }
}

const fn spec(id: u16, name: &'static str, min_args: u8, max_args: u8) -> FunctionSpec {
    FunctionSpec {
        id,
        name,
        min_args,
        max_args,
    }
}

// Sorted by id; `function_spec_from_id` binary-searches.
pub(crate) const FUNCTION_SPECS: &[FunctionSpec] = &[
    spec(0, "COUNT", 1, MAX_VAR_ARGS),
    spec(1, "IF", 2, 3),
    spec(2, "ISNA", 1, 1),
    spec(3, "ISERROR", 1, 1),
    spec(4, "SUM", 1, MAX_VAR_ARGS),
    spec(5, "AVERAGE", 1, MAX_VAR_ARGS),
    spec(6, "MIN", 1, MAX_VAR_ARGS),
    spec(7, "MAX", 1, MAX_VAR_ARGS),
    spec(8, "ROW", 0, 1),
    spec(9, "COLUMN", 0, 1),
    spec(10, "NA", 0, 0),
    spec(11, "NPV", 2, MAX_VAR_ARGS),
    spec(12, "STDEV", 1, MAX_VAR_ARGS),
    spec(13, "DOLLAR", 1, 2),
    spec(14, "FIXED", 1, 3),
    spec(15, "SIN", 1, 1),
    spec(16, "COS", 1, 1),
    spec(17, "TAN", 1, 1),
    spec(18, "ATAN", 1, 1),
    spec(19, "PI", 0, 0),
    spec(20, "SQRT", 1, 1),
    spec(21, "EXP", 1, 1),
    spec(22, "LN", 1, 1),
    spec(23, "LOG10", 1, 1),
    spec(24, "ABS", 1, 1),
    spec(25, "INT", 1, 1),
    spec(26, "SIGN", 1, 1),
    spec(27, "ROUND", 2, 2),
    spec(28, "LOOKUP", 2, 3),
    spec(29, "INDEX", 2, 4),
    spec(30, "REPT", 2, 2),
    spec(31, "MID", 3, 3),
    spec(32, "LEN", 1, 1),
    spec(33, "VALUE", 1, 1),
    spec(34, "TRUE", 0, 0),
    spec(35, "FALSE", 0, 0),
    spec(36, "AND", 1, MAX_VAR_ARGS),
    spec(37, "OR", 1, MAX_VAR_ARGS),
    spec(38, "NOT", 1, 1),
    spec(39, "MOD", 2, 2),
    spec(40, "DCOUNT", 3, 3),
    spec(41, "DSUM", 3, 3),
    spec(42, "DAVERAGE", 3, 3),
    spec(43, "DMIN", 3, 3),
    spec(44, "DMAX", 3, 3),
    spec(46, "VAR", 1, MAX_VAR_ARGS),
    spec(48, "TEXT", 2, 2),
    spec(56, "PV", 3, 5),
    spec(57, "FV", 3, 5),
    spec(58, "NPER", 3, 5),
    spec(59, "PMT", 3, 5),
    spec(60, "RATE", 3, 6),
    spec(62, "IRR", 1, 2),
    spec(63, "RAND", 0, 0),
    spec(64, "MATCH", 2, 3),
    spec(65, "DATE", 3, 3),
    spec(66, "TIME", 3, 3),
    spec(67, "DAY", 1, 1),
    spec(68, "MONTH", 1, 1),
    spec(69, "YEAR", 1, 1),
    spec(70, "WEEKDAY", 1, 2),
    spec(71, "HOUR", 1, 1),
    spec(72, "MINUTE", 1, 1),
    spec(73, "SECOND", 1, 1),
    spec(74, "NOW", 0, 0),
    spec(75, "AREAS", 1, 1),
    spec(76, "ROWS", 1, 1),
    spec(77, "COLUMNS", 1, 1),
    spec(78, "OFFSET", 3, 5),
    spec(82, "SEARCH", 2, 3),
    spec(83, "TRANSPOSE", 1, 1),
    spec(86, "TYPE", 1, 1),
    spec(97, "ATAN2", 2, 2),
    spec(98, "ASIN", 1, 1),
    spec(99, "ACOS", 1, 1),
    spec(100, "CHOOSE", 2, MAX_VAR_ARGS),
    spec(101, "HLOOKUP", 3, 4),
    spec(102, "VLOOKUP", 3, 4),
    spec(105, "ISREF", 1, 1),
    spec(109, "LOG", 1, 2),
    spec(111, "CHAR", 1, 1),
    spec(112, "LOWER", 1, 1),
    spec(113, "UPPER", 1, 1),
    spec(114, "PROPER", 1, 1),
    spec(115, "LEFT", 1, 2),
    spec(116, "RIGHT", 1, 2),
    spec(117, "EXACT", 2, 2),
    spec(118, "TRIM", 1, 1),
    spec(119, "REPLACE", 4, 4),
    spec(120, "SUBSTITUTE", 3, 4),
    spec(121, "CODE", 1, 1),
    spec(124, "FIND", 2, 3),
    spec(125, "CELL", 1, 2),
    spec(126, "ISERR", 1, 1),
    spec(127, "ISTEXT", 1, 1),
    spec(128, "ISNUMBER", 1, 1),
    spec(129, "ISBLANK", 1, 1),
    spec(130, "T", 1, 1),
    spec(131, "N", 1, 1),
    spec(140, "DATEVALUE", 1, 1),
    spec(141, "TIMEVALUE", 1, 1),
    spec(142, "SLN", 3, 3),
    spec(143, "SYD", 4, 4),
    spec(144, "DDB", 4, 5),
    spec(148, "INDIRECT", 1, 2),
    spec(162, "CLEAN", 1, 1),
    spec(163, "MDETERM", 1, 1),
    spec(164, "MINVERSE", 1, 1),
    spec(165, "MMULT", 2, 2),
    spec(167, "IPMT", 4, 6),
    spec(168, "PPMT", 4, 6),
    spec(169, "COUNTA", 1, MAX_VAR_ARGS),
    spec(183, "PRODUCT", 1, MAX_VAR_ARGS),
    spec(184, "FACT", 1, 1),
    spec(190, "ISNONTEXT", 1, 1),
    spec(193, "STDEVP", 1, MAX_VAR_ARGS),
    spec(194, "VARP", 1, MAX_VAR_ARGS),
    spec(197, "TRUNC", 1, 2),
    spec(198, "ISLOGICAL", 1, 1),
    spec(199, "DCOUNTA", 3, 3),
    spec(212, "ROUNDUP", 2, 2),
    spec(213, "ROUNDDOWN", 2, 2),
    spec(216, "RANK", 2, 3),
    spec(219, "ADDRESS", 2, 5),
    spec(220, "DAYS360", 2, 3),
    spec(221, "TODAY", 0, 0),
    spec(227, "MEDIAN", 1, MAX_VAR_ARGS),
    spec(228, "SUMPRODUCT", 1, MAX_VAR_ARGS),
    spec(229, "SINH", 1, 1),
    spec(230, "COSH", 1, 1),
    spec(231, "TANH", 1, 1),
    spec(232, "ASINH", 1, 1),
    spec(233, "ACOSH", 1, 1),
    spec(234, "ATANH", 1, 1),
    spec(235, "DGET", 3, 3),
    spec(244, "INFO", 1, 1),
    spec(247, "DB", 4, 5),
    spec(252, "FREQUENCY", 2, 2),
    spec(261, "ERROR.TYPE", 1, 1),
    spec(269, "AVEDEV", 1, MAX_VAR_ARGS),
    spec(276, "COMBIN", 2, 2),
    spec(279, "EVEN", 1, 1),
    spec(285, "FLOOR", 2, 2),
    spec(288, "CEILING", 2, 2),
    spec(298, "ODD", 1, 1),
    spec(325, "LARGE", 2, 2),
    spec(326, "SMALL", 2, 2),
    spec(327, "QUARTILE", 2, 2),
    spec(328, "PERCENTILE", 2, 2),
    spec(329, "PERCENTRANK", 2, 3),
    spec(330, "MODE", 1, MAX_VAR_ARGS),
    spec(336, "CONCATENATE", 1, MAX_VAR_ARGS),
    spec(337, "POWER", 2, 2),
    spec(342, "RADIANS", 1, 1),
    spec(343, "DEGREES", 1, 1),
    spec(344, "SUBTOTAL", 2, MAX_VAR_ARGS),
    spec(345, "SUMIF", 2, 3),
    spec(346, "COUNTIF", 2, 2),
    spec(347, "COUNTBLANK", 1, 1),
    spec(350, "ISPMT", 4, 4),
    spec(358, "GETPIVOTDATA", 2, MAX_VAR_ARGS),
    spec(359, "HYPERLINK", 1, 2),
    spec(361, "AVERAGEA", 1, MAX_VAR_ARGS),
    spec(362, "MAXA", 1, MAX_VAR_ARGS),
    spec(363, "MINA", 1, MAX_VAR_ARGS),
    spec(465, "WEEKNUM", 1, 2),
];

/// Look up a built-in function by its `iftab` id.
pub fn function_spec_from_id(id: u16) -> Option<&'static FunctionSpec> {
    FUNCTION_SPECS
        .binary_search_by_key(&id, |s| s.id)
        .ok()
        .map(|i| &FUNCTION_SPECS[i])
}

/// Look up a built-in function by its (uppercase) display name.
pub fn function_spec_from_name(name: &str) -> Option<&'static FunctionSpec> {
    static BY_NAME: OnceLock<HashMap<&'static str, &'static FunctionSpec>> = OnceLock::new();
    let map = BY_NAME.get_or_init(|| FUNCTION_SPECS.iter().map(|s| (s.name, s)).collect());
    map.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn table_is_sorted_with_valid_argument_ranges() {
        for pair in FUNCTION_SPECS.windows(2) {
            assert!(pair[0].id < pair[1].id, "table out of order at id {}", pair[1].id);
        }
        for s in FUNCTION_SPECS {
            assert!(s.min_args <= s.max_args, "{} has an invalid arg range", s.name);
        }
    }

    #[test]
    fn id_and_name_lookups_agree() {
        let sum = function_spec_from_id(4).expect("SUM");
        assert_eq!(sum.name, "SUM");
        assert_eq!(function_spec_from_name("SUM"), Some(sum));
        assert_eq!(sum.fixed_arity(), None);

        let pi = function_spec_from_id(19).expect("PI");
        assert_eq!(pi.fixed_arity(), Some(0));

        assert_eq!(function_spec_from_id(45), None);
        assert_eq!(function_spec_from_name("NOTAFUNCTION"), None);
    }
}
