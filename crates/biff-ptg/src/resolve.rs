//! Resolver contract for turning table indices into display text.
//!
//! Reference and name tokens carry small integers into workbook-owned tables
//! (extern-sheet entries, defined names, function metadata). The codec never
//! owns those tables; callers pass an immutable resolver snapshot into every
//! reconstruction call. There is no process-wide state.

use std::collections::HashMap;

use crate::ftab::{function_spec_from_id, FunctionSpec};

/// Read-only lookup surface consumed by formula reconstruction.
///
/// Function lookups default to the built-in table ([`crate::ftab`]); hosts
/// with add-in metadata override them.
pub trait Resolver {
    /// Display name of the sheet (or sheet range) behind an extern-sheet index.
    fn sheet_name(&self, ixti: u16) -> Option<&str>;

    /// Text of a defined name; `index` is 1-based, as stored in name tokens.
    fn defined_name(&self, index: u16) -> Option<&str>;

    /// Text of a cross-workbook name.
    fn external_name(&self, ixti: u16, index: u16) -> Option<&str> {
        let _ = (ixti, index);
        None
    }

    fn function_name(&self, iftab: u16) -> Option<&str> {
        function_spec_from_id(iftab).map(|s| s.name)
    }

    /// Implicit arity of a fixed-arity built-in, used by function tokens that
    /// carry no explicit argument count.
    fn function_arity(&self, iftab: u16) -> Option<u8> {
        function_spec_from_id(iftab).and_then(FunctionSpec::fixed_arity)
    }
}

/// A resolver with no workbook context. Sheet and name lookups all miss;
/// function lookups still hit the built-in table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyTables;

impl Resolver for EmptyTables {
    fn sheet_name(&self, _ixti: u16) -> Option<&str> {
        None
    }

    fn defined_name(&self, _index: u16) -> Option<&str> {
        None
    }
}

/// Owned snapshot of the workbook tables a host typically has on hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookTables {
    /// Sheet display names indexed by extern-sheet index.
    pub sheet_names: Vec<String>,
    /// Defined names in workbook order (element 0 is name index 1).
    pub defined_names: Vec<String>,
    /// Cross-workbook names keyed by `(ixti, 1-based name index)`.
    pub external_names: HashMap<(u16, u16), String>,
}

impl Resolver for WorkbookTables {
    fn sheet_name(&self, ixti: u16) -> Option<&str> {
        self.sheet_names.get(ixti as usize).map(String::as_str)
    }

    fn defined_name(&self, index: u16) -> Option<&str> {
        let index = (index as usize).checked_sub(1)?;
        self.defined_names.get(index).map(String::as_str)
    }

    fn external_name(&self, ixti: u16, index: u16) -> Option<&str> {
        self.external_names.get(&(ixti, index)).map(String::as_str)
    }
}
