//! Hierarchical symbol tables built during semantic analysis.
//!
//! One table per scope-owning AST node (the program, each function, each
//! block). Tables are stored flat in a map keyed by the owner's [`NodeId`],
//! with an explicit parent link, so lookups walk the lexical chain without
//! touching the AST. Storage offsets are assigned at declaration time and
//! consumed unchanged by code generation.

use std::collections::HashMap;

use crate::ast::{NodeId, Type};
use crate::iloc::WORD_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Scalar,
    Array { length: usize },
    Function { params: Vec<Type>, return_type: Type },
}

/// Where a symbol lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Global data region, addressed off the static base.
    Static,
    /// Caller-pushed argument, at a positive offset from BP.
    Param,
    /// Function-local slot, at a negative offset from BP.
    Local,
    /// Functions occupy no data storage.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Base type; for arrays this is the element type.
    pub ty: Type,
    pub kind: SymbolKind,
    pub storage: Storage,
    /// Byte offset within the symbol's storage region.
    pub offset: i64,
}

impl Symbol {
    pub fn scalar(name: impl Into<String>, ty: Type, storage: Storage, offset: i64) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: SymbolKind::Scalar,
            storage,
            offset,
        }
    }

    pub fn array(name: impl Into<String>, ty: Type, length: usize, offset: i64) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: SymbolKind::Array { length },
            storage: Storage::Static,
            offset,
        }
    }

    pub fn function(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            ty: return_type,
            kind: SymbolKind::Function {
                params,
                return_type,
            },
            storage: Storage::None,
            offset: 0,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, SymbolKind::Array { .. })
    }
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<NodeId>,
    symbols: Vec<Symbol>,
}

/// All scopes for one program, plus per-function frame sizes.
#[derive(Debug, Default)]
pub struct SymbolTables {
    scopes: HashMap<NodeId, Scope>,
    /// Bytes of local-variable storage per function declaration.
    local_bytes: HashMap<NodeId, i64>,
    /// Bytes of static (global) storage for the whole program.
    static_bytes: i64,
}

impl SymbolTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope owned by `owner`, chained under `parent`.
    pub fn create_scope(&mut self, owner: NodeId, parent: Option<NodeId>) {
        self.scopes.entry(owner).or_insert(Scope {
            parent,
            symbols: Vec::new(),
        });
    }

    /// Add `symbol` to `owner`'s scope. Fails if the name is already
    /// declared *in that same scope*; shadowing an outer scope is fine.
    pub fn declare(&mut self, owner: NodeId, symbol: Symbol) -> Result<(), String> {
        let scope = self.scopes.entry(owner).or_default();
        if scope.symbols.iter().any(|s| s.name == symbol.name) {
            return Err(symbol.name);
        }
        scope.symbols.push(symbol);
        Ok(())
    }

    /// Resolve `name` starting at `owner`'s scope and walking outward.
    pub fn lookup(&self, owner: NodeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(owner);
        while let Some(id) = current {
            let scope = self.scopes.get(&id)?;
            if let Some(sym) = scope.symbols.iter().find(|s| s.name == name) {
                return Some(sym);
            }
            current = scope.parent;
        }
        None
    }

    /// Resolve `name` in `owner`'s scope only (no parent walk).
    pub fn lookup_here(&self, owner: NodeId, name: &str) -> Option<&Symbol> {
        self.scopes
            .get(&owner)?
            .symbols
            .iter()
            .find(|s| s.name == name)
    }

    /// Symbols of `owner`'s scope in declaration order.
    pub fn symbols(&self, owner: NodeId) -> &[Symbol] {
        self.scopes
            .get(&owner)
            .map(|s| s.symbols.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_local_bytes(&mut self, func: NodeId, bytes: i64) {
        self.local_bytes.insert(func, bytes);
    }

    /// Bytes of local storage the given function's frame must reserve.
    pub fn local_bytes(&self, func: NodeId) -> i64 {
        self.local_bytes.get(&func).copied().unwrap_or(0)
    }

    pub fn set_static_bytes(&mut self, bytes: i64) {
        self.static_bytes = bytes;
    }

    pub fn static_bytes(&self) -> i64 {
        self.static_bytes
    }
}

/// Offset of the `n`th parameter (0-indexed) from BP. Slot 0 holds the
/// saved base pointer and slot 1 the return address, so arguments start
/// at `2 * WORD_SIZE`.
pub fn param_offset(index: usize) -> i64 {
    (index as i64 + 2) * WORD_SIZE
}

/// Offset of the `n`th local slot (0-indexed) from BP.
pub fn local_offset(index: usize) -> i64 {
    -((index as i64 + 1) * WORD_SIZE)
}
