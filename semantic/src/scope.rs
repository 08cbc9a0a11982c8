use std::collections::HashMap;
use std::fmt;

use model::{CompileError, CompileResult, ErrorKind, Location, Segment, TypeTag};

/// Most symbols a single scope may hold.
pub const SCOPE_CAPACITY: usize = 256;

/// Index of a scope inside its `ScopeTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    /// `defined` is false for a forward declaration that has no body yet.
    Function { params: Vec<TypeTag>, defined: bool },
    /// Anonymous nested block; the symbol name is its positional id.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: TypeTag,
    pub location: Location,
    pub child: Option<ScopeId>,
}

impl Symbol {
    pub fn variable(name: &str, ty: TypeTag, location: Location) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            ty,
            location,
            child: None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { .. })
    }

    /// True for a function that has a body.
    pub fn is_defined(&self) -> bool {
        matches!(self.kind, SymbolKind::Function { defined: true, .. })
    }

    /// Parameter types of a function symbol.
    pub fn params(&self) -> Option<&[TypeTag]> {
        match &self.kind {
            SymbolKind::Function { params, .. } => Some(params),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    /// Bytes of storage the scope's subtree consumed: global data for the
    /// root, the local frame size for a function.
    pub storage: u32,
    symbols: HashMap<String, Symbol>,
    order: Vec<String>,
}

impl Scope {
    fn new(name: String, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            parent,
            storage: 0,
            symbols: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in insertion order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(|name| self.symbols.get(name))
    }
}

/// Arena of scopes. Each scope points at its parent by id; the root has none.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self { scopes: vec![Scope::new("global".to_string(), None)] }
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[ScopeId::ROOT.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn add_scope(&mut self, name: String, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(name, Some(parent)));
        id
    }

    /// Insert a symbol into `scope`. A function may be declared any number of
    /// times with the same signature and defined once; any other clash fails.
    pub fn insert(&mut self, scope: ScopeId, symbol: Symbol, offset: usize) -> CompileResult<()> {
        let target = &mut self.scopes[scope.0];
        if let Some(existing) = target.symbols.get(&symbol.name) {
            let duplicate = || CompileError::new(ErrorKind::DuplicateSymbol(symbol.name.clone()), offset);
            let same_signature = existing.ty == symbol.ty
                && existing.params().is_some()
                && existing.params() == symbol.params();
            if !same_signature {
                return Err(duplicate());
            }
            match (existing.is_defined(), symbol.is_defined()) {
                (true, true) => return Err(duplicate()),
                (false, true) => {
                    target.symbols.insert(symbol.name.clone(), symbol);
                }
                // A repeated prototype adds nothing.
                (_, false) => {}
            }
            return Ok(());
        }
        if target.symbols.len() >= SCOPE_CAPACITY {
            return Err(CompileError::new(ErrorKind::ScopeFull(SCOPE_CAPACITY), offset));
        }
        target.order.push(symbol.name.clone());
        target.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Find `name` starting at `scope` and walking outward to the root.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// The scope owned by a named symbol directly inside `scope` (a function
    /// or a positional block id).
    pub fn child(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        self.scopes[scope.0].symbols.get(name).and_then(|s| s.child)
    }

    /// Record the final code offset of every function symbol in the root scope.
    pub fn bind_code_offsets(&mut self, offsets: &HashMap<String, u32>) {
        let root = &mut self.scopes[ScopeId::ROOT.0];
        for symbol in root.symbols.values_mut() {
            if let Some(&offset) = offsets.get(&symbol.name) {
                if symbol.is_function() {
                    symbol.location = Location::new(Segment::Code, offset as i32);
                }
            }
        }
    }

    fn fmt_scope(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let scope = self.scope(id);
        let indent = "  ".repeat(depth);
        writeln!(f, "{}scope {} (storage {})", indent, scope.name, scope.storage)?;
        for symbol in scope.symbols() {
            let segment = match symbol.location.segment {
                Segment::Code => "code",
                Segment::Data => "data",
                Segment::Stack => "stack",
            };
            writeln!(
                f,
                "{}  {}: {:?} @ {}{:+}",
                indent, symbol.name, symbol.ty, segment, symbol.location.offset
            )?;
            if let Some(child) = symbol.child {
                self.fmt_scope(f, child, depth + 2)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_scope(f, ScopeId::ROOT, 0)
    }
}

/// Hands out positional block ids inside one scope. A plain block takes the
/// next id, a while body takes one, an if takes two (then, else) whether or
/// not it has an else branch.
#[derive(Debug, Default)]
pub struct BlockIds {
    next: u32,
}

impl BlockIds {
    pub fn block(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }

    pub fn while_body(&mut self) -> String {
        self.block()
    }

    pub fn if_branches(&mut self) -> (String, String) {
        let then_id = self.next;
        self.next += 2;
        (then_id.to_string(), (then_id + 1).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_at(name: &str, offset: i32) -> Symbol {
        Symbol::variable(name, TypeTag::Int, Location::new(Segment::Stack, offset))
    }

    fn function(name: &str, defined: bool) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function { params: vec![], defined },
            ty: TypeTag::Int,
            location: Location::new(Segment::Code, 0),
            child: None,
        }
    }

    #[test]
    fn lookup_walks_outward() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, int_at("g", 0), 0).unwrap();
        let inner = tree.add_scope("f".to_string(), ScopeId::ROOT);
        tree.insert(inner, int_at("x", -4), 0).unwrap();

        assert_eq!(tree.lookup(inner, "x").unwrap().location.offset, -4);
        assert_eq!(tree.lookup(inner, "g").unwrap().name, "g");
        assert!(tree.lookup(ScopeId::ROOT, "x").is_none());
        assert!(tree.lookup(inner, "missing").is_none());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, int_at("x", 0), 0).unwrap();
        let inner = tree.add_scope("0".to_string(), ScopeId::ROOT);
        tree.insert(inner, int_at("x", -8), 0).unwrap();
        assert_eq!(tree.lookup(inner, "x").unwrap().location.offset, -8);
        assert_eq!(tree.lookup(ScopeId::ROOT, "x").unwrap().location.offset, 0);
    }

    #[test]
    fn duplicate_in_one_scope_fails() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, int_at("x", 0), 3).unwrap();
        let err = tree.insert(ScopeId::ROOT, int_at("x", 4), 9).unwrap_err();
        assert_eq!(err, CompileError::new(ErrorKind::DuplicateSymbol("x".to_string()), 9));
    }

    #[test]
    fn definition_completes_forward_declaration() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, function("f", false), 0).unwrap();
        tree.insert(ScopeId::ROOT, function("f", true), 0).unwrap();
        assert_eq!(tree.root().len(), 1);
        assert!(tree.root().get("f").unwrap().is_defined());

        let err = tree.insert(ScopeId::ROOT, function("f", true), 0).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateSymbol(_)));
    }

    #[test]
    fn compatible_redeclarations_are_accepted() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, function("f", false), 0).unwrap();
        tree.insert(ScopeId::ROOT, function("f", false), 0).unwrap();
        tree.insert(ScopeId::ROOT, function("f", true), 0).unwrap();
        // a prototype after the definition keeps the definition
        tree.insert(ScopeId::ROOT, function("f", false), 0).unwrap();
        assert!(tree.root().get("f").unwrap().is_defined());
        assert_eq!(tree.root().len(), 1);
    }

    #[test]
    fn mismatched_redeclaration_fails() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, function("f", false), 0).unwrap();
        let mut other = function("f", true);
        other.kind = SymbolKind::Function { params: vec![TypeTag::Int], defined: true };
        let err = tree.insert(ScopeId::ROOT, other, 7).unwrap_err();
        assert_eq!(err, CompileError::new(ErrorKind::DuplicateSymbol("f".to_string()), 7));

        let mut returns_char = function("f", false);
        returns_char.ty = TypeTag::Char;
        assert!(tree.insert(ScopeId::ROOT, returns_char, 0).is_err());

        tree.insert(ScopeId::ROOT, int_at("g", 0), 0).unwrap();
        assert!(tree.insert(ScopeId::ROOT, function("g", false), 0).is_err());
    }

    #[test]
    fn scope_capacity_is_enforced() {
        let mut tree = ScopeTree::new();
        for i in 0..SCOPE_CAPACITY {
            tree.insert(ScopeId::ROOT, int_at(&format!("v{}", i), 0), 0).unwrap();
        }
        let err = tree.insert(ScopeId::ROOT, int_at("one_more", 0), 42).unwrap_err();
        assert_eq!(err, CompileError::new(ErrorKind::ScopeFull(SCOPE_CAPACITY), 42));
    }

    #[test]
    fn bind_code_offsets_updates_functions_only() {
        let mut tree = ScopeTree::new();
        tree.insert(ScopeId::ROOT, function("f", true), 0).unwrap();
        tree.insert(ScopeId::ROOT, int_at("f_data", 0), 0).unwrap();
        let offsets = HashMap::from([("f".to_string(), 32), ("f_data".to_string(), 99)]);
        tree.bind_code_offsets(&offsets);
        assert_eq!(tree.root().get("f").unwrap().location, Location::new(Segment::Code, 32));
        assert_eq!(tree.root().get("f_data").unwrap().location.offset, 0);
    }

    #[test]
    fn block_ids_follow_statement_kinds() {
        let mut ids = BlockIds::default();
        assert_eq!(ids.block(), "0");
        assert_eq!(ids.if_branches(), ("1".to_string(), "2".to_string()));
        assert_eq!(ids.while_body(), "3");
        assert_eq!(ids.block(), "4");
    }
}
