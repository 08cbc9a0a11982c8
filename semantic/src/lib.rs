// Scope resolution: builds the tree of symbol tables and assigns every
// declaration a storage location.
//
// - scope.rs: ScopeTree arena, symbols, lookup and positional block ids
// - resolver.rs: the walk over the syntax tree

mod resolver;
mod scope;

use log::debug;
use model::{CompileResult, Node};

pub use resolver::FIRST_PARAM_OFFSET;
pub use scope::{BlockIds, SCOPE_CAPACITY, Scope, ScopeId, ScopeTree, Symbol, SymbolKind};

/// Resolve a parsed program into its scope tree.
///
/// Globals land in the data segment at increasing offsets, parameters at
/// `+8, ...` and locals at negative frame offsets. Function symbols are
/// registered at code offset 0 until `ScopeTree::bind_code_offsets` runs.
pub fn resolve(program: &Node) -> CompileResult<ScopeTree> {
    let tree = resolver::Resolver::new().resolve_program(program)?;
    debug!(
        "resolved {} scopes, {} bytes of global data",
        tree.len(),
        tree.root().storage
    );
    Ok(tree)
}
