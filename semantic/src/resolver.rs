use log::trace;
use model::{
    CompileError, CompileResult, ErrorKind, Location, Node, NodeKind, Segment, StmtKind, TypeTag,
};

use crate::scope::{BlockIds, ScopeId, ScopeTree, Symbol, SymbolKind};

/// First parameter sits above the saved frame pointer and return address.
pub const FIRST_PARAM_OFFSET: u32 = 8;

/// Single top-down walk that builds the scope tree and assigns storage.
pub(crate) struct Resolver {
    tree: ScopeTree,
}

impl Resolver {
    pub fn new() -> Self {
        Self { tree: ScopeTree::new() }
    }

    pub fn resolve_program(mut self, program: &Node) -> CompileResult<ScopeTree> {
        let mut data_used = 0u32;
        for item in &program.children {
            match &item.kind {
                NodeKind::Function(_) => self.resolve_function(item)?,
                NodeKind::Stmt(StmtKind::Decl(name)) => {
                    let ty = variable_type(item, name)?;
                    let location = Location::new(Segment::Data, data_used as i32);
                    self.tree.insert(ScopeId::ROOT, Symbol::variable(name, ty, location), item.offset)?;
                    trace!("global {} at data+{}", name, data_used);
                    data_used += ty.size();
                }
                _ => return Err(malformed(item, "expected a declaration or function")),
            }
        }
        self.tree.scope_mut(ScopeId::ROOT).storage = data_used;
        Ok(self.tree)
    }

    fn resolve_function(&mut self, node: &Node) -> CompileResult<()> {
        let parts = node
            .function_parts()
            .ok_or_else(|| malformed(node, "malformed function"))?;
        let return_type = TypeTag::from_node(parts.return_type)
            .ok_or_else(|| malformed(node, "malformed return type"))?;

        let mut params = Vec::with_capacity(parts.arguments.len());
        for arg in parts.arguments {
            let name = arg.argument_name().unwrap_or_default();
            params.push(variable_type(arg, name)?);
        }

        let Some(body) = parts.body else {
            let symbol = Symbol {
                name: parts.name.to_string(),
                kind: SymbolKind::Function { params, defined: false },
                ty: return_type,
                location: Location::new(Segment::Code, 0),
                child: None,
            };
            return self.tree.insert(ScopeId::ROOT, symbol, node.offset);
        };

        let scope = self.tree.add_scope(parts.name.to_string(), ScopeId::ROOT);
        let mut param_offset = FIRST_PARAM_OFFSET;
        for (arg, &ty) in parts.arguments.iter().zip(&params) {
            let name = arg.argument_name().unwrap_or_default();
            let location = Location::new(Segment::Stack, param_offset as i32);
            self.tree.insert(scope, Symbol::variable(name, ty, location), arg.offset)?;
            param_offset += ty.size();
        }

        // The body block shares the function scope.
        let frame = self.resolve_statements(scope, &body.children, 0)?;
        self.tree.scope_mut(scope).storage = frame;
        trace!("function {} frame {} bytes", parts.name, frame);

        let symbol = Symbol {
            name: parts.name.to_string(),
            kind: SymbolKind::Function { params, defined: true },
            ty: return_type,
            location: Location::new(Segment::Code, 0),
            child: Some(scope),
        };
        self.tree.insert(ScopeId::ROOT, symbol, node.offset)
    }

    /// Resolve a statement list into `scope`. `base` is the number of frame
    /// bytes already used by enclosing declarations; the return value is what
    /// this list adds on top of it.
    fn resolve_statements(&mut self, scope: ScopeId, stmts: &[Node], base: u32) -> CompileResult<u32> {
        let mut ids = BlockIds::default();
        let mut used = 0;
        for stmt in stmts {
            used += self.resolve_stmt(scope, stmt, &mut ids, base + used)?;
        }
        Ok(used)
    }

    fn resolve_stmt(
        &mut self,
        scope: ScopeId,
        stmt: &Node,
        ids: &mut BlockIds,
        base: u32,
    ) -> CompileResult<u32> {
        let Some(kind) = stmt.stmt_kind() else {
            return Ok(0);
        };
        match kind {
            StmtKind::Decl(name) => {
                let ty = variable_type(stmt, name)?;
                let size = ty.size();
                let location = Location::new(Segment::Stack, -((base + size) as i32));
                trace!("local {} at stack{:+}", name, location.offset);
                self.tree.insert(scope, Symbol::variable(name, ty, location), stmt.offset)?;
                Ok(size)
            }
            StmtKind::Block => {
                let id = ids.block();
                self.resolve_block(scope, stmt, id, base)
            }
            StmtKind::If => {
                let (then_id, else_id) = ids.if_branches();
                let mut used = 0;
                if let Some(then_branch) = stmt.children.get(1) {
                    used += self.resolve_block(scope, then_branch, then_id, base)?;
                }
                if let Some(else_branch) = stmt.children.get(2) {
                    used += self.resolve_block(scope, else_branch, else_id, base + used)?;
                }
                Ok(used)
            }
            StmtKind::While => {
                let id = ids.while_body();
                match stmt.children.get(1) {
                    Some(body) => self.resolve_block(scope, body, id, base),
                    None => Ok(0),
                }
            }
            _ => Ok(0),
        }
    }

    fn resolve_block(&mut self, parent: ScopeId, block: &Node, id: String, base: u32) -> CompileResult<u32> {
        let scope = self.tree.add_scope(id.clone(), parent);
        let used = self.resolve_statements(scope, &block.children, base)?;
        self.tree.scope_mut(scope).storage = used;
        let symbol = Symbol {
            name: id,
            kind: SymbolKind::Block,
            ty: TypeTag::Void,
            location: Location::new(Segment::Stack, 0),
            child: Some(scope),
        };
        self.tree.insert(parent, symbol, block.offset)?;
        Ok(used)
    }
}

/// Type of a `Decl` or `Argument`, whose first child is the type node.
fn variable_type(node: &Node, name: &str) -> CompileResult<TypeTag> {
    let ty = node
        .children
        .first()
        .and_then(TypeTag::from_node)
        .ok_or_else(|| malformed(node, "malformed type"))?;
    if ty == TypeTag::Void {
        return Err(CompileError::new(ErrorKind::VoidVariable(name.to_string()), node.offset));
    }
    Ok(ty)
}

fn malformed(node: &Node, message: &str) -> CompileError {
    CompileError::new(ErrorKind::MalformedExpression(message.to_string()), node.offset)
}
