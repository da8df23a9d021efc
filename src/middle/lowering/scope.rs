use std::rc::Rc;

use hashbrown::HashMap;
use log::warn;

use crate::{
    frontend::{
        ast::{Expression, FunctionDeclaration},
        intern::InternedSymbol,
    },
    middle::{lir, ty::Type},
};

/// What a name means at some point of the program
#[derive(Debug, Clone)]
pub enum Binding {
    /// A stack slot holding a value. `function_depth` is the nesting level of
    /// the function which owns the slot.
    Variable {
        slot: lir::RegisterId,
        ty: Type,
        function_depth: usize,
    },
    Function(Rc<FunctionSignature>),
    StructType(Rc<StructDefinition>),
}

#[derive(Debug)]
pub struct FunctionSignature {
    /// Name the function was emitted under
    pub symbol: InternedSymbol,
    pub parameters: Vec<(InternedSymbol, Type)>,
    pub defaults: HashMap<InternedSymbol, Expression>,
    pub varargs: Option<(InternedSymbol, Type)>,
    pub return_type: Type,
}

impl FunctionSignature {
    pub fn new(symbol: InternedSymbol, declaration: &FunctionDeclaration) -> Self {
        Self {
            symbol,
            parameters: declaration
                .parameters
                .iter()
                .map(|p| (p.name, p.ty.clone()))
                .collect(),
            defaults: declaration
                .parameters
                .iter()
                .filter_map(|p| p.default.clone().map(|d| (p.name, d)))
                .collect(),
            varargs: declaration.varargs.clone(),
            return_type: declaration.return_type.clone(),
        }
    }

    pub fn parameter_index(&self, name: InternedSymbol) -> Option<usize> {
        self.parameters.iter().position(|(n, _)| *n == name)
    }
}

#[derive(Debug)]
pub struct StructDefinition {
    pub name: InternedSymbol,
    pub fields: Vec<(InternedSymbol, Type)>,
    pub field_indices: HashMap<InternedSymbol, usize>,
    pub lir: lir::Struct,
}

impl StructDefinition {
    pub fn field(&self, name: InternedSymbol) -> Option<(usize, &Type)> {
        let index = *self.field_indices.get(&name)?;

        Some((index, &self.fields[index].1))
    }
}

/// Stack of lexical scopes. A scope is opened for the program's top level and
/// for every function body; lookups walk from the innermost scope outwards.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<InternedSymbol, Binding>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Binds `name` in the scope `depth` levels out from the innermost one.
    /// An existing binding of the same name in that scope is replaced.
    ///
    /// Lowering always keeps at least `depth + 1` scopes open, so a deeper
    /// `depth` is a lowering bug.
    pub fn define(&mut self, name: InternedSymbol, binding: Binding, depth: usize) {
        let Some(index) = self.scopes.len().checked_sub(depth + 1) else {
            debug_assert!(
                false,
                "{name} defined {depth} scopes out with only {} open",
                self.scopes.len()
            );
            warn!("dropping definition of {name}: only {} scopes open", self.scopes.len());
            return;
        };

        self.scopes[index].insert(name, binding);
    }

    pub fn lookup(&self, name: InternedSymbol) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }
}
