//! Lowering of annotated programs into LIR modules.
//!
//! The module is assembled in a fixed order: host declarations, the runtime
//! library, then every user function in the order its body was finished, and
//! finally the implicit entry function holding the program's top level
//! statements.

use hashbrown::HashSet;
use log::debug;

use crate::{
    diagnostics::{CodegenError, CodegenErrorKind},
    frontend::{ast, intern::InternedSymbol},
    index::IndexVec,
    middle::{
        lir::{self, StaticLabelId},
        ty::Type,
    },
};

use blocks::FunctionBuilder;
use scope::{Binding, ScopeStack};

pub mod blocks;
mod expr;
pub mod runtime;
pub mod scope;
mod stmt;

/// Settings for a single lowering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Name diagnostics attribute faults to
    pub file_name: String,
    /// Symbol of the function holding the top level statements
    pub entry_point: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            file_name: "<input>".to_owned(),
            entry_point: "main".to_owned(),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, CodegenError>;

struct LoweringContext<'a> {
    options: &'a CodegenOptions,
    scopes: ScopeStack,

    /// The function currently being emitted. Enclosing functions are parked on
    /// the Rust stack while a nested declaration is lowered.
    function: FunctionBuilder,
    /// Nesting level of `function`, 0 for the entry function
    function_depth: usize,
    /// Declared return type of `function`
    return_type: Type,

    finished: Vec<lir::FunctionDefinition>,
    static_strings: IndexVec<StaticLabelId, InternedSymbol>,
    used_symbols: HashSet<InternedSymbol>,
    anonymous_functions: usize,
}

impl<'a> LoweringContext<'a> {
    fn error(&self, line: usize, kind: CodegenErrorKind) -> CodegenError {
        kind.at(&self.options.file_name, line)
    }

    /// Picks the symbol a user function is emitted under. Names already taken
    /// by the runtime or by an earlier function get a numeric suffix.
    fn claim_symbol(&mut self, name: &str) -> InternedSymbol {
        let mut candidate = InternedSymbol::new(name);
        let mut suffix = 1;

        while self.used_symbols.contains(&candidate) {
            candidate = InternedSymbol::new(&format!("{name}.{suffix}"));
            suffix += 1;
        }

        self.used_symbols.insert(candidate);
        candidate
    }

    fn static_string(&mut self, value: &str) -> StaticLabelId {
        let symbol = InternedSymbol::new(value);

        let existing = self
            .static_strings
            .enumerate()
            .find(|(_, s)| **s == symbol)
            .map(|(id, _)| id);

        match existing {
            Some(id) => id,
            None => self.static_strings.push(symbol),
        }
    }

    /// The LIR type values of `ty` are held in
    fn lir_type(&self, ty: &Type, line: usize) -> Result<lir::Type> {
        match ty {
            Type::Primitive(kind) => Ok(kind.lower()),
            Type::Str | Type::Array(_) => Ok(lir::Type::Pointer),
            Type::Struct(name) => {
                let definition = self.struct_definition(*name, line)?;
                Ok(lir::Type::Struct(definition.lir.clone()))
            }
            Type::Void | Type::Function => Err(self.error(
                line,
                CodegenErrorKind::UnsupportedValueType(ty.clone()),
            )),
        }
    }

    fn return_lir_type(&self, ty: &Type, line: usize) -> Result<Option<lir::Type>> {
        match ty {
            Type::Void => Ok(None),
            ty => self.lir_type(ty, line).map(Some),
        }
    }

    fn struct_definition(
        &self,
        name: InternedSymbol,
        line: usize,
    ) -> Result<std::rc::Rc<scope::StructDefinition>> {
        match self.scopes.lookup(name) {
            Some(Binding::StructType(definition)) => Ok(definition.clone()),
            Some(_) => Err(self.error(line, CodegenErrorKind::NotAStruct(name))),
            None => Err(self.error(line, CodegenErrorKind::UnresolvedName(name))),
        }
    }
}

/// Lowers a whole program into a module whose entry function runs the
/// program's top level statements
pub fn lower_program(program: &ast::Program, options: &CodegenOptions) -> Result<lir::Module> {
    debug!("lowering {}", options.file_name);

    let host_declarations = runtime::host_declarations();
    let mut finished = runtime::emit_runtime_library();

    let mut used_symbols = HashSet::new();
    used_symbols.extend(runtime::RESERVED_SYMBOLS.iter().map(|s| InternedSymbol::new(s)));
    let entry_point = InternedSymbol::new(&options.entry_point);
    used_symbols.insert(entry_point);

    let mut ctx = LoweringContext {
        options,
        scopes: ScopeStack::new(),
        function: FunctionBuilder::new(entry_point, &[], None),
        function_depth: 0,
        return_type: Type::Void,
        finished: Vec::new(),
        static_strings: IndexVec::new(),
        used_symbols,
        anonymous_functions: 0,
    };

    ctx.scopes.push_scope();
    ctx.lower_block(&program.block)?;
    ctx.scopes.pop_scope();

    let LoweringContext {
        function,
        finished: user_functions,
        static_strings,
        ..
    } = ctx;

    finished.extend(user_functions);
    finished.push(function.finish());

    debug!(
        "lowered {} into {} functions",
        options.file_name,
        finished.len()
    );

    Ok(lir::Module {
        host_declarations,
        function_definitions: finished,
        static_strings,
    })
}
