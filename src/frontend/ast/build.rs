//! Constructors for annotated trees.
//!
//! The parser and the semantic checker assemble trees through these helpers,
//! which fill in the resolved type of each expression from its operands.
//! Every node starts out on line 1; use [`AtLine::at`] to move it.

use std::rc::Rc;

use super::{
    AssignmentOperatorKind, BinaryOperatorKind, Block, CaseValue, Condition, ConditionalBranch,
    Expression, ExpressionKind, FieldInitializer, FunctionDeclaration, FunctionParameter, Literal,
    NamedArgument, Program, Statement, StatementKind, StructDeclaration, StructField, SwitchCase,
    UnaryOperatorKind,
};
use crate::{
    frontend::intern::InternedSymbol,
    middle::ty::{Type, binary_operation_type},
};

/// Sets the source line a node is attributed to
pub trait AtLine: Sized {
    fn at(self, line: usize) -> Self;
}

impl AtLine for Statement {
    fn at(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

impl AtLine for Expression {
    fn at(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

fn expression(ty: Type, kind: ExpressionKind) -> Expression {
    Expression { line: 1, ty, kind }
}

fn statement(kind: StatementKind) -> Statement {
    Statement { line: 1, kind }
}

pub fn program(statements: Vec<Statement>) -> Program {
    Program {
        block: block(statements),
    }
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block { statements }
}

/* Expressions */

pub fn int(value: i64) -> Expression {
    expression(Type::INT, ExpressionKind::Literal(Literal::Integer(value)))
}

pub fn dec(value: f64) -> Expression {
    expression(Type::DEC, ExpressionKind::Literal(Literal::Float(value)))
}

pub fn boolean(value: bool) -> Expression {
    expression(Type::BOOL, ExpressionKind::Literal(Literal::Boolean(value)))
}

pub fn string(value: &str) -> Expression {
    expression(
        Type::Str,
        ExpressionKind::Literal(Literal::String(InternedSymbol::new(value))),
    )
}

pub fn var(name: &str, ty: Type) -> Expression {
    expression(ty, ExpressionKind::Variable(InternedSymbol::new(name)))
}

pub fn binary(lhs: Expression, operator: BinaryOperatorKind, rhs: Expression) -> Expression {
    let ty = binary_operation_type(operator, &lhs.ty, &rhs.ty).unwrap_or_else(|| lhs.ty.clone());

    expression(
        ty,
        ExpressionKind::Binary {
            lhs: Box::new(lhs),
            operator,
            rhs: Box::new(rhs),
        },
    )
}

pub fn unary(operator: UnaryOperatorKind, operand: Expression) -> Expression {
    let ty = match operator {
        UnaryOperatorKind::LogicalNot => Type::BOOL,
        _ => operand.ty.clone(),
    };

    expression(
        ty,
        ExpressionKind::Unary {
            operator,
            operand: Box::new(operand),
        },
    )
}

pub fn cast(value: Expression, target: Type) -> Expression {
    expression(
        target.clone(),
        ExpressionKind::Cast {
            expression: Box::new(value),
            target,
        },
    )
}

pub fn call(name: &str, return_type: Type, arguments: Vec<Expression>) -> Expression {
    call_named(name, return_type, arguments, Vec::new())
}

pub fn call_named(
    name: &str,
    return_type: Type,
    arguments: Vec<Expression>,
    named_arguments: Vec<(&str, Expression)>,
) -> Expression {
    expression(
        return_type,
        ExpressionKind::FunctionCall {
            name: InternedSymbol::new(name),
            arguments,
            named_arguments: named_arguments
                .into_iter()
                .map(|(name, value)| NamedArgument {
                    name: InternedSymbol::new(name),
                    value,
                })
                .collect(),
        },
    )
}

pub fn anonymous_function(
    parameters: Vec<FunctionParameter>,
    return_type: Type,
    body: Vec<Statement>,
) -> Expression {
    expression(
        Type::Function,
        ExpressionKind::AnonymousFunction(Rc::new(FunctionDeclaration {
            line: 1,
            name: None,
            parameters,
            varargs: None,
            return_type,
            body: block(body),
        })),
    )
}

pub fn collection(element_type: Type, items: Vec<Expression>) -> Expression {
    expression(Type::array(element_type), ExpressionKind::Collection(items))
}

pub fn index(collection: Expression, index: Expression) -> Expression {
    let ty = collection.ty.element_type().unwrap_or(Type::INT);

    expression(
        ty,
        ExpressionKind::CollectionAccess {
            collection: Box::new(collection),
            index: Box::new(index),
        },
    )
}

pub fn range(start: Expression, stop: Expression) -> Expression {
    expression(
        Type::array(Type::INT),
        ExpressionKind::Range {
            start: Box::new(start),
            stop: Box::new(stop),
        },
    )
}

pub fn struct_literal(name: &str, fields: Vec<(&str, Expression)>) -> Expression {
    let name = InternedSymbol::new(name);

    expression(
        Type::Struct(name),
        ExpressionKind::StructLiteral {
            name,
            fields: fields
                .into_iter()
                .map(|(name, value)| FieldInitializer {
                    name: InternedSymbol::new(name),
                    value,
                })
                .collect(),
        },
    )
}

pub fn field(object: Expression, field: &str, ty: Type) -> Expression {
    expression(
        ty,
        ExpressionKind::FieldAccess {
            object: Box::new(object),
            field: InternedSymbol::new(field),
        },
    )
}

pub fn input(prompt: Option<Expression>) -> Expression {
    expression(Type::INT, ExpressionKind::Input(prompt.map(Box::new)))
}

/* Statements */

pub fn declare(name: &str, ty: Type, initializer: Option<Expression>) -> Statement {
    statement(StatementKind::VariableDeclaration {
        name: InternedSymbol::new(name),
        ty,
        initializer: initializer.map(Box::new),
    })
}

pub fn assign(target: Expression, value: Expression) -> Statement {
    statement(StatementKind::Assignment {
        target: Box::new(target),
        value: Box::new(value),
    })
}

/// Assigns to a plain variable whose type is the type of the value
pub fn assign_var(name: &str, value: Expression) -> Statement {
    let target = var(name, value.ty.clone());
    assign(target, value)
}

pub fn operator_assign(
    target: Expression,
    operator: AssignmentOperatorKind,
    value: Expression,
) -> Statement {
    statement(StatementKind::OperatorAssignment {
        operator,
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn if_chain(branches: Vec<(Option<Expression>, Vec<Statement>)>) -> Statement {
    statement(StatementKind::If {
        branches: branches
            .into_iter()
            .map(|(condition, body)| ConditionalBranch {
                condition: match condition {
                    Some(c) => Condition::Expression(Box::new(c)),
                    None => Condition::Else,
                },
                block: block(body),
            })
            .collect(),
    })
}

pub fn if_then(condition: Expression, body: Vec<Statement>) -> Statement {
    if_chain(vec![(Some(condition), body)])
}

pub fn while_loop(condition: Expression, body: Vec<Statement>) -> Statement {
    statement(StatementKind::While {
        condition: Box::new(condition),
        block: block(body),
    })
}

pub fn for_loop(elements: &[&str], iterable: Expression, body: Vec<Statement>) -> Statement {
    statement(StatementKind::For {
        elements: elements.iter().map(|e| InternedSymbol::new(e)).collect(),
        iterable: Box::new(iterable),
        block: block(body),
    })
}

pub fn switch(value: Expression, cases: Vec<SwitchCase>) -> Statement {
    statement(StatementKind::Switch {
        value: Box::new(value),
        cases,
    })
}

pub fn case(value: Expression, body: Vec<Statement>) -> SwitchCase {
    SwitchCase {
        line: value.line,
        value: CaseValue::Expression(Box::new(value)),
        block: block(body),
    }
}

pub fn default_case(body: Vec<Statement>) -> SwitchCase {
    SwitchCase {
        line: 1,
        value: CaseValue::Default,
        block: block(body),
    }
}

pub fn break_statement() -> Statement {
    statement(StatementKind::Break)
}

pub fn continue_statement() -> Statement {
    statement(StatementKind::Continue)
}

pub fn pass() -> Statement {
    statement(StatementKind::Pass)
}

pub fn parameter(name: &str, ty: Type) -> FunctionParameter {
    FunctionParameter {
        name: InternedSymbol::new(name),
        ty,
        default: None,
    }
}

pub fn parameter_with_default(name: &str, ty: Type, default: Expression) -> FunctionParameter {
    FunctionParameter {
        name: InternedSymbol::new(name),
        ty,
        default: Some(default),
    }
}

pub fn function(
    name: &str,
    parameters: Vec<FunctionParameter>,
    return_type: Type,
    body: Vec<Statement>,
) -> Statement {
    function_with_varargs(name, parameters, None, return_type, body)
}

pub fn function_with_varargs(
    name: &str,
    parameters: Vec<FunctionParameter>,
    varargs: Option<(&str, Type)>,
    return_type: Type,
    body: Vec<Statement>,
) -> Statement {
    statement(StatementKind::FunctionDeclaration(Rc::new(FunctionDeclaration {
        line: 1,
        name: Some(InternedSymbol::new(name)),
        parameters,
        varargs: varargs.map(|(name, ty)| (InternedSymbol::new(name), ty)),
        return_type,
        body: block(body),
    })))
}

pub fn struct_declaration(name: &str, fields: Vec<(&str, Type)>) -> Statement {
    statement(StatementKind::StructDeclaration(StructDeclaration {
        name: InternedSymbol::new(name),
        fields: fields
            .into_iter()
            .map(|(name, ty)| StructField {
                name: InternedSymbol::new(name),
                ty,
            })
            .collect(),
    }))
}

pub fn return_value(value: Expression) -> Statement {
    statement(StatementKind::Return(Some(Box::new(value))))
}

pub fn return_void() -> Statement {
    statement(StatementKind::Return(None))
}

pub fn print(value: Expression) -> Statement {
    statement(StatementKind::Print(Some(Box::new(value))))
}

pub fn print_newline() -> Statement {
    statement(StatementKind::Print(None))
}

pub fn expression_statement(value: Expression) -> Statement {
    statement(StatementKind::Expression(Box::new(value)))
}
