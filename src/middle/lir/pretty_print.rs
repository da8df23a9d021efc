use std::fmt::Write;

use colored::Colorize;
use itertools::Itertools;

use crate::{index::Index, middle::lir};

/// Renders a whole module, host declarations first, then static strings and
/// finally every function definition in emission order
pub fn pretty_print_module(module: &lir::Module) -> String {
    let mut out = String::new();

    for host in &module.host_declarations {
        let mut parameters = host.parameters.iter().map(|ty| ty.to_string()).collect_vec();
        if host.variadic {
            parameters.push("...".to_owned());
        }

        let _ = write!(
            out,
            "{} {}{}{}{}",
            "declare".magenta(),
            host.symbol_name.value().blue(),
            "(".white(),
            parameters.join(", ").white(),
            ")".white()
        );
        if let Some(ty) = &host.return_type {
            let _ = write!(out, " {} {ty}", "->".white());
        }
        out.push('\n');
    }

    if !module.host_declarations.is_empty() {
        out.push('\n');
    }

    for (id, string) in module.static_strings.enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {}",
            "static".magenta(),
            lir::Immediate::StaticLabel(id).to_string().purple(),
            "=".white(),
            format!("{:?}", string.value()).green()
        );
    }

    if !module.static_strings.is_empty() {
        out.push('\n');
    }

    out.push_str(
        &module
            .function_definitions
            .iter()
            .map(pretty_print_function)
            .join("\n"),
    );

    out
}

pub fn pretty_print_function(function: &lir::FunctionDefinition) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "{} {}{}",
        "fn".magenta(),
        function.symbol_name.value().blue(),
        "(".white()
    );

    let _ = write!(
        out,
        "{}",
        function
            .arguments
            .iter()
            .map(|arg| format!("{arg}: {}", function.register_type(*arg)))
            .join(", ")
            .white()
    );

    let _ = write!(out, "{}", ")".white());
    if let Some(ty) = &function.return_type {
        let _ = write!(out, " {} {ty}", "->".white());
    }
    let _ = writeln!(out, "{}", " {".white());

    for block in &function.blocks {
        let _ = writeln!(
            out,
            "{} {}",
            format!("{}:", block.id).bright_red(),
            format!("; {}", block.label).bright_black()
        );

        for instruction in &block.instructions {
            let _ = writeln!(out, "    {instruction}");
        }
    }

    let _ = writeln!(out, "{}", "}".white());

    out
}

impl core::fmt::Display for lir::Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            lir::Instruction::LoadMem {
                destination,
                source,
            } => write!(
                f,
                "{destination} {} {} {source}",
                "=".white(),
                "load".cyan()
            ),
            lir::Instruction::StoreMem {
                destination,
                source,
            } => {
                write!(
                    f,
                    "{} {destination} {} {source}",
                    "store".cyan(),
                    "<-".white()
                )
            }
            lir::Instruction::AllocStack { destination, ty } => {
                write!(f, "{destination} {} {} {ty}", "=".white(), "alloc".cyan())
            }
            lir::Instruction::GetStructElementPointer {
                destination,
                source,
                ty,
                index,
            } => write!(
                f,
                "{destination} {} {} {source}, {}, {}",
                "=".white(),
                "get_struct_element_ptr".cyan(),
                lir::Type::Struct(ty.clone()),
                index.to_string().purple()
            ),
            lir::Instruction::GetElementPointer {
                destination,
                source,
                element,
                index,
            } => write!(
                f,
                "{destination} {} {} {source}, {element}, {index}",
                "=".white(),
                "get_element_ptr".cyan(),
            ),
            lir::Instruction::Move {
                destination,
                source,
            } => {
                write!(f, "{destination} {} {source}", "=".white())
            }
            lir::Instruction::UnaryOperation {
                operator,
                destination,
                operand,
            } => {
                write!(
                    f,
                    "{destination} {} {} {operand}",
                    "=".white(),
                    operator.to_string().cyan()
                )
            }
            lir::Instruction::BinaryOperation {
                operator,
                destination,
                lhs,
                rhs,
            } => {
                write!(
                    f,
                    "{destination} {} {} {lhs}, {rhs}",
                    "=".white(),
                    operator.to_string().cyan()
                )
            }
            lir::Instruction::Compare {
                predicate,
                destination,
                lhs,
                rhs,
            } => {
                let instruction = if predicate.is_floating() { "fcmp" } else { "icmp" };

                write!(
                    f,
                    "{destination} {} {} {} {lhs}, {rhs}",
                    "=".white(),
                    instruction.cyan(),
                    predicate.to_string().cyan()
                )
            }
            lir::Instruction::Cast {
                kind,
                destination,
                operand,
            } => {
                write!(
                    f,
                    "{destination} {} {} {operand}",
                    "=".white(),
                    kind.to_string().cyan()
                )
            }
            lir::Instruction::Branch {
                condition,
                positive,
                negative,
            } => {
                write!(
                    f,
                    "{} {condition} {} {}",
                    "br".cyan(),
                    positive.to_string().blue(),
                    negative.to_string().blue()
                )
            }
            lir::Instruction::Jump { destination } => {
                write!(f, "{} {}", "jmp".cyan(), destination.to_string().blue())
            }
            lir::Instruction::Switch {
                value,
                default,
                cases,
            } => {
                write!(
                    f,
                    "{} {value} {} [{}]",
                    "switch".cyan(),
                    default.to_string().blue(),
                    cases
                        .iter()
                        .map(|(value, block)| format!(
                            "{} -> {}",
                            value.to_string().purple(),
                            block.to_string().blue()
                        ))
                        .join(", ")
                )
            }
            lir::Instruction::Return { value: Some(value) } => {
                write!(f, "{} {value}", "ret".cyan())
            }
            lir::Instruction::Return { value: None } => {
                write!(f, "{}", "ret".cyan())
            }
            lir::Instruction::FunctionCall {
                target,
                arguments,
                destination,
            } => {
                if let Some(dest) = destination {
                    write!(f, "{dest} {} ", "=".white())?;
                }
                write!(
                    f,
                    "{} {target}({})",
                    "call".cyan(),
                    arguments.iter().map(|op| op.to_string()).join(", ")
                )
            }
        }
    }
}

impl core::fmt::Display for lir::RegisterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("%{}", self.index()).yellow())
    }
}

impl core::fmt::Display for lir::BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".label_{}", self.index())
    }
}

impl core::fmt::Display for lir::Immediate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            lir::Immediate::Int(value, lir::IntegerWidth::I1) => write!(f, "{}", *value != 0),
            lir::Immediate::Int(value, _) => write!(f, "{value}"),
            lir::Immediate::Float(value, _) => write!(f, "{value:?}"),
            lir::Immediate::Null => write!(f, "null"),
            lir::Immediate::StaticLabel(value) => write!(f, "@str_{}", value.index()),
            lir::Immediate::FunctionLabel(s) => write!(f, "@{}", s.value()),
        }
    }
}

impl core::fmt::Display for lir::Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            lir::Operand::Immediate(immediate) => write!(f, "{}", immediate.to_string().purple()),
            lir::Operand::Register(register_id) => write!(f, "{register_id}"),
        }
    }
}

impl core::fmt::Display for lir::Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            lir::Type::Integer(integer_width) => write!(f, "i{}", integer_width.bits()),
            lir::Type::Float(lir::FloatWidth::F32) => write!(f, "f32"),
            lir::Type::Float(lir::FloatWidth::F64) => write!(f, "f64"),
            lir::Type::Pointer => write!(f, "ptr"),
            lir::Type::Struct(fields) => {
                write!(f, "{{ {} }}", fields.0.iter().join(", "))
            }
        }
    }
}
