use std::fmt::{self, Display};
use std::rc::Rc;

use crate::lex::Identifier;
use crate::parse::{BinOp, UnOp};

/// Un temporal generado por el compilador, `tN`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Temp(pub u32);

impl Display for Temp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "t{}", self.0)
    }
}

/// Una etiqueta de salto, `LN`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Label(pub u32);

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "L{}", self.0)
    }
}

/// Operando de una instrucción: un nombre, un temporal o una constante.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Var(Identifier),
    Temp(Temp),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
}

impl Display for Operand {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) => name.fmt(fmt),
            Operand::Temp(temp) => temp.fmt(fmt),
            Operand::Int(value) => value.fmt(fmt),
            // Un flotante siempre se escribe con punto decimal
            Operand::Float(value) => write!(fmt, "{:?}", value),
            Operand::Str(value) => write!(fmt, "\"{}\"", value),
            Operand::Bool(value) => value.fmt(fmt),
        }
    }
}

/// Una instrucción de tres direcciones.
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// `name = ASSIGN value`
    Assign { target: Identifier, value: Operand },

    /// `tN = left op right`
    Binary {
        target: Temp,
        op: BinOp,
        left: Operand,
        right: Operand,
    },

    /// `tN = op operand`
    Unary {
        target: Temp,
        op: UnOp,
        operand: Operand,
    },

    /// `LABEL Lk`
    Label(Label),

    /// `GOTO Lk`
    Jump(Label),

    /// `IF_FALSE cond Lk`
    JumpIfFalse { condition: Operand, target: Label },

    /// `tN = CALL name`, con sus argumentos ya evaluados en orden.
    Call {
        target: Temp,
        function: Identifier,
        arguments: Vec<Operand>,
    },

    /// `FUNCTION name`, marcador de entrada de una función.
    Function(Identifier),

    /// `PARAM name`, un parámetro declarado, en orden.
    Param(Identifier),

    /// `RETURN [value]`
    Return(Option<Operand>),

    /// `PRINT value`
    Print(Operand),
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Assign { target, value } => write!(fmt, "{} = ASSIGN {}", target, value),
            Binary {
                target,
                op,
                left,
                right,
            } => write!(fmt, "{} = {} {} {}", target, left, op, right),
            Unary {
                target,
                op,
                operand,
            } => write!(fmt, "{} = {} {}", target, op, operand),
            Label(label) => write!(fmt, "LABEL {}", label),
            Jump(label) => write!(fmt, "GOTO {}", label),
            JumpIfFalse { condition, target } => write!(fmt, "IF_FALSE {} {}", condition, target),
            Call {
                target, function, ..
            } => write!(fmt, "{} = CALL {}", target, function),
            Function(name) => write!(fmt, "FUNCTION {}", name),
            Param(name) => write!(fmt, "PARAM {}", name),
            Return(None) => fmt.write_str("RETURN"),
            Return(Some(value)) => write!(fmt, "RETURN {}", value),
            Print(value) => write!(fmt, "PRINT {}", value),
        }
    }
}

/// Secuencia ordenada de instrucciones de una unidad de compilación.
///
/// El `Display` produce el listado externo esperado: una instrucción
/// por línea, con su índice basado en cero como prefijo.
#[derive(Debug, PartialEq)]
pub struct Program(Vec<Instruction>);

impl Program {
    /// Instrucciones en orden de emisión.
    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(code: Vec<Instruction>) -> Self {
        Program(code)
    }
}

impl Display for Program {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.0.iter().enumerate() {
            writeln!(fmt, "{}: {}", index, instruction)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_rendering() {
        let cases: Vec<(Instruction, &str)> = vec![
            (
                Instruction::Assign {
                    target: Identifier::from("x"),
                    value: Operand::Int(10),
                },
                "x = ASSIGN 10",
            ),
            (
                Instruction::Binary {
                    target: Temp(1),
                    op: BinOp::Add,
                    left: Operand::Var(Identifier::from("x")),
                    right: Operand::Var(Identifier::from("y")),
                },
                "t1 = x + y",
            ),
            (
                Instruction::Unary {
                    target: Temp(2),
                    op: UnOp::Not,
                    operand: Operand::Bool(true),
                },
                "t2 = ! true",
            ),
            (Instruction::Label(Label(3)), "LABEL L3"),
            (Instruction::Jump(Label(3)), "GOTO L3"),
            (
                Instruction::JumpIfFalse {
                    condition: Operand::Temp(Temp(1)),
                    target: Label(3),
                },
                "IF_FALSE t1 L3",
            ),
            (
                Instruction::Call {
                    target: Temp(4),
                    function: Identifier::from("add"),
                    arguments: vec![Operand::Int(1), Operand::Int(2)],
                },
                "t4 = CALL add",
            ),
            (Instruction::Function(Identifier::from("add")), "FUNCTION add"),
            (Instruction::Param(Identifier::from("a")), "PARAM a"),
            (Instruction::Return(None), "RETURN"),
            (
                Instruction::Return(Some(Operand::Temp(Temp(1)))),
                "RETURN t1",
            ),
            (Instruction::Print(Operand::Str(Rc::from("hi"))), "PRINT \"hi\""),
        ];

        for (instruction, expected) in cases {
            assert_eq!(instruction.to_string(), expected);
        }
    }

    #[test]
    fn floats_always_carry_a_decimal_point() {
        assert_eq!(Operand::Float(10.0).to_string(), "10.0");
        assert_eq!(Operand::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn listing_is_zero_indexed() {
        let program = Program::from(vec![
            Instruction::Assign {
                target: Identifier::from("x"),
                value: Operand::Int(1),
            },
            Instruction::Print(Operand::Var(Identifier::from("x"))),
        ]);

        assert_eq!(program.to_string(), "0: x = ASSIGN 1\n1: PRINT x\n");
    }
}
