//! Generación de código intermedio.
//!
//! Esta fase recorre el árbol ya validado y anotado por análisis
//! semántico y lo aplana en una secuencia lineal de instrucciones de
//! tres direcciones. Asume que su entrada pasó el análisis sin
//! errores; un árbol defectuoso aquí es un defecto de una fase
//! anterior, no del programa fuente.

use std::rc::Rc;

use crate::{
    ir::{Instruction, Label, Operand, Program, Temp},
    parse::{Ast, Block, Expr, ExprKind, Statement},
    source::Located,
};

/// Aplana un programa completo con un [`Builder`] fresco.
pub fn generate(ast: &Ast) -> Program {
    Builder::default().generate(ast)
}

/// Estado de emisión de una unidad de compilación.
///
/// El builder es un valor explícito: porta el buffer de instrucciones
/// y los contadores de temporales y etiquetas, que crecen de forma
/// monótona y nunca se reutilizan. Cada compilación construye el suyo,
/// por lo cual compilaciones independientes no comparten estado.
#[derive(Default)]
pub struct Builder {
    code: Vec<Instruction>,
    temps: u32,
    labels: u32,
}

impl Builder {
    /// Emite el programa completo y entrega el listado final.
    pub fn generate(mut self, ast: &Ast) -> Program {
        for statement in ast.statements() {
            self.statement(statement);
        }

        Program::from(self.code)
    }

    fn temp(&mut self) -> Temp {
        self.temps += 1;
        Temp(self.temps)
    }

    fn label(&mut self) -> Label {
        self.labels += 1;
        Label(self.labels)
    }

    fn push(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn statement(&mut self, statement: &Located<Statement>) {
        match statement.val() {
            // Una declaración sin inicializador no emite nada
            Statement::Var { init: None, .. } => (),

            Statement::Var {
                name,
                init: Some(init),
            } => {
                let value = self.eval(init);
                self.push(Instruction::Assign {
                    target: name.val().clone(),
                    value,
                });
            }

            Statement::Assign { target, value } => {
                let value = self.eval(value);
                self.push(Instruction::Assign {
                    target: target.val().clone(),
                    value,
                });
            }

            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                let condition = self.eval(condition);
                let alternative = self.label();

                self.push(Instruction::JumpIfFalse {
                    condition,
                    target: alternative,
                });
                self.block(then_body);

                match else_body {
                    // Sin rama else la etiqueta de salida sigue
                    // directamente al cuerpo
                    None => self.push(Instruction::Label(alternative)),

                    Some(else_body) => {
                        let end = self.label();
                        self.push(Instruction::Jump(end));
                        self.push(Instruction::Label(alternative));
                        self.block(else_body);
                        self.push(Instruction::Label(end));
                    }
                }
            }

            Statement::While { condition, body } => {
                let start = self.label();
                let end = self.label();

                self.push(Instruction::Label(start));
                let condition = self.eval(condition);
                self.push(Instruction::JumpIfFalse {
                    condition,
                    target: end,
                });

                self.block(body);
                self.push(Instruction::Jump(start));
                self.push(Instruction::Label(end));
            }

            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                // El init corre una sola vez, antes del ciclo
                if let Some(init) = init {
                    self.statement(init);
                }

                let start = self.label();
                let end = self.label();

                self.push(Instruction::Label(start));

                // Un for sin condición itera sin salida condicional
                if let Some(condition) = condition {
                    let condition = self.eval(condition);
                    self.push(Instruction::JumpIfFalse {
                        condition,
                        target: end,
                    });
                }

                self.block(body);

                // El update es lo último del cuerpo, justo antes del
                // salto de retorno
                if let Some(update) = update {
                    self.statement(update);
                }

                self.push(Instruction::Jump(start));
                self.push(Instruction::Label(end));
            }

            Statement::Func {
                name,
                parameters,
                body,
            } => {
                self.push(Instruction::Function(name.val().clone()));

                for parameter in parameters {
                    self.push(Instruction::Param(parameter.val().clone()));
                }

                self.block(body);

                // Caída implícita al final del cuerpo
                self.push(Instruction::Return(None));
            }

            Statement::Return { value } => {
                let value = value.as_ref().map(|value| self.eval(value));
                self.push(Instruction::Return(value));
            }

            Statement::Print { value } => {
                let value = self.eval(value);
                self.push(Instruction::Print(value));
            }

            Statement::Block(block) => self.block(block),
        }
    }

    fn block(&mut self, block: &Block) {
        for statement in block.statements() {
            self.statement(statement);
        }
    }

    /// Evalúa una expresión en postorden.
    ///
    /// Literales y nombres pasan directo como operandos; toda operación
    /// binaria, unaria o llamada materializa un temporal nuevo.
    fn eval(&mut self, expr: &Expr) -> Operand {
        debug_assert!(expr.typ().is_some(), "tree reached lowering unannotated");

        match expr.kind() {
            ExprKind::Int(value) => Operand::Int(*value),
            ExprKind::Float(value) => Operand::Float(*value),
            ExprKind::Str(value) => Operand::Str(Rc::clone(value)),
            ExprKind::Bool(value) => Operand::Bool(*value),
            ExprKind::Id(id) => Operand::Var(id.clone()),

            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left);
                let right = self.eval(right);
                let target = self.temp();

                self.push(Instruction::Binary {
                    target,
                    op: *op,
                    left,
                    right,
                });

                Operand::Temp(target)
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand);
                let target = self.temp();

                self.push(Instruction::Unary {
                    target,
                    op: *op,
                    operand,
                });

                Operand::Temp(target)
            }

            ExprKind::Call { callee, args } => {
                let arguments = args.iter().map(|arg| self.eval(arg)).collect();
                let target = self.temp();

                self.push(Instruction::Call {
                    target,
                    function: callee.val().clone(),
                    arguments,
                });

                Operand::Temp(target)
            }
        }
    }
}
