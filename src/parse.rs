//! Análisis sintáctico.
//!
//! El parser es descendente recursivo con un token de lookahead (LL(1)).
//! La precedencia de operadores se codifica como una cadena de reglas,
//! cada una invocando a la regla del siguiente nivel. Ante un token
//! inesperado el parser registra el error y se re-sincroniza en modo
//! pánico, descartando tokens hasta el inicio de la siguiente sentencia,
//! por lo cual un mismo recorrido puede reportar varios errores
//! independientes.

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

use crate::{
    lex::{Identifier, Keyword, Token},
    semantic::Type,
    source::{Located, Location},
};

/// Raíz del árbol sintáctico: la secuencia de sentencias del programa.
#[derive(Debug)]
pub struct Ast {
    statements: Vec<Located<Statement>>,
}

impl Ast {
    /// Sentencias de nivel superior, en orden.
    pub fn statements(&self) -> &[Located<Statement>] {
        &self.statements
    }
}

/// Una sentencia del programa.
#[derive(Debug)]
pub enum Statement {
    /// `var x;` o `var x = expr;`
    Var {
        name: Located<Identifier>,
        init: Option<Expr>,
    },

    /// `x = expr;`
    Assign {
        target: Located<Identifier>,
        value: Expr,
    },

    /// `if (cond) { ... }` con rama `else { ... }` opcional.
    ///
    /// Ambas ramas son bloques obligatorios, de modo que un `else`
    /// siempre pertenece al `if` abierto más interno.
    If {
        condition: Expr,
        then_body: Block,
        else_body: Option<Block>,
    },

    /// `while (cond) { ... }`
    While { condition: Expr, body: Block },

    /// `for (init; cond; update) { ... }`, cada parte opcional.
    For {
        init: Option<Box<Located<Statement>>>,
        condition: Option<Expr>,
        update: Option<Box<Located<Statement>>>,
        body: Block,
    },

    /// `func name(params) { ... }`
    Func {
        name: Located<Identifier>,
        parameters: Vec<Located<Identifier>>,
        body: Block,
    },

    /// `return;` o `return expr;`
    Return { value: Option<Expr> },

    /// `print expr;`
    Print { value: Expr },

    /// Bloque `{ ... }` en posición de sentencia.
    Block(Block),
}

/// Secuencia de sentencias delimitada por llaves.
#[derive(Debug)]
pub struct Block(Vec<Located<Statement>>);

impl Block {
    /// Sentencias del bloque, en orden.
    pub fn statements(&self) -> &[Located<Statement>] {
        &self.0
    }
}

/// Una expresión, junto con su ubicación y el tipo que el análisis
/// semántico le resuelva.
#[derive(Debug)]
pub struct Expr {
    kind: ExprKind,
    location: Location,
    typ: Cell<Option<Type>>,
}

impl Expr {
    fn new(kind: ExprKind, location: Location) -> Self {
        Expr {
            kind,
            location,
            typ: Cell::new(None),
        }
    }

    /// Obtiene la forma de la expresión.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Obtiene la ubicación original.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Tipo resuelto durante análisis semántico, si ya ocurrió.
    pub fn typ(&self) -> Option<Type> {
        self.typ.get()
    }

    /// Anota el tipo resuelto de esta expresión.
    pub(crate) fn resolve(&self, typ: Type) {
        self.typ.set(Some(typ));
    }
}

/// Formas posibles de una expresión.
#[derive(Debug)]
pub enum ExprKind {
    /// Operación binaria.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Operación unaria.
    Unary { op: UnOp, operand: Box<Expr> },

    /// Lectura de una variable o parámetro.
    Id(Identifier),

    /// Literal de entero.
    Int(i64),

    /// Literal de flotante.
    Float(f64),

    /// Literal de string.
    Str(Rc<str>),

    /// Literal booleano.
    Bool(bool),

    /// Llamada a función por nombre.
    Call {
        callee: Located<Identifier>,
        args: Vec<Expr>,
    },
}

/// Operadores binarios.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use BinOp::*;
        let symbol = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Gt => ">",
            Le => "<=",
            Ge => ">=",
            And => "&&",
            Or => "||",
        };

        fmt.write_str(symbol)
    }
}

/// Operadores unarios.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
        })
    }
}

/// Error de análisis sintáctico.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected identifier")]
    ExpectedId,

    #[error("Expected a statement")]
    ExpectedStatement,

    #[error("Expected an expression")]
    ExpectedExpr,

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Palabras clave que inician una sentencia.
///
/// Este es el conjunto de sincronización del modo pánico: tras un
/// error, el parser descarta tokens hasta encontrar una de estas
/// palabras clave, una llave, o el final del programa.
pub const STATEMENT_KEYWORDS: &[Keyword] = &[
    Keyword::Var,
    Keyword::If,
    Keyword::While,
    Keyword::For,
    Keyword::Func,
    Keyword::Return,
    Keyword::Print,
];

/// Construye el árbol sintáctico de una secuencia completa de tokens.
///
/// `eof` es la ubicación a reportar cuando el programa termina de
/// forma abrupta. En caso de error se obtiene la lista completa de
/// errores recolectados durante la recuperación.
pub fn parse(
    tokens: &[Located<Token>],
    eof: Location,
) -> Result<Ast, Vec<Located<ParserError>>> {
    let last_known = tokens
        .first()
        .map(|token| token.location().clone())
        .unwrap_or(eof);

    let mut parser = Parser {
        tokens,
        position: 0,
        recovery: STATEMENT_KEYWORDS,
        last_known,
        errors: Vec::new(),
    };

    let ast = parser.program();
    if parser.errors.is_empty() {
        Ok(ast)
    } else {
        Err(parser.errors)
    }
}

struct Parser<'a> {
    tokens: &'a [Located<Token>],
    position: usize,
    recovery: &'static [Keyword],
    last_known: Location,
    errors: Vec<Located<ParserError>>,
}

type Parse<T> = Result<T, Located<ParserError>>;

impl<'a> Parser<'a> {
    fn program(&mut self) -> Ast {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            match self.statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.errors.push(error);
                    self.synchronize();
                }
            }
        }

        Ast { statements }
    }

    /// Descarta tokens hasta el inicio probable de la siguiente sentencia.
    fn synchronize(&mut self) {
        while let Some(token) = self.peek() {
            let synchronizes = match token {
                Token::OpenCurly | Token::CloseCurly => true,
                Token::Keyword(keyword) => self.recovery.contains(keyword),
                _ => false,
            };

            if synchronizes {
                return;
            }

            self.position += 1;
        }
    }

    fn statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.here();
        let statement = match self.peek() {
            Some(Token::Keyword(Keyword::Var)) => {
                let statement = self.var_declaration()?;
                self.expect(Token::Semicolon)?;
                statement
            }

            Some(Token::Id(_)) => {
                let statement = self.assignment()?;
                self.expect(Token::Semicolon)?;
                statement
            }

            Some(Token::Keyword(Keyword::If)) => self.if_statement()?,
            Some(Token::Keyword(Keyword::While)) => self.while_statement()?,
            Some(Token::Keyword(Keyword::For)) => self.for_statement()?,
            Some(Token::Keyword(Keyword::Func)) => self.function()?,
            Some(Token::Keyword(Keyword::Return)) => self.return_statement()?,
            Some(Token::Keyword(Keyword::Print)) => self.print_statement()?,
            Some(Token::OpenCurly) => Statement::Block(self.block()?.into_inner()),

            Some(_) => {
                let token = self.next()?;
                return Err(Located::at(
                    ParserError::ExpectedStatement,
                    token.location().clone(),
                ));
            }

            None => return self.fail(ParserError::UnexpectedEof),
        };

        Ok(Located::at(
            statement,
            Location::span(start, &self.last_known),
        ))
    }

    /// `var name [= expr]`, sin el `;` final.
    ///
    /// El `;` queda a cargo del llamador, ya que esta regla también
    /// aparece en el encabezado de un `for`.
    fn var_declaration(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Var)?;
        let name = self.id()?;

        let init = match self.peek() {
            Some(Token::Assign) => {
                self.next()?;
                Some(self.expr()?)
            }
            _ => None,
        };

        Ok(Statement::Var { name, init })
    }

    /// `name = expr`, sin el `;` final.
    fn assignment(&mut self) -> Parse<Statement> {
        let target = self.id()?;
        self.expect(Token::Assign)?;
        let value = self.expr()?;

        Ok(Statement::Assign { target, value })
    }

    fn if_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::If)?;
        self.expect(Token::OpenParen)?;
        let condition = self.expr()?;
        self.expect(Token::CloseParen)?;

        let then_body = self.block()?.into_inner();
        let else_body = match self.peek() {
            Some(Token::Keyword(Keyword::Else)) => {
                self.next()?;
                Some(self.block()?.into_inner())
            }
            _ => None,
        };

        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn while_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::While)?;
        self.expect(Token::OpenParen)?;
        let condition = self.expr()?;
        self.expect(Token::CloseParen)?;
        let body = self.block()?.into_inner();

        Ok(Statement::While { condition, body })
    }

    fn for_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::For)?;
        self.expect(Token::OpenParen)?;

        let init = match self.peek() {
            Some(Token::Semicolon) => None,
            _ => Some(Box::new(self.simple_statement()?)),
        };
        self.expect(Token::Semicolon)?;

        let condition = match self.peek() {
            Some(Token::Semicolon) => None,
            _ => Some(self.expr()?),
        };
        self.expect(Token::Semicolon)?;

        let update = match self.peek() {
            Some(Token::CloseParen) => None,
            _ => Some(Box::new(self.simple_statement()?)),
        };
        self.expect(Token::CloseParen)?;

        let body = self.block()?.into_inner();

        Ok(Statement::For {
            init,
            condition,
            update,
            body,
        })
    }

    /// Declaración o asignación sin `;`, para encabezados de `for`.
    fn simple_statement(&mut self) -> Parse<Located<Statement>> {
        let start = self.here();
        let statement = match self.peek() {
            Some(Token::Keyword(Keyword::Var)) => self.var_declaration()?,
            Some(Token::Id(_)) => self.assignment()?,
            _ => return Err(Located::at(ParserError::ExpectedStatement, self.here())),
        };

        Ok(Located::at(
            statement,
            Location::span(start, &self.last_known),
        ))
    }

    fn function(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Func)?;
        let name = self.id()?;

        self.expect(Token::OpenParen)?;
        let parameters = match self.peek() {
            Some(Token::CloseParen) => Vec::new(),
            _ => self.comma_separated(Self::id)?,
        };
        self.expect(Token::CloseParen)?;

        let body = self.block()?.into_inner();

        Ok(Statement::Func {
            name,
            parameters,
            body,
        })
    }

    fn return_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Return)?;

        let value = match self.peek() {
            Some(Token::Semicolon) => None,
            _ => Some(self.expr()?),
        };
        self.expect(Token::Semicolon)?;

        Ok(Statement::Return { value })
    }

    fn print_statement(&mut self) -> Parse<Statement> {
        self.keyword(Keyword::Print)?;
        let value = self.expr()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Print { value })
    }

    /// Bloque `{ ... }`.
    ///
    /// Los errores dentro del bloque se registran y re-sincronizan
    /// aquí mismo, de modo que un bloque dañado no arrastra al resto
    /// del programa.
    fn block(&mut self) -> Parse<Located<Block>> {
        let start = self.here();
        self.expect(Token::OpenCurly)?;

        let mut statements = Vec::new();
        loop {
            match self.peek() {
                None | Some(Token::CloseCurly) => break,
                _ => match self.statement() {
                    Ok(statement) => statements.push(statement),
                    Err(error) => {
                        self.errors.push(error);
                        self.synchronize();
                    }
                },
            }
        }

        self.expect(Token::CloseCurly)?;

        Ok(Located::at(
            Block(statements),
            Location::span(start, &self.last_known),
        ))
    }

    fn expr(&mut self) -> Parse<Expr> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Parse<Expr> {
        self.binary_level(&[(Token::Or, BinOp::Or)], Self::logical_and)
    }

    fn logical_and(&mut self) -> Parse<Expr> {
        self.binary_level(&[(Token::And, BinOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Parse<Expr> {
        self.binary_level(
            &[(Token::Eq, BinOp::Eq), (Token::Ne, BinOp::Ne)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Parse<Expr> {
        self.binary_level(
            &[
                (Token::Lt, BinOp::Lt),
                (Token::Gt, BinOp::Gt),
                (Token::Le, BinOp::Le),
                (Token::Ge, BinOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Parse<Expr> {
        self.binary_level(
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Parse<Expr> {
        self.binary_level(
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::Percent, BinOp::Mod),
            ],
            Self::unary,
        )
    }

    /// Consume operadores de un mismo nivel de precedencia, asociando
    /// por la izquierda, y delega los operandos al siguiente nivel.
    fn binary_level<F>(&mut self, operators: &[(Token, BinOp)], mut next: F) -> Parse<Expr>
    where
        F: FnMut(&mut Self) -> Parse<Expr>,
    {
        let mut expr = next(self)?;

        loop {
            let op = operators
                .iter()
                .find_map(|(token, op)| (self.peek() == Some(token)).then(|| *op));

            match op {
                None => break Ok(expr),
                Some(op) => {
                    self.next()?;
                    let right = next(self)?;

                    let location = Location::span(expr.location().clone(), right.location());
                    expr = Expr::new(
                        ExprKind::Binary {
                            op,
                            left: Box::new(expr),
                            right: Box::new(right),
                        },
                        location,
                    );
                }
            }
        }
    }

    fn unary(&mut self) -> Parse<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => Some(UnOp::Not),
            Some(Token::Minus) => Some(UnOp::Neg),
            _ => None,
        };

        match op {
            None => self.postfix(),
            Some(op) => {
                let start = self.here();
                self.next()?;

                let operand = self.unary()?;
                let location = Location::span(start, operand.location());

                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    location,
                ))
            }
        }
    }

    /// Expresión primaria seguida de cero o más sufijos de llamada.
    fn postfix(&mut self) -> Parse<Expr> {
        let mut expr = self.primary()?;

        while let Some(Token::OpenParen) = self.peek() {
            let location = expr.location.clone();

            // Solo se puede llamar a funciones por nombre
            let callee = match expr.kind {
                ExprKind::Id(id) => Located::at(id, location.clone()),
                _ => return Err(Located::at(ParserError::ExpectedId, location)),
            };

            self.next()?;
            let args = match self.peek() {
                Some(Token::CloseParen) => Vec::new(),
                _ => self.comma_separated(Self::expr)?,
            };
            self.expect(Token::CloseParen)?;

            let location = Location::span(location, &self.last_known);
            expr = Expr::new(ExprKind::Call { callee, args }, location);
        }

        Ok(expr)
    }

    fn primary(&mut self) -> Parse<Expr> {
        let (location, token) = self.next()?.clone().split();
        let kind = match token {
            Token::IntLiteral(value) => ExprKind::Int(value),
            Token::FloatLiteral(value) => ExprKind::Float(value),
            Token::StrLiteral(value) => ExprKind::Str(value),
            Token::BoolLiteral(value) => ExprKind::Bool(value),
            Token::Id(id) => ExprKind::Id(id),

            Token::OpenParen => {
                let expr = self.expr()?;
                self.expect(Token::CloseParen)?;
                return Ok(expr);
            }

            _ => return Err(Located::at(ParserError::ExpectedExpr, location)),
        };

        Ok(Expr::new(kind, location))
    }

    fn comma_separated<T, F>(&mut self, mut rule: F) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = vec![rule(self)?];

        while let Some(Token::Comma) = self.peek() {
            self.next()?;
            items.push(rule(self)?);
        }

        Ok(items)
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.clone().split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            _ => Err(Located::at(ParserError::ExpectedId, location)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        match self.tokens.get(self.position) {
            Some(found) if *found.val() == token => {
                self.position += 1;
                self.last_known = found.location().clone();
                Ok(())
            }

            Some(found) => Err(Located::at(
                ParserError::UnexpectedToken(token, found.val().clone()),
                found.location().clone(),
            )),

            None => self.fail(ParserError::MissingToken(token)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(Located::val)
    }

    /// Ubicación del siguiente token, o la última conocida al final.
    fn here(&self) -> Location {
        self.tokens
            .get(self.position)
            .map(|token| token.location().clone())
            .unwrap_or_else(|| self.last_known.clone())
    }

    fn next(&mut self) -> Parse<&'a Located<Token>> {
        match self.tokens.get(self.position) {
            Some(token) => {
                self.position += 1;
                self.last_known = token.location().clone();
                Ok(token)
            }

            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.last_known.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;
    use crate::source::Source;

    fn parse_source(text: &str) -> Result<Ast, Vec<Located<ParserError>>> {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(source.start(), source.chars())
            .try_exhaustive()
            .expect("unexpected lexical errors");

        parse(&tokens, source.end())
    }

    fn ast(text: &str) -> Ast {
        parse_source(text).expect("unexpected syntax errors")
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let ast = ast("var r = 2 + 3 * 4;");

        let init = match ast.statements()[0].val() {
            Statement::Var {
                init: Some(init), ..
            } => init,
            other => panic!("expected declaration, got {:?}", other),
        };

        match init.kind() {
            ExprKind::Binary {
                op: BinOp::Add,
                left,
                right,
            } => {
                assert!(matches!(left.kind(), ExprKind::Int(2)));
                assert!(matches!(
                    right.kind(),
                    ExprKind::Binary {
                        op: BinOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let ast = ast("var r = (2 + 3) * 4;");

        let init = match ast.statements()[0].val() {
            Statement::Var {
                init: Some(init), ..
            } => init,
            other => panic!("expected declaration, got {:?}", other),
        };

        assert!(matches!(
            init.kind(),
            ExprKind::Binary {
                op: BinOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn same_level_operators_associate_left() {
        let ast = ast("var r = 10 - 4 - 3;");

        let init = match ast.statements()[0].val() {
            Statement::Var {
                init: Some(init), ..
            } => init,
            other => panic!("expected declaration, got {:?}", other),
        };

        match init.kind() {
            ExprKind::Binary {
                op: BinOp::Sub,
                left,
                right,
            } => {
                assert!(matches!(
                    left.kind(),
                    ExprKind::Binary {
                        op: BinOp::Sub,
                        ..
                    }
                ));
                assert!(matches!(right.kind(), ExprKind::Int(3)));
            }
            other => panic!("expected subtraction at the root, got {:?}", other),
        }
    }

    #[test]
    fn unary_operators_are_right_associative() {
        let ast = ast("var r = - -5;");

        let init = match ast.statements()[0].val() {
            Statement::Var {
                init: Some(init), ..
            } => init,
            other => panic!("expected declaration, got {:?}", other),
        };

        match init.kind() {
            ExprKind::Unary {
                op: UnOp::Neg,
                operand,
            } => assert!(matches!(
                operand.kind(),
                ExprKind::Unary {
                    op: UnOp::Neg,
                    ..
                }
            )),
            other => panic!("expected nested negation, got {:?}", other),
        }
    }

    #[test]
    fn if_statement_with_else_blocks() {
        let ast = ast("if (x > 0) { print 1; } else { print 2; }");

        match ast.statements()[0].val() {
            Statement::If {
                then_body,
                else_body: Some(else_body),
                ..
            } => {
                assert_eq!(then_body.statements().len(), 1);
                assert_eq!(else_body.statements().len(), 1);
            }
            other => panic!("expected if/else, got {:?}", other),
        }
    }

    #[test]
    fn else_requires_a_block() {
        // `else if` encadenado no es parte de la gramática
        let errors = parse_source("if (a) { } else if (b) { }").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn for_header_parts_are_optional() {
        let ast = ast("for (;;) { }");

        match ast.statements()[0].val() {
            Statement::For {
                init: None,
                condition: None,
                update: None,
                ..
            } => (),
            other => panic!("expected bare for, got {:?}", other),
        }
    }

    #[test]
    fn full_for_header() {
        let ast = ast("for (var i = 0; i < 10; i = i + 1) { print i; }");

        match ast.statements()[0].val() {
            Statement::For {
                init: Some(init),
                condition: Some(_),
                update: Some(update),
                ..
            } => {
                assert!(matches!(init.val(), Statement::Var { .. }));
                assert!(matches!(update.val(), Statement::Assign { .. }));
            }
            other => panic!("expected full for, got {:?}", other),
        }
    }

    #[test]
    fn function_declaration_with_parameters() {
        let ast = ast("func add(a, b) { return a + b; }");

        match ast.statements()[0].val() {
            Statement::Func {
                name, parameters, ..
            } => {
                assert_eq!(name.val().as_ref(), "add");
                assert_eq!(parameters.len(), 2);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn call_arguments_are_ordered() {
        let ast = ast("x = add(1, 2.5, \"s\");");

        match ast.statements()[0].val() {
            Statement::Assign { value, .. } => match value.kind() {
                ExprKind::Call { callee, args } => {
                    assert_eq!(callee.val().as_ref(), "add");
                    assert_eq!(args.len(), 3);
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn standalone_blocks_are_statements() {
        let ast = ast("{ var x = 1; }");
        assert!(matches!(ast.statements()[0].val(), Statement::Block(_)));
    }

    #[test]
    fn bare_calls_are_not_statements() {
        let errors = parse_source("foo();").unwrap_err();
        assert!(matches!(
            errors[0].val(),
            ParserError::UnexpectedToken(Token::Assign, Token::OpenParen)
        ));
    }

    #[test]
    fn recovery_collects_independent_errors() {
        let errors = parse_source("var 1 = 2;\nprint ;\nvar ok = 3;").unwrap_err();

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0].val(), ParserError::ExpectedId));
        assert!(matches!(errors[1].val(), ParserError::ExpectedExpr));
        assert_eq!(errors[0].location().start().line(), 1);
        assert_eq!(errors[1].location().start().line(), 2);
    }

    #[test]
    fn recovery_works_inside_blocks() {
        let errors = parse_source("func f() { var 1; print 2; } print ;").unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn abrupt_end_is_reported() {
        let errors = parse_source("var x = 1 +").unwrap_err();
        assert!(matches!(errors[0].val(), ParserError::UnexpectedEof));
    }

    #[test]
    fn empty_program_is_valid() {
        let ast = ast("// nothing but a comment\n");
        assert!(ast.statements().is_empty());
    }
}
