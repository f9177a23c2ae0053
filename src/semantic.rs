//! Análisis semántico.
//!
//! Un solo recorrido en profundidad resuelve nombres contra la tabla
//! de símbolos, infiere y valida tipos, y anota cada expresión del
//! árbol con su tipo resuelto. Los errores se acumulan a lo largo de
//! todo el programa en vez de abortar con el primero; la fase falla
//! en conjunto si la lista resultante no está vacía.

use thiserror::Error;

use std::{
    cell::Cell,
    collections::HashMap,
    fmt::{self, Display},
};

use crate::{
    lex::Identifier,
    parse::{Ast, BinOp, Block, Expr, ExprKind, Statement, UnOp},
    source::{Located, Location},
};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

/// Error de análisis semántico.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    /// Uso de un nombre que ningún scope visible declara.
    #[error("Symbol `{0}` is undefined")]
    Undefined(Identifier),

    /// Segunda declaración de un nombre en el mismo scope.
    #[error("Redefinition of symbol `{0}` in the same scope")]
    Redefined(Identifier),

    /// El tipo encontrado no es el que el contexto exige.
    #[error("Type mismatch: expected `{0}`, found `{1}`")]
    ExpectedType(Type, Type),

    /// Se esperaba un operando numérico.
    #[error("Type mismatch: expected `int` or `float`, found `{0}`")]
    ExpectedNumeric(Type),

    /// Combinación de operandos que el operador no define.
    #[error("Operator `{1}` cannot be applied to `{0}` and `{2}`")]
    BadOperands(Type, BinOp, Type),

    /// La condición de un `if`/`while`/`for` no es booleana.
    #[error("Condition must be `bool`, found `{0}`")]
    BadCondition(Type),

    /// Se esperaba una variable, no una función.
    #[error("Expected variable, found function `{0}`")]
    ExpectedVar(Identifier),

    /// Solo las funciones pueden llamarse.
    #[error("Symbol `{0}` is not a function")]
    NotCallable(Identifier),

    /// La cantidad de argumentos no coincide con los parámetros declarados.
    #[error("Function `{0}` takes {1} argument(s), {2} were given")]
    BadArgumentCount(Identifier, usize, usize),
}

/// Tipos primitivos del lenguaje.
///
/// `Unresolved` describe valores cuyo tipo aún no se conoce: variables
/// sin inicializador, parámetros y resultados de funciones. La primera
/// asignación a una variable `Unresolved` fija su tipo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    Unresolved,
}

impl Type {
    /// Determina si el tipo participa en aritmética.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::Float => fmt.write_str("float"),
            Type::Bool => fmt.write_str("bool"),
            Type::String => fmt.write_str("string"),
            Type::Unresolved => fmt.write_str("unresolved"),
        }
    }
}

/// Clase de un símbolo declarado.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function { parameters: usize },
}

impl Display for SymbolKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => fmt.write_str("variable"),
            SymbolKind::Parameter => fmt.write_str("parameter"),
            SymbolKind::Function { .. } => fmt.write_str("function"),
        }
    }
}

/// Un nombre declarado, su clase, su tipo y su sitio de declaración.
#[derive(Debug)]
pub struct Symbol {
    name: Identifier,
    kind: SymbolKind,
    typ: Cell<Type>,
    location: Location,
}

impl Symbol {
    /// Obtiene el nombre declarado.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Obtiene la clase del símbolo.
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Obtiene el tipo conocido hasta el momento.
    pub fn typ(&self) -> Type {
        self.typ.get()
    }

    /// Obtiene el sitio de declaración.
    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// Tabla de símbolos con scopes léxicos anidados.
///
/// Los scopes forman una pila: declarar solo examina el scope más
/// interno (por lo cual se permite el shadowing de nombres exteriores),
/// mientras que buscar recorre la pila hacia afuera. Al salir de un
/// scope sus nombres dejan de ser visibles, pero los símbolos quedan
/// retenidos en orden de declaración para efectos de diagnóstico.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<Identifier, usize>>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Crea una tabla con solo el scope global.
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![HashMap::new()],
            symbols: Vec::new(),
        }
    }

    /// Abre un scope anidado.
    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Cierra el scope más interno.
    ///
    /// El scope global nunca se cierra.
    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1);
        self.scopes.pop();
    }

    /// Declara un nombre en el scope más interno.
    ///
    /// Falla únicamente si ese mismo scope ya declaró el nombre; un
    /// nombre igual en un scope exterior queda opacado.
    pub fn declare(
        &mut self,
        name: Located<Identifier>,
        kind: SymbolKind,
        typ: Type,
    ) -> Semantic<()> {
        let (location, name) = name.split();

        let scope = self.scopes.last_mut().unwrap();
        if scope.contains_key(&name) {
            return Err(Located::at(SemanticError::Redefined(name), location));
        }

        let index = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.clone(),
            kind,
            typ: Cell::new(typ),
            location,
        });

        scope.insert(name, index);
        Ok(())
    }

    /// Busca un nombre desde el scope más interno hacia afuera.
    pub fn lookup(&self, id: &Located<Identifier>) -> Semantic<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(id.val()))
            .map(|&index| &self.symbols[index])
            .ok_or_else(|| {
                Located::at(
                    SemanticError::Undefined(id.val().clone()),
                    id.location().clone(),
                )
            })
    }

    /// Histórico de todos los símbolos declarados, en orden.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

/// Analiza un programa completo.
///
/// Si no hay errores se obtiene la tabla de símbolos poblada y el
/// árbol queda anotado con los tipos resueltos de cada expresión.
pub fn analyze(ast: &Ast) -> Result<SymbolTable, Vec<Located<SemanticError>>> {
    let mut analyzer = Analyzer {
        table: SymbolTable::new(),
        errors: Vec::new(),
    };

    for statement in ast.statements() {
        analyzer.statement(statement);
    }

    if analyzer.errors.is_empty() {
        Ok(analyzer.table)
    } else {
        Err(analyzer.errors)
    }
}

struct Analyzer {
    table: SymbolTable,
    errors: Vec<Located<SemanticError>>,
}

impl Analyzer {
    fn statement(&mut self, statement: &Located<Statement>) {
        match statement.val() {
            Statement::Var { name, init } => {
                // El inicializador se evalúa primero, de modo que no
                // puede referirse al nombre que está declarando
                let typ = match init {
                    Some(init) => self.eval(init),
                    None => Type::Unresolved,
                };

                if let Err(error) = self.table.declare(name.clone(), SymbolKind::Variable, typ) {
                    self.errors.push(error);
                }
            }

            Statement::Assign { target, value } => self.assignment(target, value),

            Statement::If {
                condition,
                then_body,
                else_body,
            } => {
                self.condition(condition);
                self.block(then_body);

                if let Some(else_body) = else_body {
                    self.block(else_body);
                }
            }

            Statement::While { condition, body } => {
                self.condition(condition);
                self.block(body);
            }

            Statement::For {
                init,
                condition,
                update,
                body,
            } => {
                // El scope del for abarca su encabezado completo
                self.table.enter_scope();

                if let Some(init) = init {
                    self.statement(init);
                }

                if let Some(condition) = condition {
                    self.condition(condition);
                }

                if let Some(update) = update {
                    self.statement(update);
                }

                self.block(body);
                self.table.exit_scope();
            }

            Statement::Func {
                name,
                parameters,
                body,
            } => {
                let kind = SymbolKind::Function {
                    parameters: parameters.len(),
                };

                if let Err(error) = self.table.declare(name.clone(), kind, Type::Unresolved) {
                    self.errors.push(error);
                }

                // Los parámetros viven en un scope propio; el bloque
                // del cuerpo abre el suyo anidado, por lo cual puede
                // opacarlos
                self.table.enter_scope();
                for parameter in parameters {
                    let declared =
                        self.table
                            .declare(parameter.clone(), SymbolKind::Parameter, Type::Unresolved);

                    if let Err(error) = declared {
                        self.errors.push(error);
                    }
                }

                self.block(body);
                self.table.exit_scope();
            }

            Statement::Return { value } => {
                if let Some(value) = value {
                    self.eval(value);
                }
            }

            Statement::Print { value } => {
                self.eval(value);
            }

            Statement::Block(block) => self.block(block),
        }
    }

    fn block(&mut self, block: &Block) {
        self.table.enter_scope();
        for statement in block.statements() {
            self.statement(statement);
        }
        self.table.exit_scope();
    }

    fn assignment(&mut self, target: &Located<Identifier>, value: &Expr) {
        let found = self.eval(value);

        match self.table.lookup(target) {
            Err(error) => self.errors.push(error),

            Ok(symbol) => match symbol.kind {
                SymbolKind::Function { .. } => self.errors.push(Located::at(
                    SemanticError::ExpectedVar(target.val().clone()),
                    target.location().clone(),
                )),

                _ => {
                    let expected = symbol.typ.get();
                    match (expected, found) {
                        // La primera asignación fija el tipo de una
                        // variable declarada sin inicializador
                        (Type::Unresolved, _) => symbol.typ.set(found),
                        (_, Type::Unresolved) => (),

                        // Promoción de entero a flotante
                        (Type::Float, Type::Int) => (),

                        _ if expected == found => (),

                        _ => self.errors.push(Located::at(
                            SemanticError::ExpectedType(expected, found),
                            value.location().clone(),
                        )),
                    }
                }
            },
        }
    }

    fn condition(&mut self, condition: &Expr) {
        let typ = self.eval(condition);
        if !matches!(typ, Type::Bool | Type::Unresolved) {
            self.errors.push(Located::at(
                SemanticError::BadCondition(typ),
                condition.location().clone(),
            ));
        }
    }

    /// Infiere el tipo de una expresión, en postorden.
    ///
    /// Toda expresión queda anotada, incluso ante errores; el tipo
    /// "veneno" con que continúa el análisis evita cascadas de errores
    /// derivados de un mismo defecto.
    fn eval(&mut self, expr: &Expr) -> Type {
        let typ = match expr.kind() {
            ExprKind::Int(_) => Type::Int,
            ExprKind::Float(_) => Type::Float,
            ExprKind::Str(_) => Type::String,
            ExprKind::Bool(_) => Type::Bool,

            ExprKind::Id(id) => {
                let id = Located::at(id.clone(), expr.location().clone());
                match self.table.lookup(&id) {
                    Err(error) => {
                        self.errors.push(error);
                        Type::Unresolved
                    }

                    Ok(symbol) => match symbol.kind {
                        SymbolKind::Function { .. } => {
                            self.errors.push(Located::at(
                                SemanticError::ExpectedVar(id.val().clone()),
                                expr.location().clone(),
                            ));
                            Type::Unresolved
                        }

                        _ => symbol.typ.get(),
                    },
                }
            }

            ExprKind::Unary { op, operand } => {
                let found = self.eval(operand);
                match (op, found) {
                    (UnOp::Not, Type::Bool | Type::Unresolved) => Type::Bool,
                    (UnOp::Not, found) => {
                        self.errors.push(Located::at(
                            SemanticError::ExpectedType(Type::Bool, found),
                            operand.location().clone(),
                        ));
                        Type::Bool
                    }

                    (UnOp::Neg, typ) if typ.is_numeric() || typ == Type::Unresolved => typ,
                    (UnOp::Neg, found) => {
                        self.errors.push(Located::at(
                            SemanticError::ExpectedNumeric(found),
                            operand.location().clone(),
                        ));
                        Type::Unresolved
                    }
                }
            }

            ExprKind::Binary { op, left, right } => {
                let left_type = self.eval(left);
                let right_type = self.eval(right);

                match binary_type(*op, left_type, right_type) {
                    Some(typ) => typ,
                    None => {
                        self.errors.push(Located::at(
                            SemanticError::BadOperands(left_type, *op, right_type),
                            expr.location().clone(),
                        ));

                        match op {
                            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                                Type::Unresolved
                            }
                            _ => Type::Bool,
                        }
                    }
                }
            }

            ExprKind::Call { callee, args } => {
                match self.table.lookup(callee) {
                    Err(error) => self.errors.push(error),

                    Ok(symbol) => match symbol.kind {
                        SymbolKind::Function { parameters } => {
                            if parameters != args.len() {
                                self.errors.push(Located::at(
                                    SemanticError::BadArgumentCount(
                                        callee.val().clone(),
                                        parameters,
                                        args.len(),
                                    ),
                                    expr.location().clone(),
                                ));
                            }
                        }

                        _ => self.errors.push(Located::at(
                            SemanticError::NotCallable(callee.val().clone()),
                            callee.location().clone(),
                        )),
                    },
                }

                // Los tipos de los argumentos son best-effort: los
                // parámetros no declaran tipos contra qué validarlos
                for arg in args {
                    self.eval(arg);
                }

                Type::Unresolved
            }
        };

        expr.resolve(typ);
        typ
    }
}

/// Regla total de tipos para operaciones binarias.
///
/// `None` indica una combinación que el operador no define. Un operando
/// `Unresolved` se tolera y adopta el resultado que el contexto sugiera.
fn binary_type(op: BinOp, left: Type, right: Type) -> Option<Type> {
    use BinOp::*;
    use Type::*;

    match op {
        Add | Sub | Mul | Div | Mod => match (left, right) {
            (Int, Int) => Some(Int),
            (Int | Float, Int | Float) => Some(Float),
            (Unresolved, other @ (Int | Float)) | (other @ (Int | Float), Unresolved) => {
                Some(other)
            }
            (Unresolved, Unresolved) => Some(Int),
            _ => None,
        },

        Eq | Ne => match (left, right) {
            (Unresolved, _) | (_, Unresolved) => Some(Bool),
            (Int | Float, Int | Float) => Some(Bool),
            (left, right) if left == right => Some(Bool),
            _ => None,
        },

        Lt | Gt | Le | Ge => match (left, right) {
            (Int | Float | Unresolved, Int | Float | Unresolved) => Some(Bool),
            _ => None,
        },

        And | Or => match (left, right) {
            (Bool | Unresolved, Bool | Unresolved) => Some(Bool),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;
    use crate::source::Source;

    fn parse(text: &str) -> Ast {
        let source = Source::new("<test>", text);
        let tokens = Lexer::new(source.start(), source.chars())
            .try_exhaustive()
            .expect("unexpected lexical errors");

        crate::parse::parse(&tokens, source.end()).expect("unexpected syntax errors")
    }

    fn analyze_source(text: &str) -> Result<SymbolTable, Vec<Located<SemanticError>>> {
        analyze(&parse(text))
    }

    fn errors(text: &str) -> Vec<SemanticError> {
        analyze_source(text)
            .expect_err("expected semantic errors")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn test_location() -> Location {
        Source::new("<test>", "x").start()
    }

    fn located(name: &str) -> Located<Identifier> {
        Located::at(Identifier::from(name), test_location())
    }

    #[test]
    fn shadowing_through_the_table() {
        let mut table = SymbolTable::new();

        table
            .declare(located("x"), SymbolKind::Variable, Type::Int)
            .unwrap();

        table.enter_scope();
        table
            .declare(located("x"), SymbolKind::Variable, Type::Bool)
            .unwrap();
        assert_eq!(table.lookup(&located("x")).unwrap().typ(), Type::Bool);

        table.exit_scope();
        assert_eq!(table.lookup(&located("x")).unwrap().typ(), Type::Int);
    }

    #[test]
    fn duplicate_declaration_in_same_scope() {
        let mut table = SymbolTable::new();

        table
            .declare(located("count"), SymbolKind::Variable, Type::Int)
            .unwrap();

        let error = table
            .declare(located("count"), SymbolKind::Variable, Type::Float)
            .unwrap_err();

        assert!(matches!(error.val(), SemanticError::Redefined(_)));
    }

    #[test]
    fn dead_scopes_are_not_consulted() {
        let mut table = SymbolTable::new();

        table.enter_scope();
        table
            .declare(located("inner"), SymbolKind::Variable, Type::Int)
            .unwrap();
        table.exit_scope();

        assert!(table.lookup(&located("inner")).is_err());
        assert_eq!(table.symbols().len(), 1);
    }

    #[test]
    fn valid_program_annotates_types() {
        let ast = parse("var x = 10; print x + 1;");
        let table = analyze(&ast).expect("analysis failed");

        let x = &table.symbols()[0];
        assert_eq!(x.name().as_ref(), "x");
        assert_eq!(x.typ(), Type::Int);

        match ast.statements()[1].val() {
            Statement::Print { value } => assert_eq!(value.typ(), Some(Type::Int)),
            other => panic!("expected print, got {:?}", other),
        }
    }

    #[test]
    fn undeclared_identifier_is_reported_once() {
        let errors = errors("print undefined_var;");

        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SemanticError::Undefined(name) if name.as_ref() == "undefined_var"));
    }

    #[test]
    fn duplicate_reports_the_second_site() {
        let errors = analyze_source("var count = 1; var count = true;").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].val(), SemanticError::Redefined(_)));
        assert_eq!(errors[0].location().start().line(), 1);
        assert_eq!(errors[0].location().start().column(), 20);
    }

    #[test]
    fn block_shadowing_is_allowed() {
        assert!(analyze_source("var x = 1; { var x = true; x = false; } x = 2;").is_ok());
    }

    #[test]
    fn non_bool_condition_is_rejected() {
        let errors = errors("if (5) { }");

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SemanticError::BadCondition(Type::Int)));
    }

    #[test]
    fn while_condition_is_checked() {
        let errors = errors("while (\"nope\") { }");
        assert!(matches!(
            errors[0],
            SemanticError::BadCondition(Type::String)
        ));
    }

    #[test]
    fn int_promotes_to_float() {
        let table = analyze_source("var f = 1.5; f = 2; var m = 2 * 1.5;").unwrap();

        let m = table.symbols().iter().find(|s| s.name().as_ref() == "m");
        assert_eq!(m.unwrap().typ(), Type::Float);
    }

    #[test]
    fn float_does_not_demote_to_int() {
        let errors = errors("var i = 1; i = 2.5;");
        assert!(matches!(
            errors[0],
            SemanticError::ExpectedType(Type::Int, Type::Float)
        ));
    }

    #[test]
    fn logical_operators_require_bool() {
        let errors = errors("var b = 1 && true;");
        assert!(matches!(
            errors[0],
            SemanticError::BadOperands(Type::Int, BinOp::And, Type::Bool)
        ));
    }

    #[test]
    fn strings_do_not_add() {
        let errors = errors("var s = \"a\" + \"b\";");
        assert!(matches!(
            errors[0],
            SemanticError::BadOperands(Type::String, BinOp::Add, Type::String)
        ));
    }

    #[test]
    fn equality_requires_matching_types() {
        assert!(analyze_source("var b = 1 == 2.0;").is_ok());

        let errors = errors("var b = 1 == \"1\";");
        assert!(matches!(
            errors[0],
            SemanticError::BadOperands(Type::Int, BinOp::Eq, Type::String)
        ));
    }

    #[test]
    fn negation_requires_numeric() {
        let errors = errors("var n = -\"x\";");
        assert!(matches!(
            errors[0],
            SemanticError::ExpectedNumeric(Type::String)
        ));
    }

    #[test]
    fn not_requires_bool() {
        let errors = errors("var n = !3;");
        assert!(matches!(
            errors[0],
            SemanticError::ExpectedType(Type::Bool, Type::Int)
        ));
    }

    #[test]
    fn first_assignment_resolves_a_bare_declaration() {
        let table = analyze_source("var x; x = 1; var y = x + 1;").unwrap();

        let x = table.symbols().iter().find(|s| s.name().as_ref() == "x");
        assert_eq!(x.unwrap().typ(), Type::Int);

        let y = table.symbols().iter().find(|s| s.name().as_ref() == "y");
        assert_eq!(y.unwrap().typ(), Type::Int);
    }

    #[test]
    fn call_arity_is_validated() {
        let errors = errors("func add(a, b) { return a + b; } var r = add(1);");
        assert!(matches!(
            errors[0],
            SemanticError::BadArgumentCount(_, 2, 1)
        ));
    }

    #[test]
    fn only_functions_are_callable() {
        let errors = errors("var x = 1; var y = x();");
        assert!(matches!(errors[0], SemanticError::NotCallable(_)));
    }

    #[test]
    fn functions_are_not_values() {
        let errors = errors("func f() { } var y = f + 1;");
        assert!(matches!(errors[0], SemanticError::ExpectedVar(_)));
    }

    #[test]
    fn parameters_are_visible_in_the_body() {
        assert!(analyze_source("func inc(n) { return n + 1; }").is_ok());
    }

    #[test]
    fn parameters_do_not_leak_out_of_the_function() {
        let errors = errors("func inc(n) { return n + 1; } print n;");
        assert!(matches!(&errors[0], SemanticError::Undefined(name) if name.as_ref() == "n"));
    }

    #[test]
    fn for_header_declarations_stay_in_the_loop() {
        let errors = errors("for (var i = 0; i < 3; i = i + 1) { print i; } print i;");
        assert!(matches!(&errors[0], SemanticError::Undefined(name) if name.as_ref() == "i"));
    }

    #[test]
    fn errors_accumulate_across_the_program() {
        let errors = errors("print a; print b; if (1) { }");
        assert_eq!(errors.len(), 3);
    }
}
