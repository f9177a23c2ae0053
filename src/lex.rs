//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios de línea (`//`) se descartan durante esta
//! operación. Cada token emitido está asociado a una ubicación en el código
//! fuente original, lo cual permite rastrear errores tanto en los mismos como
//! en constructos más elevados de fases posteriores.
//!
//! # Contenido de un token
//! Este lexer no produce lexemas para casos donde no son necesarios. Los
//! operadores, la puntuación y las palabras clave se identifican por el hecho
//! de lo que son y no incluyen lexemas. Por su parte, los identificadores sí
//! incluyen su lexema original. Las constantes literales (enteros, flotantes,
//! strings y booleanos) se resuelven a sus valores en vez de preservar sus
//! lexemas.
//!
//! # Reglas importantes del lenguaje
//! - Los identificadores comienzan con una letra o `'_'` y continúan con
//!   letras, dígitos o `'_'`.
//! - El lenguaje es case-sensitive: `VAR` es un identificador, no la
//!   palabra clave [`Keyword::Var`].
//! - Un literal flotante exige dígitos a ambos lados del punto decimal.
//! - Los literales de string aceptan comillas simples o dobles, pueden
//!   abarcar varias líneas y soportan los escapes `\n`, `\t`, `\\` y la
//!   comilla delimitadora. Un escape desconocido produce el carácter
//!   escapado tal cual.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error.
//! Esto ocurre en suficiente grado como para reportar más de un error por
//! ejecución, pero no lo suficiente como para permitir el avance a las
//! demás fases de la compilación.

use crate::source::{InputStream, Located, Location};
use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Literal entero máximo.
const INT_MAX: i64 = i64::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Un punto decimal no fue seguido por al menos un dígito.
    #[error("Expected a digit after decimal point")]
    MissingFraction,

    /// El flujo de entrada terminó dentro de un literal de string.
    #[error("Unterminated string literal")]
    UnterminatedString,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(fmt)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Literal de entero.
    IntLiteral(i64),

    /// Literal de flotante.
    FloatLiteral(f64),

    /// Literal de string, ya sin comillas ni escapes.
    StrLiteral(Rc<str>),

    /// Literal booleano.
    BoolLiteral(bool),

    /// `=`
    Assign,

    /// `==`
    Eq,

    /// `!=`
    Ne,

    /// `<`
    Lt,

    /// `>`
    Gt,

    /// `<=`
    Le,

    /// `>=`
    Ge,

    /// `&&`
    And,

    /// `||`
    Or,

    /// `!`
    Not,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Star,

    /// `/`
    Slash,

    /// `%`
    Percent,

    /// `,`
    Comma,

    /// `;`
    Semicolon,

    /// `:`
    Colon,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            FloatLiteral(float) => write!(fmt, "literal `{:?}`", float),
            StrLiteral(string) => write!(fmt, "literal `{:?}`", string),
            BoolLiteral(boolean) => write!(fmt, "literal `{}`", boolean),
            Assign => fmt.write_str("`=`"),
            Eq => fmt.write_str("`==`"),
            Ne => fmt.write_str("`!=`"),
            Lt => fmt.write_str("`<`"),
            Gt => fmt.write_str("`>`"),
            Le => fmt.write_str("`<=`"),
            Ge => fmt.write_str("`>=`"),
            And => fmt.write_str("`&&`"),
            Or => fmt.write_str("`||`"),
            Not => fmt.write_str("`!`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Star => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            Percent => fmt.write_str("`%`"),
            Comma => fmt.write_str("`,`"),
            Semicolon => fmt.write_str("`;`"),
            Colon => fmt.write_str("`:`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
        }
    }
}

/// Una palabra clave.
///
/// Las palabras clave de tipos (`int`, `float`, `bool`, `string`) e
/// `input` están reservadas por el lexer aunque la gramática actual
/// no las utiliza.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Var,
    Int,
    Float,
    Bool,
    String,
    If,
    Else,
    While,
    For,
    Func,
    Return,
    Print,
    Input,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Var    => "var",
            Int    => "int",
            Float  => "float",
            Bool   => "bool",
            String => "string",
            If     => "if",
            Else   => "else",
            While  => "while",
            For    => "for",
            Func   => "func",
            Return => "return",
            Print  => "print",
            Input  => "input",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("var",    Var),
            ("int",    Int),
            ("float",  Float),
            ("bool",   Bool),
            ("string", String),
            ("if",     If),
            ("else",   Else),
            ("while",  While),
            ("for",    For),
            ("func",   Func),
            ("return", Return),
            ("print",  Print),
            ("input",  Input),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: std::iter::Peekable<S>,
    state: State,
    start: Location,
    last: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `/`.
    ///
    /// Otro `/` inicia un comentario; cualquier otra cosa lo
    /// resuelve como el operador de división.
    Division,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    Comment,

    /// Se encontró `=`.
    Equals,

    /// Se encontró `!`.
    Bang,

    /// Se encontró `<`.
    Less,

    /// Se encontró `>`.
    Greater,

    /// Se encontró `&`; solo puede seguir otro `&`.
    Ampersand,

    /// Se encontró `|`; solo puede seguir otro `|`.
    Pipe,

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que
    /// el siguiente carácter sea un dígito. Un punto decimal
    /// transfiere lo acumulado a [`State::Decimal`].
    Integer(i64),

    /// Constante flotante, acumulada como lexema.
    Decimal(String),

    /// Término que puede ser un identificador, una palabra clave
    /// o un literal booleano.
    Word(String),

    /// Literal de string delimitado por `quote`.
    Text {
        quote: char,
        value: String,
        escape: bool,
    },
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let last = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            last,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de buscar tokens exitosos y comenzará a acumular solamente
    /// errores. El propósito de esta función es permitir la
    /// recolección de múltiples errores léxicos en una misma ejecución
    /// del compilador.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use {State::*, Token::*};

        let token = loop {
            let next_char = self.source.peek().map(|(c, _)| *c);

            // La posición de origen se mueve junto al siguiente
            // carácter siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                if let Some((_, location)) = self.source.peek() {
                    self.start = location.clone();
                }
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error. Al llegar al final de la línea
                // el lexer se recupera y reinicia.
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(',')) => self.state = Complete(Comma),
                (Start, Some(';')) => self.state = Complete(Semicolon),
                (Start, Some(':')) => self.state = Complete(Colon),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Star),
                (Start, Some('%')) => self.state = Complete(Percent),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),
                (Start, Some('{')) => self.state = Complete(OpenCurly),
                (Start, Some('}')) => self.state = Complete(CloseCurly),

                // Operadores que dependen del siguiente carácter
                (Start, Some('/')) => self.state = Division,
                (Start, Some('=')) => self.state = Equals,
                (Start, Some('!')) => self.state = Bang,
                (Start, Some('<')) => self.state = Less,
                (Start, Some('>')) => self.state = Greater,
                (Start, Some('&')) => self.state = Ampersand,
                (Start, Some('|')) => self.state = Pipe,

                // Literales de string
                (Start, Some(quote @ ('"' | '\''))) => {
                    self.state = Text {
                        quote,
                        value: Default::default(),
                        escape: false,
                    }
                }

                // Identificadores, palabras clave y booleanos
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume
                // el dígito, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera para el cual el siguiente carácter es un
                // dígito. Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_ascii_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(value), _) => break Ok(std::mem::replace(value, Plus)),

                // `//` inicia un comentario, un `/` solitario es división
                (Division, Some('/')) => self.state = Comment,
                (Division, _) => break Ok(Slash),

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) => self.state = Start,
                (Comment, Some(_)) => (),
                (Comment, None) => self.state = Start,

                // Operadores de dos caracteres y sus prefijos
                (Equals, Some('=')) => self.state = Complete(Eq),
                (Equals, _) => break Ok(Assign),
                (Bang, Some('=')) => self.state = Complete(Ne),
                (Bang, _) => break Ok(Not),
                (Less, Some('=')) => self.state = Complete(Le),
                (Less, _) => break Ok(Lt),
                (Greater, Some('=')) => self.state = Complete(Ge),
                (Greater, _) => break Ok(Gt),
                (Ampersand, Some('&')) => self.state = Complete(And),
                (Ampersand, _) => break Err(LexerError::Expected('&')),
                (Pipe, Some('|')) => self.state = Complete(Or),
                (Pipe, _) => break Err(LexerError::Expected('|')),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap() as i64;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow),
                    }
                }

                // Un punto decimal convierte la constante en flotante
                (Integer(integer), Some('.')) => self.state = Decimal(format!("{}.", integer)),

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(IntLiteral(*integer)),

                // Dígitos de la parte fraccionaria
                (Decimal(text), Some(digit)) if digit.is_ascii_digit() => text.push(digit),
                (Decimal(text), _) if text.ends_with('.') => {
                    break Err(LexerError::MissingFraction)
                }
                (Decimal(text), _) => break Ok(FloatLiteral(text.parse().unwrap())),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => {
                    word.push(c);
                }

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    break Ok(match word.as_str() {
                        "true" => BoolLiteral(true),
                        "false" => BoolLiteral(false),
                        _ => match self::Keyword::from_str(word) {
                            Ok(keyword) => Keyword(keyword),
                            Err(()) => Id(Identifier(Rc::from(std::mem::take(word).as_str()))),
                        },
                    })
                }

                // Interior de literales de string
                (Text { .. }, None) => break Err(LexerError::UnterminatedString),
                (Text { value, escape, .. }, Some(c)) if *escape => {
                    value.push(unescape(c));
                    *escape = false;
                }
                (Text { escape, .. }, Some('\\')) => *escape = true,
                (Text { quote, value, .. }, Some(c)) if c == *quote => {
                    let text = std::mem::take(value);
                    self.state = Complete(StrLiteral(Rc::from(text.as_str())));
                }
                (Text { value, .. }, Some(c)) => value.push(c),
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((_, location)) = self.source.next() {
                self.last = location;
            }
        };

        token.map(Some)
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &self.last);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;

                let location = self
                    .source
                    .peek()
                    .map(|(_, location)| location.clone())
                    .unwrap_or_else(|| self.last.clone());

                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_ascii_digit() || c == '_'
}

/// Resuelve el carácter que sigue a un `\` dentro de un string.
fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        c => c,
    }
}
