//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de posiciones o rangos de ubicaciones en
//! el código fuente original, lo cual permite determinar un punto
//! exacto o aproximado en donde ocurre un error de abstracción
//! arbitraria. El texto fuente completo se retiene en un [`Source`]
//! para que el reporte de errores pueda citar las líneas originales.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
};

/// Un flujo de entrada, carácter por carácter.
pub trait InputStream: Iterator<Item = (char, Location)> {}

impl<I: Iterator<Item = (char, Location)>> InputStream for I {}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen de esta ubicación.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
///
/// Tanto líneas como columnas comienzan en 1. Todo carácter,
/// incluyendo tabuladores, ocupa exactamente una columna.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column - 1,
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de origen y texto fuente descompuesto en líneas.
pub struct Source {
    name: String,
    lines: Vec<String>,
}

impl Source {
    /// Retiene un texto fuente completo bajo un nombre de origen.
    pub fn new<S: Into<String>>(name: S, text: &str) -> Rc<Self> {
        Rc::new(Source {
            name: name.into(),
            lines: text.lines().map(str::to_owned).collect(),
        })
    }

    /// Obtiene el nombre del origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evalúa un callback sobre una línea del texto original.
    ///
    /// Si la línea no existe, el callback recibe una línea vacía.
    pub fn with_line<F, R>(&self, line: u32, with: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let line = line
            .checked_sub(1)
            .and_then(|index| self.lines.get(index as usize));

        with(line.map(String::as_str).unwrap_or(""))
    }

    /// Ubicación del primer carácter del texto.
    pub fn start(self: &Rc<Self>) -> Location {
        self.locate(Position::default())
    }

    /// Ubicación inmediatamente después del último carácter del texto.
    pub fn end(self: &Rc<Self>) -> Location {
        self.locate(Position {
            line: self.lines.len() as u32 + 1,
            column: 1,
        })
    }

    /// Flujo de caracteres del texto completo.
    ///
    /// Cada línea se emite seguida de un `'\n'`, incluyendo a la última.
    /// Cada carácter del flujo porta su propia ubicación.
    pub fn chars(self: &Rc<Self>) -> Chars {
        Chars {
            source: Rc::clone(self),
            line: 0,
            pending: Vec::new().into_iter(),
            position: Position::default(),
        }
    }

    fn locate(self: &Rc<Self>, position: Position) -> Location {
        Location {
            from: Rc::clone(self),
            position: position..position.advance(),
        }
    }
}

/// Iterador de caracteres localizados sobre un [`Source`].
pub struct Chars {
    source: Rc<Source>,
    line: usize,
    pending: std::vec::IntoIter<char>,
    position: Position,
}

impl Iterator for Chars {
    type Item = (char, Location);

    fn next(&mut self) -> Option<Self::Item> {
        let c = loop {
            match self.pending.next() {
                Some(c) => break c,
                None => {
                    let line = self.source.lines.get(self.line)?;

                    let mut chars: Vec<char> = line.chars().collect();
                    chars.push('\n');

                    self.pending = chars.into_iter();
                    self.line += 1;
                }
            }
        };

        let here = self.position;
        self.position = match c {
            '\n' => here.newline(),
            _ => here.advance(),
        };

        Some((c, self.source.locate(here)))
    }
}
