//! Reporte agregado de errores de compilación.
//!
//! Cada fase acumula sus errores en vez de abortar con el primero.
//! [`Diagnostics`] reúne una lista de errores localizados de cualquier
//! fase y la presenta citando las líneas del código fuente original.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error que conoce su ubicación original.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Lista de errores lista para presentarse al usuario.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Etiqueta los errores con el nombre de la fase que los produjo.
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Cantidad de errores acumulados.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Indica si no ocurrió ningún error.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                location.source().with_line(line_number, |line| {
                    writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
                })?
            }

            let from = location.start().column();
            let to = match location.end().column() {
                column if column > from => column - 1,
                _ => from,
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("something odd")]
    struct Odd;

    #[test]
    fn rendering_cites_the_offending_line() {
        let source = Source::new("demo.ms", "var x = @;");
        let at = source.chars().nth(8).unwrap().1;

        let report = Diagnostics::from(Located::at(Odd, at)).kind("Lexical error");
        let report = report.to_string();

        assert!(report.contains("Lexical error: something odd"));
        assert!(report.contains(" --> demo.ms:1:9"));
        assert!(report.contains("1 | var x = @;"));
        assert!(report.contains("Build failed with 1 error"));
    }

    #[test]
    fn empty_diagnostics_report_success() {
        let report = Diagnostics::default().to_string();
        assert_eq!(report, "No errors were reported\n");
    }

    #[test]
    fn error_count_is_pluralized() {
        let source = Source::new("demo.ms", "??");
        let mut chars = source.chars();
        let first = chars.next().unwrap().1;
        let second = chars.next().unwrap().1;

        let report = Diagnostics::from(vec![
            Located::at(Odd, first),
            Located::at(Odd, second),
        ]);

        assert_eq!(report.len(), 2);
        assert!(report.to_string().contains("Build failed with 2 errors"));
    }
}
