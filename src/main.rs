//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::Context;
use bitflags::bitflags;
use clap::{crate_version, Arg, Command};
use miniscript::{
    error::Diagnostics,
    lex::Lexer,
    lower, parse, semantic,
    source::Source,
};

use std::{fs, process};

bitflags! {
    /// Artefactos intermedios que el usuario pidió volcar.
    struct Dump: u32 {
        const TOKENS  = 0x01;
        const AST     = 0x02;
        const SYMBOLS = 0x04;
    }
}

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = Command::new("MiniScript compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file"),
        )
        .arg(
            Arg::new("emit")
                .short('e')
                .long("emit")
                .takes_value(true)
                .multiple_occurrences(true)
                .value_name("ARTIFACT")
                .possible_values(["tokens", "ast", "symbols"])
                .help("Dump an intermediate artifact"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .help("Write the IR listing to FILE instead of stdout"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let path = args.value_of("input").unwrap();

    let mut dump = Dump::empty();
    for artifact in args.values_of("emit").into_iter().flatten() {
        dump |= match artifact {
            "tokens" => Dump::TOKENS,
            "ast" => Dump::AST,
            "symbols" => Dump::SYMBOLS,
            _ => unreachable!("main.rs allowed a bad artifact"),
        };
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path))?;
    let source = Source::new(path, &text);

    // Análisis léxico
    let tokens = match Lexer::new(source.start(), source.chars()).try_exhaustive() {
        Ok(tokens) => tokens,
        Err(errors) => abort(Diagnostics::from(errors).kind("Lexical error")),
    };

    if dump.contains(Dump::TOKENS) {
        print!("Tokens: {:#?}\n\n", tokens);
    }

    // Análisis sintáctico
    let ast = match parse::parse(&tokens, source.end()) {
        Ok(ast) => ast,
        Err(errors) => abort(Diagnostics::from(errors).kind("Syntax error")),
    };

    if dump.contains(Dump::AST) {
        print!("Ast: {:#?}\n\n", ast);
    }

    // Análisis semántico
    let table = match semantic::analyze(&ast) {
        Ok(table) => table,
        Err(errors) => abort(Diagnostics::from(errors).kind("Semantic error")),
    };

    if dump.contains(Dump::SYMBOLS) {
        println!("Symbols:");
        for symbol in table.symbols() {
            println!(
                "  {:<16} {:<10} {:<12} {}",
                symbol.name().to_string(),
                symbol.kind().to_string(),
                symbol.typ().to_string(),
                symbol.location()
            );
        }
        println!();
    }

    // Generación de código intermedio
    let program = lower::generate(&ast);
    match args.value_of("output") {
        None => print!("{}", program),
        Some(path) => fs::write(path, program.to_string())
            .with_context(|| format!("Failed to write IR listing: {}", path))?,
    }

    Ok(())
}

/// Presenta los errores de una fase y termina con estado de fallo.
fn abort(diagnostics: Diagnostics) -> ! {
    eprint!("{}", diagnostics);
    process::exit(1);
}
