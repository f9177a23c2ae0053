//! Recorrido completo de la tubería de compilación, fase por fase,
//! de la misma forma en que el driver la orquesta.

use miniscript::{lex::Lexer, lower, parse, semantic, source::Source};

fn compile(text: &str) -> Result<String, String> {
    let source = Source::new("<test>", text);

    let tokens = Lexer::new(source.start(), source.chars())
        .try_exhaustive()
        .map_err(|errors| format!("lexical: {} error(s)", errors.len()))?;

    let ast = parse::parse(&tokens, source.end())
        .map_err(|errors| format!("syntax: {} error(s)", errors.len()))?;

    semantic::analyze(&ast).map_err(|errors| format!("semantic: {} error(s)", errors.len()))?;

    Ok(lower::generate(&ast).to_string())
}

#[test]
fn whole_program_compiles_to_a_listing() {
    let listing = compile(
        "// suma de los primeros n enteros\n\
         func sum(n) {\n\
             var total = 0;\n\
             for (var i = 1; i <= n; i = i + 1) {\n\
                 total = total + i;\n\
             }\n\
             return total;\n\
         }\n\
         \n\
         var limit = 10;\n\
         var result = sum(limit);\n\
         if (result > 50) {\n\
             print \"big\";\n\
         } else {\n\
             print result;\n\
         }\n",
    )
    .expect("pipeline failed");

    assert_eq!(
        listing,
        "0: FUNCTION sum\n\
         1: PARAM n\n\
         2: total = ASSIGN 0\n\
         3: i = ASSIGN 1\n\
         4: LABEL L1\n\
         5: t1 = i <= n\n\
         6: IF_FALSE t1 L2\n\
         7: t2 = total + i\n\
         8: total = ASSIGN t2\n\
         9: t3 = i + 1\n\
         10: i = ASSIGN t3\n\
         11: GOTO L1\n\
         12: LABEL L2\n\
         13: RETURN total\n\
         14: RETURN\n\
         15: limit = ASSIGN 10\n\
         16: t4 = CALL sum\n\
         17: result = ASSIGN t4\n\
         18: t5 = result > 50\n\
         19: IF_FALSE t5 L3\n\
         20: PRINT \"big\"\n\
         21: GOTO L4\n\
         22: LABEL L3\n\
         23: PRINT result\n\
         24: LABEL L4\n"
    );
}

#[test]
fn compiling_twice_is_byte_identical() {
    let text = "var x = 1;\n\
                while (x < 5) { x = x + 1; }\n\
                print x;\n";

    assert_eq!(compile(text), compile(text));
}

#[test]
fn each_phase_gates_the_next() {
    // Un error léxico impide el parse
    assert_eq!(compile("var @ = 1;").unwrap_err(), "lexical: 1 error(s)");

    // Un error sintáctico impide el análisis semántico: el `print`
    // dañado se reporta, no el uso del nombre sin declarar
    assert_eq!(
        compile("print ;\nprint undeclared;").unwrap_err(),
        "syntax: 1 error(s)"
    );

    // Un error semántico impide la generación de IR
    assert_eq!(
        compile("print undeclared;").unwrap_err(),
        "semantic: 1 error(s)"
    );
}

#[test]
fn no_ir_is_produced_for_invalid_programs() {
    assert!(compile("var x = y + 1;").is_err());
    assert!(compile("if (true) { var x = 1; var x = 2; }").is_err());
}
