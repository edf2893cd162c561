use std::path::Path;

use crate::diagnostics::Diagnostic;
use crate::interpreter::Evaluator;
use crate::parser::Parser;
use crate::semantic::SemanticAnalyser;

/// Runs one source file end to end: lex+parse, then (if clean) semantic
/// analysis, then (if clean) evaluation. Every stage's diagnostics are
/// printed one per line; evaluation only starts once both earlier stages
/// are error-free, per the "final revision" evaluation gate.
pub fn run_file(path: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let filename: std::rc::Rc<str> = path.display().to_string().into();

    let (program, parse_errors) = Parser::new(&source, filename.clone()).parse();
    if !parse_errors.is_empty() {
        print_diagnostics(&parse_errors);
        return Ok(());
    }

    let semantic_errors = SemanticAnalyser::new(filename.clone()).analyse(&program);
    if !semantic_errors.is_empty() {
        print_diagnostics(&semantic_errors);
        return Ok(());
    }

    if let Err(eval_error) = Evaluator::new().run(&program) {
        println!("{}", eval_error.diagnostic);
        for frame in eval_error.stack_trace.iter().rev() {
            println!("FUNCTION CALL {} {} - {}", frame.file, frame.line, frame.call_expr);
        }
    }

    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        println!("{d}");
    }
}
