//! The fixed diagnostic message catalog. Centralising these as functions
//! (rather than inlining `format!` at every call site) keeps the wording a
//! single design surface, per spec.

pub fn expected(expected: &str, received: &str) -> String {
    format!("expected {expected}, received {received}")
}

pub fn not_a_valid_prefix_operator(op: &str) -> String {
    format!("{op} is not a valid prefix operator")
}

pub fn not_a_valid_infix_operator(op: &str) -> String {
    format!("{op} is not a valid infix operator")
}

pub const PROGRAM_FILE_IS_EMPTY: &str = "program file is empty";

pub const UNABLE_TO_INITIALISE_PARSER: &str = "unable to initialise parser";

pub fn invalid_statement_beginning_with(literal: &str) -> String {
    format!("invalid statement beginning with {literal}")
}

pub fn unexpected_eof_at_line(line: usize) -> String {
    format!("unexpected EOF at line {line}")
}

pub fn already_declared_in_current_scope(name: &str) -> String {
    format!("{name} already declared in current scope")
}

pub const UNABLE_TO_RETURN_OUTSIDE_OF_FUNCTION: &str = "unable to return outside of function";

pub fn not_declared(name: &str) -> String {
    format!("{name} not declared")
}

pub fn requires_parameters(name: &str, required: usize, given: usize) -> String {
    format!("{name} requires {required} parameters, {given} given")
}

pub fn not_a_valid_index(literal: &str) -> String {
    format!("{literal} is not a valid index")
}

pub const DIVISION_BY_ZERO: &str = "division by zero";

pub fn not_of_type(value: &str, expected_type: &str) -> String {
    format!("{value} not of type {expected_type}")
}

pub fn operation_not_available_for_type(op: &str, ty: &str) -> String {
    format!("operation {op} not available for type {ty}")
}

pub const INDEX_OUT_OF_BOUNDS: &str = "index out of bounds";

pub const CONDITION_DOES_NOT_EVALUATE_TO_A_BOOLEAN: &str = "condition does not evaluate to a boolean";

pub fn unable_to_evaluate_type(ty: &str) -> String {
    format!("unable to evaluate type {ty}")
}
