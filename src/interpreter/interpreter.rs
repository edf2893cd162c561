use std::rc::Rc;

use crate::diagnostics::{
    not_of_type, operation_not_available_for_type, Diagnostic, CONDITION_DOES_NOT_EVALUATE_TO_A_BOOLEAN,
    DIVISION_BY_ZERO, INDEX_OUT_OF_BOUNDS,
};
use crate::environment::Environment;
use crate::function::{Flow, UserFunction, Value};
use crate::natives;
use crate::parser::{Expr, InfixOp, Meta, PrefixOp, Program, Stmt};

/// One active call frame, innermost recorded last. Printed innermost-first
/// on a runtime error, as `FUNCTION CALL <file> <line> - <call-expression>`.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub file: Rc<str>,
    pub line: usize,
    pub call_expr: String,
}

#[derive(Debug, Clone)]
pub struct EvalError {
    pub diagnostic: Diagnostic,
    /// Outermost call first; render in reverse for innermost-first output.
    pub stack_trace: Vec<StackFrame>,
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Integer(n) => *n as f64,
        Value::Float(f) => *f,
        _ => unreachable!("as_f64 only called on numeric operands"),
    }
}

/// Walks the AST, producing a value per node. Statement/block evaluation
/// returns `Flow` rather than `Value` so a `return` threads out to its
/// call boundary without ever being usable as an arithmetic operand.
pub struct Evaluator {
    env: Environment,
    call_stack: Vec<StackFrame>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self { env: Environment::new(), call_stack: Vec::new() }
    }

    pub fn run(mut self, program: &Program) -> Result<(), EvalError> {
        self.eval_block(&program.statements)?;
        Ok(())
    }

    fn runtime_error(&self, meta: &Meta, message: String) -> EvalError {
        EvalError {
            diagnostic: Diagnostic::runtime(Rc::clone(&meta.file), meta.line, message),
            stack_trace: self.call_stack.clone(),
        }
    }

    fn internal_error(&self, meta: &Meta, message: String) -> EvalError {
        EvalError {
            diagnostic: Diagnostic::internal(Rc::clone(&meta.file), meta.line, message),
            stack_trace: self.call_stack.clone(),
        }
    }

    fn eval_block(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        let mut last = Flow::Value(Value::Null);
        for stmt in stmts {
            let flow = self.eval_stmt(stmt)?;
            if flow.is_return() {
                return Ok(flow);
            }
            last = flow;
        }
        Ok(last)
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::VarDecl(_, name, expr) => {
                let value = self.eval_expr(expr)?;
                self.env.declare(name.clone(), value);
                Ok(Flow::Value(Value::Null))
            }
            Stmt::Assignment(meta, name, expr) => {
                let value = self.eval_expr(expr)?;
                if !self.env.update(name, value) {
                    return Err(self.internal_error(meta, format!("{name} not declared")));
                }
                Ok(Flow::Value(Value::Null))
            }
            Stmt::Return(_, expr) => {
                let value = match expr {
                    Some(e) => self.eval_expr(e)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::FunctionCallStmt(_, call) => {
                self.eval_expr(call)?;
                Ok(Flow::Value(Value::Null))
            }
            Stmt::If(meta, cond, then_block, else_block) => {
                let cond_bool = self.eval_condition(meta, cond)?;
                if cond_bool {
                    self.env.enter_scope();
                    let flow = self.eval_block(then_block);
                    self.env.exit_scope();
                    flow
                } else if let Some(else_block) = else_block {
                    self.env.enter_scope();
                    let flow = self.eval_block(else_block);
                    self.env.exit_scope();
                    flow
                } else {
                    Ok(Flow::Value(Value::Null))
                }
            }
            Stmt::While(meta, cond, body) => {
                loop {
                    if !self.eval_condition(meta, cond)? {
                        break;
                    }
                    self.env.enter_scope();
                    let flow = self.eval_block(body);
                    self.env.exit_scope();
                    let flow = flow?;
                    if flow.is_return() {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Value(Value::Null))
            }
            Stmt::FuncDecl(meta, name, params, body) => {
                let func = Rc::new(UserFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    meta: meta.clone(),
                });
                self.env.declare_function(name.clone(), Value::UserFunction(func));
                Ok(Flow::Value(Value::Null))
            }
        }
    }

    fn eval_condition(&mut self, meta: &Meta, cond: &Expr) -> Result<bool, EvalError> {
        match self.eval_expr(cond)? {
            Value::Boolean(b) => Ok(b),
            _ => Err(self.runtime_error(meta, CONDITION_DOES_NOT_EVALUATE_TO_A_BOOLEAN.to_string())),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Integer(_, v) => Ok(Value::Integer(*v)),
            Expr::Float(_, v) => Ok(Value::Float(*v)),
            Expr::Boolean(_, v) => Ok(Value::Boolean(*v)),
            Expr::StringLit(_, s) => Ok(Value::String(Rc::from(s.as_str()))),
            Expr::Identifier(meta, name) => self
                .env
                .lookup(name)
                .cloned()
                .ok_or_else(|| self.internal_error(meta, format!("{name} not declared"))),
            Expr::Prefix(meta, op, right) => {
                let v = self.eval_expr(right)?;
                self.eval_prefix(meta, *op, v)
            }
            Expr::Infix(meta, op, left, right) => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                self.eval_infix(meta, *op, l, r)
            }
            Expr::FunctionCall(meta, name, args) => self.eval_call(meta, name, args, expr),
            Expr::ArrayLiteral(_, elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for e in elems {
                    values.push(self.eval_expr(e)?);
                }
                Ok(Value::Array(Rc::new(values)))
            }
            Expr::ArrayIndex(meta, name, index) => {
                let array = self
                    .env
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| self.internal_error(meta, format!("{name} not declared")))?;
                let Value::Array(elems) = array else {
                    return Err(self.runtime_error(meta, not_of_type(name, "array")));
                };
                let idx_val = self.eval_expr(index)?;
                let Value::Integer(idx) = idx_val else {
                    return Err(self.runtime_error(meta, not_of_type(&idx_val.to_string(), "integer")));
                };
                if idx < 0 || idx as usize >= elems.len() {
                    return Err(self.runtime_error(meta, INDEX_OUT_OF_BOUNDS.to_string()));
                }
                Ok(elems[idx as usize].clone())
            }
        }
    }

    fn eval_prefix(&self, meta: &Meta, op: PrefixOp, v: Value) -> Result<Value, EvalError> {
        match (op, &v) {
            (PrefixOp::Plus, Value::Integer(n)) => Ok(Value::Integer(*n)),
            (PrefixOp::Plus, Value::Float(n)) => Ok(Value::Float(*n)),
            (PrefixOp::Minus, Value::Integer(n)) => Ok(Value::Integer(-n)),
            (PrefixOp::Minus, Value::Float(n)) => Ok(Value::Float(-n)),
            (PrefixOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
            _ => Err(self.runtime_error(meta, operation_not_available_for_type(&op.to_string(), v.type_name()))),
        }
    }

    fn eval_infix(&self, meta: &Meta, op: InfixOp, l: Value, r: Value) -> Result<Value, EvalError> {
        match (&l, &r) {
            (Value::Integer(a), Value::Integer(b)) => self.eval_infix_integer(meta, op, *a, *b),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.eval_infix_float(meta, op, as_f64(&l), as_f64(&r))
            }
            (Value::Boolean(a), Value::Boolean(b)) => self.eval_infix_boolean(meta, op, *a, *b),
            (Value::String(a), Value::String(b)) => self.eval_infix_string(meta, op, a, b),
            _ => Err(self.runtime_error(
                meta,
                operation_not_available_for_type(&op.to_string(), &format!("{}/{}", l.type_name(), r.type_name())),
            )),
        }
    }

    fn eval_infix_integer(&self, meta: &Meta, op: InfixOp, a: i64, b: i64) -> Result<Value, EvalError> {
        match op {
            InfixOp::Add => Ok(Value::Integer(a + b)),
            InfixOp::Sub => Ok(Value::Integer(a - b)),
            InfixOp::Mul => Ok(Value::Integer(a * b)),
            InfixOp::Div => {
                if b == 0 {
                    Err(self.runtime_error(meta, DIVISION_BY_ZERO.to_string()))
                } else {
                    Ok(Value::Integer(a / b))
                }
            }
            InfixOp::Lt => Ok(Value::Boolean(a < b)),
            InfixOp::LtEq => Ok(Value::Boolean(a <= b)),
            InfixOp::Gt => Ok(Value::Boolean(a > b)),
            InfixOp::GtEq => Ok(Value::Boolean(a >= b)),
            InfixOp::Eq => Ok(Value::Boolean(a == b)),
            InfixOp::NotEq => Ok(Value::Boolean(a != b)),
            InfixOp::And | InfixOp::Or => {
                Err(self.runtime_error(meta, operation_not_available_for_type(&op.to_string(), "integer")))
            }
        }
    }

    fn eval_infix_float(&self, meta: &Meta, op: InfixOp, a: f64, b: f64) -> Result<Value, EvalError> {
        match op {
            InfixOp::Add => Ok(Value::Float(a + b)),
            InfixOp::Sub => Ok(Value::Float(a - b)),
            InfixOp::Mul => Ok(Value::Float(a * b)),
            InfixOp::Div => {
                if b == 0.0 {
                    Err(self.runtime_error(meta, DIVISION_BY_ZERO.to_string()))
                } else {
                    Ok(Value::Float(a / b))
                }
            }
            InfixOp::Lt => Ok(Value::Boolean(a < b)),
            InfixOp::LtEq => Ok(Value::Boolean(a <= b)),
            InfixOp::Gt => Ok(Value::Boolean(a > b)),
            InfixOp::GtEq => Ok(Value::Boolean(a >= b)),
            InfixOp::Eq => Ok(Value::Boolean(a == b)),
            InfixOp::NotEq => Ok(Value::Boolean(a != b)),
            InfixOp::And | InfixOp::Or => {
                Err(self.runtime_error(meta, operation_not_available_for_type(&op.to_string(), "float")))
            }
        }
    }

    fn eval_infix_boolean(&self, meta: &Meta, op: InfixOp, a: bool, b: bool) -> Result<Value, EvalError> {
        match op {
            InfixOp::Eq => Ok(Value::Boolean(a == b)),
            InfixOp::NotEq => Ok(Value::Boolean(a != b)),
            InfixOp::And => Ok(Value::Boolean(a && b)),
            InfixOp::Or => Ok(Value::Boolean(a || b)),
            _ => Err(self.runtime_error(meta, operation_not_available_for_type(&op.to_string(), "boolean"))),
        }
    }

    fn eval_infix_string(&self, meta: &Meta, op: InfixOp, a: &Rc<str>, b: &Rc<str>) -> Result<Value, EvalError> {
        match op {
            InfixOp::Eq => Ok(Value::Boolean(a == b)),
            InfixOp::Add => Ok(Value::String(Rc::from(format!("{a}{b}")))),
            _ => Err(self.runtime_error(meta, operation_not_available_for_type(&op.to_string(), "string"))),
        }
    }

    fn eval_call(&mut self, meta: &Meta, name: &str, args: &[Expr], call_node: &Expr) -> Result<Value, EvalError> {
        self.call_stack.push(StackFrame {
            file: Rc::clone(&meta.file),
            line: meta.line,
            call_expr: call_node.to_string(),
        });

        let result = self.eval_call_body(meta, name, args);

        if result.is_ok() {
            self.call_stack.pop();
        }
        result
    }

    fn eval_call_body(&mut self, meta: &Meta, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval_expr(a)?);
        }

        let user_func = match self.env.lookup_function(name) {
            Some(Value::UserFunction(f)) => Some(Rc::clone(f)),
            _ => None,
        };

        if let Some(func) = user_func {
            self.call_user_function(&func, values)
        } else if let Some(native) = natives::lookup(name) {
            (native.func)(&values).map_err(|msg| self.runtime_error(meta, msg))
        } else {
            Err(self.internal_error(meta, format!("{name} not declared")))
        }
    }

    fn call_user_function(&mut self, func: &UserFunction, args: Vec<Value>) -> Result<Value, EvalError> {
        let saved = self.env.enter_function();
        for (param, arg) in func.params.iter().zip(args) {
            self.env.declare(param.clone(), arg);
        }
        let flow = self.eval_block(&func.body);
        self.env.exit_function(saved);
        Ok(flow?.into_value())
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::semantic::SemanticAnalyser;

    fn run(src: &str) -> (Evaluator, Result<(), EvalError>) {
        let (program, parse_errors) = Parser::new(src, "test.txt").parse();
        assert_eq!(parse_errors.len(), 0, "unexpected parse errors for {src:?}: {parse_errors:?}");
        let semantic_errors = SemanticAnalyser::new("test.txt").analyse(&program);
        assert_eq!(semantic_errors.len(), 0, "unexpected semantic errors for {src:?}: {semantic_errors:?}");
        let mut evaluator = Evaluator::new();
        let outcome = evaluator.eval_block(&program.statements).map(|_| ());
        (evaluator, outcome)
    }

    fn binding(evaluator: &Evaluator, name: &str) -> Value {
        evaluator.env.lookup(name).cloned().expect("variable should be bound")
    }

    #[test]
    fn inner_if_assignment_updates_outer_binding() {
        let (ev, result) = run("var x = 3; if (true) { x = 22; };");
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "x"), Value::Integer(22));
    }

    #[test]
    fn inner_scope_var_decl_shadows_without_leaking() {
        let (ev, result) = run("var x = 3; if (true) { var x = 22; };");
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "x"), Value::Integer(3));
    }

    #[test]
    fn array_indexing_and_length() {
        let (ev, result) = run("var x=[1,2,3,4]; var y=x[0]; var z=x[length(x)-1];");
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "y"), Value::Integer(1));
        assert_eq!(binding(&ev, "z"), Value::Integer(4));
    }

    #[test]
    fn float_promotion_arithmetic() {
        let (ev, result) = run("var a = 2 + -(3 * -4) / 9.0;");
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "a"), Value::Float(2.0 + 12.0 / 9.0));
    }

    #[test]
    fn recursive_factorial() {
        let (ev, result) = run(
            "func fact(n){ if (n==1){ return 1; }; return n*fact(n-1); }; var a = fact(5);",
        );
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "a"), Value::Integer(120));
    }

    #[test]
    fn while_loop_over_array() {
        let (ev, result) = run(
            "var x=[1,2,3,4,5,6,7,8,9]; var i=0; var a=-1; while (i<length(x)-4) { a=x[i]; i=i+1; };",
        );
        assert!(result.is_ok());
        assert_eq!(binding(&ev, "a"), Value::Integer(5));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (_ev, result) = run("var x = 10/0;");
        assert!(matches!(result, Err(e) if matches!(e.diagnostic, Diagnostic::Runtime { .. })));
    }

    #[test]
    fn non_boolean_condition_is_a_runtime_error() {
        let (program, parse_errors) = Parser::new("if (2) { print(2); };", "test.txt").parse();
        assert_eq!(parse_errors.len(), 0);
        let mut evaluator = Evaluator::new();
        let result = evaluator.eval_block(&program.statements);
        assert!(matches!(result, Err(e) if matches!(e.diagnostic, Diagnostic::Runtime { .. })));
    }

    #[test]
    fn mismatched_operand_types_is_a_runtime_error() {
        let (_ev, result) = run("var x = true + 1;");
        assert!(matches!(result, Err(e) if matches!(e.diagnostic, Diagnostic::Runtime { .. })));
    }

    #[test]
    fn negative_index_is_out_of_bounds() {
        let (_ev, result) = run("var x = [1,2,3,4]; x = x[-1];");
        assert!(matches!(result, Err(e) if matches!(e.diagnostic, Diagnostic::Runtime { .. })));
    }
}
