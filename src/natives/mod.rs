use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::function::{NativeFunction, Value};

/* The native-function registry is a single global map populated once at
startup; both the semantic analyser (arity checks) and the evaluator
(invocation) read it, and neither ever writes to it. */

static REGISTRY: Lazy<HashMap<&'static str, NativeFunction>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("print", NativeFunction { name: "print", arity: -1, func: native_print });
    m.insert("length", NativeFunction { name: "length", arity: 1, func: native_length });
    m.insert("isNull", NativeFunction { name: "isNull", arity: 1, func: native_is_null });
    m
});

pub fn lookup(name: &str) -> Option<&'static NativeFunction> {
    REGISTRY.get(name)
}

fn native_print(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        println!("{arg}");
    }
    Ok(Value::Null)
}

fn native_length(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Array(elems) => Ok(Value::Integer(elems.len() as i64)),
        other => Err(format!("{} not of type {}", other, "array")),
    }
}

fn native_is_null(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Boolean(args[0].is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn print_is_variadic() {
        let print = lookup("print").unwrap();
        assert_eq!(print.arity, -1);
    }

    #[test]
    fn length_of_array() {
        let arr = Value::Array(Rc::new(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(native_length(&[arr]).unwrap(), Value::Integer(2));
    }

    #[test]
    fn length_of_non_array_is_an_error() {
        assert!(native_length(&[Value::Integer(1)]).is_err());
    }

    #[test]
    fn is_null_reports_null_values() {
        assert_eq!(native_is_null(&[Value::Null]).unwrap(), Value::Boolean(true));
        assert_eq!(native_is_null(&[Value::Integer(0)]).unwrap(), Value::Boolean(false));
    }
}
