use std::fmt;
use std::rc::Rc;

use crate::parser::{Meta, Stmt};

/* Runtime values have no `ReturnValue` variant. Propagating a `return` out of
nested blocks is instead the job of `Flow`, returned by every statement/block
evaluation: `Flow::Return` threads through unchanged until it crosses a
function-call boundary, where it is unwrapped exactly once. This keeps a
stray return value from ever being usable as an operand in arithmetic, which
a wrapped-value representation cannot guarantee by construction.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Value(Value),
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Value(v) => v,
            Flow::Return(v) => v,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Flow::Return(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub meta: Meta,
}

pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    /// declared arity, `-1` meaning variadic.
    pub arity: i32,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).field("arity", &self.arity).finish()
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(Rc<str>),
    Null,
    Array(Rc<Vec<Value>>),
    UserFunction(Rc<UserFunction>),
    NativeFunction(Rc<NativeFunction>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::UserFunction(_) => "function",
            Value::NativeFunction(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:.6}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Null => write!(f, "null"),
            Value::Array(elems) => {
                write!(f, "[")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            Value::UserFunction(func) => write!(f, "<func {}>", func.name),
            Value::NativeFunction(func) => write!(f, "<native {}>", func.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_renders_with_six_decimals() {
        assert_eq!(Value::Float(3.0 + 1.0 / 3.0).to_string(), "3.333333");
    }

    #[test]
    fn string_renders_quoted() {
        assert_eq!(Value::String(Rc::from("hi")).to_string(), "\"hi\"");
    }

    #[test]
    fn flow_return_unwraps_to_its_value() {
        let flow = Flow::Return(Value::Integer(5));
        assert_eq!(flow.into_value(), Value::Integer(5));
    }
}
