use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::{QuillError, Result};
use crate::instance::Instance;
use crate::interpreter::{Flow, Interpreter};
use crate::parser::FunctionDecl;
use crate::value::Value;

/// A user-defined function value: its declaration, the environment captured
/// at the declaration site, and whether it is a class initializer.
///
/// Binding a function to an instance produces a *new* function whose closure
/// is a one-slot `this` environment enclosed by the original closure.
#[derive(Debug)]
pub struct Function<'a> {
    declaration: Rc<FunctionDecl<'a>>,
    closure: Rc<RefCell<Environment<'a>>>,
    is_initializer: bool,
}

impl<'a> Function<'a> {
    pub fn new(
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce the bound-method form of this function: a copy whose closure
    /// defines `this` as `instance`, enclosed by the original closure.
    pub fn bind(&self, instance: Instance<'a>) -> Function<'a> {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Function {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function: bind parameters in a fresh environment enclosed
    /// by the closure, run the body, and convert a `return` unwind back into
    /// an ordinary value.  An initializer always yields its `this`, no matter
    /// what the body returns.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: &[Value<'a>],
    ) -> Result<Value<'a>> {
        debug!("Calling function '{}'", self.name());

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(param.lexeme, argument.clone());
        }

        let flow = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
                QuillError::runtime(self.declaration.name.line, "Initializer has no 'this'.")
            });
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

impl<'a> fmt::Display for Function<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A host function exposed to Quill programs through the global environment.
/// Shares the uniform arity-checked call contract with user functions.
#[derive(Clone)]
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
}

impl<'a> fmt::Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl<'a> fmt::Display for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
