//! Tree-walking evaluator for the **Quill** interpreter.
//!
//! Executes a resolved statement sequence against a chain of lexical
//! environments.  Evaluation is strictly synchronous and single-threaded;
//! ordering matches source order, including left-to-right operand and
//! argument evaluation.
//!
//! `return` is *not* an error: every statement executor yields a [`Flow`]
//! outcome and explicitly propagates `Flow::Return` upward until the
//! function-call boundary converts it back into an ordinary value.  A
//! runtime error is the only early stop: it unwinds to [`Interpreter::interpret`]
//! and aborts the remaining top-level statements.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::callable::{Function, NativeFunction};
use crate::class::Class;
use crate::environment::Environment;
use crate::error::{QuillError, Result};
use crate::instance::Instance;
use crate::parser::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: fall through to the next, or unwind
/// a `return` toward the nearest enclosing function call.
#[derive(Debug)]
pub enum Flow<'a> {
    Normal,
    Return(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Locals,
    out: Rc<RefCell<dyn Write>>,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter printing to stdout, with the native
    /// bindings defined in the global environment.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    /// Creates a new Interpreter writing `print` output to `out`.
    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));
        define_natives(&globals);

        Self {
            globals: globals.clone(),
            environment: globals,
            locals: Locals::new(),
            out,
        }
    }

    /// Executes a program: each top-level statement in order against the
    /// global environment, consulting `locals` (the resolver's
    /// binding-distance table) for every variable/`this`/`super` use.
    pub fn interpret(&mut self, statements: &[Stmt<'a>], locals: Locals) -> Result<()> {
        info!(
            "Interpreting {} statement(s) with {} resolved local(s)",
            statements.len(),
            locals.len()
        );

        self.locals = locals;

        for statement in statements {
            self.execute(statement)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ───────────────────────── statement execution ──────────────────────────

    fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out.borrow_mut(), "{}", value)?;

                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the environment active at the declaration,
                // so the function sees later mutations of captured names.
                let function =
                    Function::new(declaration.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Execute `statements` inside `environment`, restoring the prior
    /// environment on *every* exit path: normal, `return`-unwind, or error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut flow = Flow::Normal;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}

                Ok(Flow::Return(value)) => {
                    flow = Flow::Return(value);
                    break;
                }

                Err(e) => {
                    self.environment = previous;
                    return Err(e);
                }
            }
        }

        self.environment = previous;

        Ok(flow)
    }

    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&Expr<'a>>,
        methods: &[Rc<FunctionDecl<'a>>],
    ) -> Result<Flow<'a>> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass_value: Option<Class<'a>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match expr {
                        Expr::Variable { name, .. } => name.line,
                        _ => name.line,
                    };

                    return Err(QuillError::runtime(line, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // Pre-declare the name as nil so methods can refer to the class
        // itself; the finished class value is assigned over it below.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        let enclosing = if let Some(ref class) = superclass_value {
            let environment = Rc::new(RefCell::new(Environment::with_enclosing(
                self.environment.clone(),
            )));

            environment
                .borrow_mut()
                .define("super", Value::Class(class.clone()));

            Some(mem::replace(&mut self.environment, environment))
        } else {
            None
        };

        let mut method_table: HashMap<String, Rc<Function<'a>>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = Function::new(method.clone(), self.environment.clone(), is_initializer);

            method_table.insert(method.name.lexeme.to_string(), Rc::new(function));
        }

        let class = Class::new(name, superclass_value, method_table);

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        if !self
            .environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(class))
        {
            return Err(QuillError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            ));
        }

        Ok(Flow::Normal)
    }

    // ───────────────────────── expression evaluation ────────────────────────

    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(evaluate_literal(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(QuillError::runtime(
                        name.line,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut argument_values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee_value, paren, &argument_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name).ok_or_else(|| {
                    QuillError::runtime(
                        name.line,
                        format!("Undefined property '{}'.", name.lexeme),
                    )
                }),

                _ => Err(QuillError::runtime(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.set(name, value.clone());

                    Ok(value)
                }

                _ => Err(QuillError::runtime(
                    name.line,
                    "Only instances have fields.",
                )),
            },

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Variable reads consult the binding-distance table: a recorded
    /// distance resolves directly that many links outward; no entry means
    /// the name lives in the global environment.
    fn look_up_variable(&self, id: ExprId, name: &'a Token<'a>) -> Result<Value<'a>> {
        let value = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name.lexeme),
            None => self.globals.borrow().get(name.lexeme),
        };

        value.ok_or_else(|| {
            QuillError::runtime(
                name.line,
                format!("Undefined variable '{}'.", name.lexeme),
            )
        })
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            _ => Err(QuillError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &'a Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operands must be either numbers or strings",
                )),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::SLASH => match (left_value, right_value) {
                // IEEE-754 semantics: division by zero yields an infinity.
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(QuillError::runtime(
                    operator.line,
                    "Operand must be a number",
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            _ => Err(QuillError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'", operator.lexeme),
            )),
        }
    }

    /// `and`/`or` short-circuit and return the last-evaluated *operand*, not
    /// a coerced boolean.
    fn evaluate_logical(
        &mut self,
        left: &Expr<'a>,
        operator: &'a Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left_value = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR => {
                if is_truthy(&left_value) {
                    return Ok(left_value);
                }
            }

            _ => {
                // AND
                if !is_truthy(&left_value) {
                    return Ok(left_value);
                }
            }
        }

        self.evaluate(right)
    }

    /// `super.method` looks the method up starting at the *lexical* class's
    /// superclass (recorded at the resolved distance), and binds it to the
    /// `this` found one scope closer than `super`.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    ) -> Result<Value<'a>> {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,
            None => {
                return Err(QuillError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                ));
            }
        };

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(QuillError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                ));
            }
        };

        let object = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => {
                return Err(QuillError::runtime(
                    keyword.line,
                    "Cannot use 'super' outside of a class.",
                ));
            }
        };

        let found = superclass.find_method(method.lexeme).ok_or_else(|| {
            QuillError::runtime(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }

    /// Invokes a callable (native function, user function, or class used as
    /// a constructor) with the uniform arity contract.
    fn invoke_callable(
        &mut self,
        callee: Value<'a>,
        paren: &'a Token<'a>,
        arguments: &[Value<'a>],
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction(native) => {
                debug!("Calling native function '{}'", native.name);

                check_arity(native.arity, arguments.len(), paren)?;

                (native.func)(arguments)
                    .map_err(|message| QuillError::runtime(paren.line, message))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                debug!("Constructing instance of '{}'", class.name());

                check_arity(class.arity(), arguments.len(), paren)?;

                let instance = Instance::new(class.clone());

                if let Some(initializer) = class.find_method("init") {
                    // The constructor always yields the instance; whatever
                    // the initializer body returns is discarded.
                    initializer.bind(instance.clone()).call(self, arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(QuillError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

impl<'a> Default for Interpreter<'a> {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────── free helpers ─────────────────────────────────

fn evaluate_literal<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// `nil` and `false` are falsy; every other value (including `0` and `""`)
/// is truthy.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn check_arity(expected: usize, actual: usize, paren: &Token<'_>) -> crate::error::Result<()> {
    if expected != actual {
        return Err(QuillError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", expected, actual),
        ));
    }

    Ok(())
}

/// Installs the host bindings every program sees in the global environment.
fn define_natives<'a>(globals: &Rc<RefCell<Environment<'a>>>) {
    let mut env = globals.borrow_mut();

    debug!("Defining native function 'clock'");

    env.define(
        "clock",
        Value::NativeFunction(NativeFunction {
            name: "clock",
            arity: 0,
            func: |_args| {
                let timestamp: f64 = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| format!("Clock error: {}", e))?
                    .as_secs_f64();

                Ok(Value::Number(timestamp))
            },
        }),
    );

    env.define(
        "getc",
        Value::NativeFunction(NativeFunction {
            name: "getc",
            arity: 0,
            func: |_args| {
                let mut buffer = [0u8; 1];

                match std::io::stdin().read(&mut buffer) {
                    Ok(1) => Ok(Value::Number(f64::from(buffer[0]))),
                    Ok(_) => Ok(Value::Number(-1.0)), // EOF
                    Err(e) => Err(format!("getc: {}", e)),
                }
            },
        }),
    );

    env.define(
        "chr",
        Value::NativeFunction(NativeFunction {
            name: "chr",
            arity: 1,
            func: |args| match args {
                [Value::Number(code)] => match char::from_u32(*code as u32) {
                    Some(ch) => Ok(Value::String(ch.to_string())),
                    None => Err(format!("chr: invalid character code {}", code)),
                },
                _ => Err("chr: argument must be a number".to_string()),
            },
        }),
    );

    env.define(
        "exit",
        Value::NativeFunction(NativeFunction {
            name: "exit",
            arity: 1,
            func: |args| match args {
                [Value::Number(code)] => std::process::exit(*code as i32),
                _ => Err("exit: argument must be a number".to_string()),
            },
        }),
    );

    env.define(
        "print_error",
        Value::NativeFunction(NativeFunction {
            name: "print_error",
            arity: 1,
            func: |args| match args {
                [value] => {
                    eprintln!("{}", value);
                    Ok(Value::Nil)
                }
                _ => Err("print_error: expected one argument".to_string()),
            },
        }),
    );
}
