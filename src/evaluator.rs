use crate::Error;
use crate::ast::{Binding, Expression, Program};
use crate::builtinops::apply_primitive;
use crate::config::{ClassStrategy, InterpreterConfig, LetMode};
use crate::desugar::{desugar_classes, let_to_application};
use crate::result::{Result, map_result};
use crate::substitute::{NameGenerator, rename, substitute, value_to_expr};
use crate::value::{Class, Object, Value};
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    name: String,
    value: Value,
    parent: Option<Arc<Frame>>,
}

/// Top-level bindings, one immutable frame per `define`.
///
/// Extending returns a new environment whose frame points at the old one, so
/// bindings visible through an existing `Environment` never change.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    head: Option<Arc<Frame>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { head: None }
    }

    pub fn extend(&self, name: impl Into<String>, value: Value) -> Environment {
        Environment {
            head: Some(Arc::new(Frame {
                name: name.into(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut frame = self.head.as_deref();
        while let Some(current) = frame {
            if current.name == name {
                return Some(&current.value);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
    }
}

/// Substitution-model interpreter.
///
/// Holds the configuration and the fresh-name counter used when renaming
/// procedure bodies. The counter lives as long as the interpreter, so names
/// are unique across every program it evaluates.
#[derive(Debug, Default)]
pub struct Interpreter {
    config: InterpreterConfig,
    names: NameGenerator,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Interpreter {
            config,
            names: NameGenerator::new(),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Evaluate one expression against `env`
    pub fn evaluate(&mut self, expr: &Expression, env: &Environment) -> Result<Value> {
        self.eval_with_depth_tracking(expr, env, 0)
    }

    /// Evaluate a non-empty sequence; leading `define`s extend the environment
    /// for the rest of the sequence, and the last value is the result.
    pub fn evaluate_sequence(&mut self, exprs: &[Expression], env: &Environment) -> Result<Value> {
        self.eval_sequence(exprs, env, 0)
    }

    /// Evaluate a program in an empty top-level environment, after class
    /// desugaring if the interpreter is configured for it
    pub fn evaluate_program(&mut self, program: &Program) -> Result<Value> {
        match self.config.class_strategy {
            ClassStrategy::Inline => self.evaluate_sequence(&program.exprs, &Environment::new()),
            ClassStrategy::Desugar => {
                let desugared = desugar_classes(program)?;
                self.evaluate_sequence(&desugared.exprs, &Environment::new())
            }
        }
    }

    /// Read, parse and evaluate program text
    #[cfg(feature = "scheme")]
    pub fn evaluate_text(&mut self, text: &str) -> Result<Value> {
        let data = crate::scheme::parse_text(text)?;
        let program = crate::syntax::parse_program(&data)?;
        self.evaluate_program(&program)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth >= self.config.max_depth {
            return Err(Error::EvalError(format!(
                "Evaluation depth limit exceeded (max: {})",
                self.config.max_depth
            )));
        }
        Ok(())
    }

    /// Evaluate an expression with depth tracking to prevent stack overflow
    fn eval_with_depth_tracking(&mut self, expr: &Expression, env: &Environment, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        match expr {
            // Self-evaluating forms
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::PrimOp(op) => Ok(Value::PrimOp(*op)),
            Expression::Literal(value) => Ok(value.clone()),

            Expression::Var(name) => env.lookup(name),

            Expression::If { test, then, alt } => {
                let branch = if self.eval_with_depth_tracking(test, env, depth + 1)?.is_true() {
                    then
                } else {
                    alt
                };
                self.eval_with_depth_tracking(branch, env, depth + 1)
            }

            Expression::Lambda { params, body } => Ok(Value::closure(params.clone(), body.clone())),

            Expression::Class { fields, methods } => Ok(Value::class(fields.clone(), methods.clone())),

            Expression::Application { operator, operands } => {
                let procedure = self.eval_with_depth_tracking(operator, env, depth + 1)?;
                let args = map_result(operands, |operand| {
                    self.eval_with_depth_tracking(operand, env, depth + 1)
                })?;
                self.apply(procedure, args, env, depth + 1)
            }

            Expression::Let { bindings, body } => match self.config.let_mode {
                LetMode::Desugar => {
                    let application = let_to_application(bindings, body);
                    self.eval_with_depth_tracking(&application, env, depth + 1)
                }
                LetMode::Reject => Err(Error::Unsupported("\"let\"".to_owned())),
            },

            Expression::Define { name, .. } => Err(Error::EvalError(format!(
                "define is only allowed at top level (defining {name})"
            ))),
        }
    }

    fn eval_sequence(&mut self, exprs: &[Expression], env: &Environment, depth: usize) -> Result<Value> {
        self.check_depth(depth)?;
        let mut env = env.clone();
        let mut remaining = exprs;
        loop {
            match remaining {
                [] => return Err(Error::EvalError("Empty sequence".to_owned())),
                [Expression::Define { name, value }, rest @ ..] => {
                    let value = self.eval_with_depth_tracking(value, &env, depth + 1)?;
                    tracing::trace!(name = %name, "define");
                    env = env.extend(name.clone(), value);
                    remaining = rest;
                }
                [last] => return self.eval_with_depth_tracking(last, &env, depth + 1),
                [first, rest @ ..] => {
                    self.eval_with_depth_tracking(first, &env, depth + 1)?;
                    remaining = rest;
                }
            }
        }
    }

    /// Apply an evaluated procedure to evaluated arguments.
    ///
    /// Closure bodies run in the caller's environment: by the time a body is
    /// evaluated its parameters have been substituted away, so only top-level
    /// names remain free.
    #[tracing::instrument(level = "debug", skip_all, fields(procedure = %procedure, argc = args.len()))]
    fn apply(&mut self, procedure: Value, args: Vec<Value>, env: &Environment, depth: usize) -> Result<Value> {
        match procedure {
            Value::PrimOp(op) => apply_primitive(op, args),
            Value::Closure(closure) => {
                if closure.params.len() != args.len() {
                    return Err(Error::arity_error_with_context(
                        closure.params.len(),
                        args.len(),
                        "procedure",
                    ));
                }
                self.apply_closure(&closure.params, &closure.body, &args, env, depth)
            }
            Value::Class(class) => self.instantiate(&class, &args),
            Value::Object(object) => self.apply_object(&object, &args, env, depth),
            other @ (Value::Number(_)
            | Value::Bool(_)
            | Value::String(_)
            | Value::Symbol(_)
            | Value::List(_)) => Err(Error::NotAProcedure(other.to_string())),
        }
    }

    /// Rename the body, substitute the arguments for the parameters, evaluate
    fn apply_closure(
        &mut self,
        params: &[String],
        body: &[Expression],
        args: &[Value],
        env: &Environment,
        depth: usize,
    ) -> Result<Value> {
        let replacements: Vec<Expression> = args.iter().map(value_to_expr).collect();
        let renamed = rename(body, &mut self.names);
        let instantiated = substitute(&renamed, params, &replacements);
        self.eval_sequence(&instantiated, env, depth + 1)
    }

    /// Build an object whose methods have the field values substituted in
    fn instantiate(&mut self, class: &Class, args: &[Value]) -> Result<Value> {
        if class.fields.len() != args.len() {
            return Err(Error::arity_error_with_context(
                class.fields.len(),
                args.len(),
                "class constructor",
            ));
        }

        let method_values: Vec<Expression> = class.methods.iter().map(|m| m.value.clone()).collect();
        let renamed = rename(&method_values, &mut self.names);
        let replacements: Vec<Expression> = args.iter().map(value_to_expr).collect();
        let specialised = substitute(&renamed, &class.fields, &replacements);

        let methods = class
            .methods
            .iter()
            .zip(specialised)
            .map(|(method, value)| {
                if value.is_lambda() {
                    Ok(Binding::new(method.name.clone(), value))
                } else {
                    Err(Error::MalformedClassInstance(format!(
                        "method {} is not a lambda: {value}",
                        method.name
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Value::object(Class {
            fields: class.fields.clone(),
            methods,
        }))
    }

    /// Send a message: the first argument names the method, the rest are its arguments
    fn apply_object(&mut self, object: &Object, args: &[Value], env: &Environment, depth: usize) -> Result<Value> {
        let (message, rest) = match args.split_first() {
            Some((Value::Symbol(message), rest)) => (message, rest),
            Some((other, _)) => {
                return Err(Error::UnrecognizedMethod(format!("{other} (expected a symbol)")));
            }
            None => return Err(Error::UnrecognizedMethod("no message given".to_owned())),
        };

        let method = object
            .class
            .find_method(message)
            .ok_or_else(|| Error::UnrecognizedMethod(message.clone()))?;

        // Instances are only built from lambda methods
        let Expression::Lambda { params, body } = method else {
            return Err(Error::EvalError(format!("method {message} is not a procedure")));
        };

        if params.len() != rest.len() {
            return Err(Error::arity_error_with_context(
                params.len(),
                rest.len(),
                format!("method {message}"),
            ));
        }
        self.apply_closure(params, body, rest, env, depth)
    }
}

/// Evaluate a program with a fresh default interpreter
pub fn evaluate_program(program: &Program) -> Result<Value> {
    Interpreter::new().evaluate_program(program)
}

/// Read, parse and evaluate program text with a fresh default interpreter
#[cfg(feature = "scheme")]
pub fn evaluate_text(text: &str) -> Result<Value> {
    Interpreter::new().evaluate_text(text)
}
