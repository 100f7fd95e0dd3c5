//! The embedded scripting surface: a line-oriented expression language
//! compiled into a callable program that dispatches every call through a
//! host-function table.
//!
//! Compilation is syntax-only; names resolve at run time, so a script that
//! mentions an unknown function compiles fine and fails when invoked.

pub mod host;

use thiserror::Error;

/// Tagged value passed between scripts and host functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Int(i64),
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Script compilation and execution errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{name}: expected {expected} arguments, got {got}")]
    WrongArgCount {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{name}: expected {expected} argument, found {found}")]
    WrongArgType {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Runtime(String),
}

/// A parsed expression: a literal or a host-function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Str(String),
    Call { name: String, args: Vec<Expr> },
}

/// Compiled form of a script: one expression per source statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    statements: Vec<Expr>,
}

impl Program {
    pub fn statements(&self) -> &[Expr] {
        &self.statements
    }

    /// Evaluate every statement in order, stopping at the first error.
    pub fn run(&self, host: &mut dyn HostDispatch) -> Result<(), ScriptError> {
        for statement in &self.statements {
            eval(statement, host)?;
        }
        Ok(())
    }
}

/// The boundary to the host: scripts can only act through named calls.
pub trait HostDispatch {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError>;
}

fn eval(expr: &Expr, host: &mut dyn HostDispatch) -> Result<Value, ScriptError> {
    match expr {
        Expr::Int(v) => Ok(Value::Int(*v)),
        Expr::Bool(v) => Ok(Value::Bool(*v)),
        Expr::Str(v) => Ok(Value::Str(v.clone())),
        Expr::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, host)?);
            }
            host.call(name, &values)
        }
    }
}

/// Compile source text into a [`Program`].
///
/// One statement per line; blank lines and `//` or `#` comments are
/// skipped. A statement is a call (`name` or `name(arg, ...)`) whose
/// arguments are integers, strings, booleans, or nested calls.
pub fn compile(source: &str) -> Result<Program, ScriptError> {
    let mut statements = Vec::new();
    for (number, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        let mut parser = Parser::new(line, number + 1);
        let expr = parser.expression()?;
        parser.expect_end()?;
        statements.push(expr);
    }
    Ok(Program { statements })
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            chars: text.chars().peekable(),
            line,
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_spaces(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.skip_spaces();
        match self.chars.peek() {
            Some('"') => self.string_literal(),
            Some(c) if c.is_ascii_digit() || *c == '-' => self.int_literal(),
            Some(c) if c.is_alphabetic() || *c == '_' => self.call_or_keyword(),
            Some(&c) => Err(self.error(format!("unexpected character '{c}'"))),
            None => Err(self.error("expected an expression")),
        }
    }

    fn string_literal(&mut self) -> Result<Expr, ScriptError> {
        self.chars.next(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(Expr::Str(value)),
                Some('\\') => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => return Err(self.error(format!("unknown escape '\\{c}'"))),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn int_literal(&mut self) -> Result<Expr, ScriptError> {
        let mut text = String::new();
        if self.chars.next_if(|c| *c == '-').is_some() {
            text.push('-');
        }
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit()) {
            text.push(c);
        }
        text.parse::<i64>()
            .map(Expr::Int)
            .map_err(|_| self.error(format!("invalid integer '{text}'")))
    }

    fn call_or_keyword(&mut self) -> Result<Expr, ScriptError> {
        let mut name = String::new();
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_alphanumeric() || *c == '_')
        {
            name.push(c);
        }
        match name.as_str() {
            "true" => return Ok(Expr::Bool(true)),
            "false" => return Ok(Expr::Bool(false)),
            _ => {}
        }

        self.skip_spaces();
        let mut args = Vec::new();
        if self.chars.next_if(|c| *c == '(').is_some() {
            self.skip_spaces();
            if self.chars.next_if(|c| *c == ')').is_none() {
                loop {
                    args.push(self.expression()?);
                    self.skip_spaces();
                    match self.chars.next() {
                        Some(',') => continue,
                        Some(')') => break,
                        Some(c) => {
                            return Err(self.error(format!("expected ',' or ')', found '{c}'")))
                        }
                        None => return Err(self.error("missing closing ')'")),
                    }
                }
            }
        }
        Ok(Expr::Call { name, args })
    }

    fn expect_end(&mut self) -> Result<(), ScriptError> {
        self.skip_spaces();
        match self.chars.next() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected trailing '{c}'"))),
        }
    }
}

/// A named or anonymous unit of script source plus its compiled form.
///
/// Owned by whichever slot currently references it: an immediate run, a
/// keybinding, or the idle hook.
#[derive(Debug, Clone)]
pub struct Script {
    name: String,
    source: String,
    program: Program,
}

impl Script {
    pub fn new(name: Option<&str>, source: String, program: Program) -> Self {
        Self {
            name: name.unwrap_or("").to_string(),
            source,
            program,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The name, or the source text for anonymous scripts.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.source.trim_end_matches('\n')
        } else {
            &self.name
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    pub fn run(&self, host: &mut dyn HostDispatch) -> Result<(), ScriptError> {
        self.program.run(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records calls and returns scripted values.
    struct FakeHost {
        calls: Vec<(String, Vec<Value>)>,
        result: Value,
    }

    impl FakeHost {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                result: Value::Unit,
            }
        }
    }

    impl HostDispatch for FakeHost {
        fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
            if name == "missing" {
                return Err(ScriptError::UnknownFunction(name.to_string()));
            }
            self.calls.push((name.to_string(), args.to_vec()));
            Ok(self.result.clone())
        }
    }

    #[test]
    fn compiles_zero_arg_call_without_parens() {
        let program = compile("x").unwrap();
        assert_eq!(
            program.statements(),
            [Expr::Call {
                name: "x".into(),
                args: vec![]
            }]
        );
    }

    #[test]
    fn compiles_literal_arguments() {
        let program = compile(r#"send("pause", -3, true)"#).unwrap();
        assert_eq!(
            program.statements(),
            [Expr::Call {
                name: "send".into(),
                args: vec![
                    Expr::Str("pause".into()),
                    Expr::Int(-3),
                    Expr::Bool(true)
                ],
            }]
        );
    }

    #[test]
    fn nested_calls_evaluate_inside_out() {
        let mut host = FakeHost::new();
        host.result = Value::Int(7);
        let program = compile("select_index(random_index())").unwrap();
        program.run(&mut host).unwrap();
        assert_eq!(host.calls[0].0, "random_index");
        assert_eq!(host.calls[1], ("select_index".into(), vec![Value::Int(7)]));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let program = compile("// pick something\n\n# legacy comment\nplay_selected\n").unwrap();
        assert_eq!(program.statements().len(), 1);
    }

    #[test]
    fn string_escapes() {
        let program = compile(r#"print("a\"b\\c\nd")"#).unwrap();
        let Expr::Call { args, .. } = &program.statements()[0] else {
            panic!("expected call");
        };
        assert_eq!(args[0], Expr::Str("a\"b\\c\nd".into()));
    }

    #[test]
    fn parse_error_carries_line_number() {
        let err = compile("print(\"ok\")\nprint(\"broken\n").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Parse {
                line: 2,
                message: "unterminated string".into()
            }
        );
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let err = compile("?").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Parse {
                line: 1,
                message: "unexpected character '?'".into()
            }
        );
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(matches!(
            compile("play_selected extra").unwrap_err(),
            ScriptError::Parse { line: 1, .. }
        ));
    }

    #[test]
    fn unknown_function_fails_at_run_time_not_compile_time() {
        let program = compile("missing").unwrap();
        let mut host = FakeHost::new();
        assert_eq!(
            program.run(&mut host).unwrap_err(),
            ScriptError::UnknownFunction("missing".into())
        );
    }

    #[test]
    fn run_stops_at_first_error() {
        let mut host = FakeHost::new();
        let program = compile("print(\"one\")\nmissing\nprint(\"two\")").unwrap();
        assert!(program.run(&mut host).is_err());
        assert_eq!(host.calls.len(), 1);
    }

    #[test]
    fn display_name_falls_back_to_source() {
        let program = compile("play_selected").unwrap();
        let anonymous = Script::new(None, "play_selected\n".into(), program.clone());
        assert_eq!(anonymous.display_name(), "play_selected");
        let named = Script::new(Some("shuffle"), "play_selected\n".into(), program);
        assert_eq!(named.display_name(), "shuffle");
    }

    #[test]
    fn empty_script_detection() {
        let program = compile("").unwrap();
        let script = Script::new(None, "\n  \n".into(), program);
        assert!(script.is_empty());
    }
}
