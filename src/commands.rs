//! The `:` command set and its tokenizer.

use std::path::Path;

use crate::app::App;
use crate::error::{AppError, Result};
use crate::script::{compile, Script};

/// Split a command line into whitespace-delimited tokens.
///
/// A quote character switches whitespace off until its partner; the quote
/// characters themselves stay in the token. An unterminated quote is an
/// error.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(AppError::Parse("unterminated quoted argument".into()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn require_args(verb: &str, tokens: &[String], expected: usize) -> Result<()> {
    let got = tokens.len() - 1;
    if got == expected {
        Ok(())
    } else {
        Err(AppError::Parse(format!(
            "{verb} expects {expected} argument(s), got {got}"
        )))
    }
}

/// Longest chain of alias substitutions followed before giving up.
const MAX_ALIAS_DEPTH: usize = 16;

impl App {
    /// Execute one command line. A leading `:` is tolerated so replayed
    /// and aliased command text need not be stripped first.
    pub fn dispatch_command(&mut self, line: &str) -> Result<()> {
        self.dispatch_command_at(line, 0)
    }

    fn dispatch_command_at(&mut self, line: &str, depth: usize) -> Result<()> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(AppError::Parse(
                "alias expansion is too deep (self-referential alias?)".into(),
            ));
        }
        let line = line.trim();
        let line = line.strip_prefix(':').unwrap_or(line).trim_start();
        if line.is_empty() {
            return Ok(());
        }
        let tokens = split_command(line)?;
        let verb = tokens[0].as_str();
        // Raw remainder, for the commands that take free text.
        let rest = line[verb.len()..].trim_start();

        match verb {
            "exit" => {
                require_args(verb, &tokens, 0)?;
                self.quit();
                Ok(())
            }
            "begin" => {
                require_args(verb, &tokens, 0)?;
                self.terminal.begin_script();
                self.log.line("recording a script; finish with :end");
                Ok(())
            }
            "end" => {
                if tokens.len() > 2 {
                    return Err(AppError::Parse("end takes at most one name".into()));
                }
                if !self.terminal.script_being_written() {
                    return Err(AppError::Parse("no script is being recorded".into()));
                }
                let source = self.terminal.take_script_buffer();
                let program =
                    compile(&source).map_err(|e| AppError::Parse(e.to_string()))?;
                let script = Script::new(tokens.get(1).map(String::as_str), source, program);
                self.manage_script(script);
                Ok(())
            }
            "cancel" => {
                require_args(verb, &tokens, 0)?;
                self.terminal.cancel_script();
                self.log.line("discarded the recorded script");
                Ok(())
            }
            "on_no_playback" => {
                require_args(verb, &tokens, 0)?;
                self.terminal.set_pending_idle();
                self.log.line("the next script becomes the idle script");
                Ok(())
            }
            "print_buffer" => {
                require_args(verb, &tokens, 0)?;
                let buffer = self.terminal.script_buffer().to_string();
                for line in buffer.lines() {
                    self.log.line(line);
                }
                Ok(())
            }
            "bind" => {
                require_args(verb, &tokens, 1)?;
                let mut chars = tokens[1].chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => {
                        self.terminal.set_pending_bind(ch);
                        self.log
                            .line(format!("the next script binds to '{ch}'"));
                        Ok(())
                    }
                    _ => Err(AppError::Parse(format!(
                        "bind takes a single character, got '{}'",
                        tokens[1]
                    ))),
                }
            }
            "load_script" => {
                require_args(verb, &tokens, 1)?;
                // Routing a side-loaded script here would consume pending
                // bind/idle flags meant for the recording in progress.
                if self.terminal.script_being_written() {
                    return Err(AppError::Parse(
                        "load_script cannot run while a script is being recorded".into(),
                    ));
                }
                let path = Path::new(&tokens[1]);
                let source = std::fs::read_to_string(path)?;
                let program =
                    compile(&source).map_err(|e| AppError::Parse(e.to_string()))?;
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.manage_script(Script::new(Some(&name), source, program));
                Ok(())
            }
            "load_config" => {
                require_args(verb, &tokens, 1)?;
                self.run_command_file(Path::new(&tokens[1]))
            }
            "new_command" => {
                require_args(verb, &tokens, 2)?;
                let file = Path::new(&tokens[2]);
                if !file.is_file() {
                    return Err(AppError::InvalidPath(format!(
                        "{} does not exist",
                        file.display()
                    )));
                }
                self.terminal.define_macro(&tokens[1], file.to_path_buf());
                self.log.line(format!("new command {}", tokens[1]));
                Ok(())
            }
            "alias" => {
                let (name, command) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| AppError::Parse("alias takes a name and a command".into()))?;
                self.terminal
                    .define_alias(name, command.trim_start().to_string());
                Ok(())
            }
            "echo" => {
                self.log.line(rest);
                Ok(())
            }
            "set_search" => {
                self.tree.set_search(rest);
                Ok(())
            }
            other => {
                if let Some(file) = self.terminal.macro_file(other).cloned() {
                    self.run_command_file(&file)
                } else if let Some(command) = self.terminal.alias(other).map(str::to_string) {
                    let full = if rest.is_empty() {
                        command
                    } else {
                        format!("{command} {rest}")
                    };
                    self.dispatch_command_at(&full, depth + 1)
                } else {
                    Err(AppError::Parse(format!("unknown command '{other}'")))
                }
            }
        }
    }
}
