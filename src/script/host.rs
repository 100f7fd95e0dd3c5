//! The host-function table scripts dispatch through, and the borrowed
//! view of application state they operate on.

use rand::Rng;

use crate::browse::tree::DirTree;
use crate::input::InputSource;
use crate::output::OutputLog;
use crate::playback::PlaybackSupervisor;
use crate::script::{HostDispatch, ScriptError, Value};

/// Mutable view of the application handed to a running script.
///
/// Borrowed for the duration of one script run; scripts act on the same
/// state the command dispatcher does.
pub struct ScriptHost<'a> {
    pub tree: &'a mut DirTree,
    pub player: &'a mut PlaybackSupervisor,
    pub log: &'a mut OutputLog,
    pub input: &'a mut InputSource,
}

type HostFn = fn(&mut ScriptHost, &[Value]) -> Result<Value, ScriptError>;

/// Every function a script can call, by name.
const HOST_FUNCTIONS: &[(&str, HostFn)] = &[
    ("send", send),
    ("play_selected", play_selected),
    ("play_index", play_index),
    ("stop_playback", stop_playback),
    ("playback_in_progress", playback_in_progress),
    ("select_index", select_index),
    ("select_up", select_up),
    ("select_down", select_down),
    ("select_enclosing", select_enclosing),
    ("toggle", toggle),
    ("current_index", current_index),
    ("random_index", random_index),
    ("item_count", item_count),
    ("depth", depth),
    ("is_dir", is_dir),
    ("selected_is_dir", selected_is_dir),
    ("is_expanded", is_expanded),
    ("entry_name", entry_name),
    ("set_search", set_search),
    ("next_match", next_match),
    ("prev_match", prev_match),
    ("get_line", get_line),
    ("get_char", get_char),
    ("print", print),
    ("println", println),
];

impl HostDispatch for ScriptHost<'_> {
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
        match HOST_FUNCTIONS.iter().find(|(n, _)| *n == name) {
            Some((_, f)) => f(self, args),
            None => Err(ScriptError::UnknownFunction(name.to_string())),
        }
    }
}

// ── Argument helpers ─────────────────────────────────────────────────────

fn arity(name: &'static str, args: &[Value], expected: usize) -> Result<(), ScriptError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ScriptError::WrongArgCount {
            name,
            expected,
            got: args.len(),
        })
    }
}

fn int_arg(name: &'static str, value: &Value) -> Result<i64, ScriptError> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(ScriptError::WrongArgType {
            name,
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn str_arg<'v>(name: &'static str, value: &'v Value) -> Result<&'v str, ScriptError> {
    match value {
        Value::Str(v) => Ok(v),
        other => Err(ScriptError::WrongArgType {
            name,
            expected: "string",
            found: other.type_name(),
        }),
    }
}

/// An int argument that must name an entry in the array.
fn index_arg(name: &'static str, host: &ScriptHost, value: &Value) -> Result<usize, ScriptError> {
    let raw = int_arg(name, value)?;
    let index = usize::try_from(raw)
        .map_err(|_| ScriptError::Runtime(format!("{name}: index {raw} is negative")))?;
    if !host.tree.is_in_range(index) {
        return Err(ScriptError::Runtime(format!(
            "{name}: index {index} is out of range (0..{})",
            host.tree.item_count()
        )));
    }
    Ok(index)
}

// ── Playback ─────────────────────────────────────────────────────────────

fn send(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("send", args, 1)?;
    let line = str_arg("send", &args[0])?;
    host.player
        .send(line)
        .map_err(|e| ScriptError::Runtime(e.to_string()))?;
    Ok(Value::Unit)
}

fn play_selected(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("play_selected", args, 0)?;
    let index = host.tree.current_index();
    play_entry(host, index)
}

fn play_index(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("play_index", args, 1)?;
    let index = index_arg("play_index", host, &args[0])?;
    play_entry(host, index)
}

fn play_entry(host: &mut ScriptHost, index: usize) -> Result<Value, ScriptError> {
    let entry = host.tree.entry(index);
    if entry.is_dir() {
        return Err(ScriptError::Runtime(format!(
            "'{}' is a directory, not a song",
            entry.name
        )));
    }
    let path = entry.path.clone();
    host.player
        .start(&path)
        .map_err(|e| ScriptError::Runtime(e.to_string()))?;
    Ok(Value::Unit)
}

fn stop_playback(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("stop_playback", args, 0)?;
    host.player.stop();
    Ok(Value::Unit)
}

fn playback_in_progress(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("playback_in_progress", args, 0)?;
    Ok(Value::Bool(host.player.in_progress()))
}

// ── Selection and navigation ─────────────────────────────────────────────

fn select_index(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("select_index", args, 1)?;
    let index = index_arg("select_index", host, &args[0])?;
    host.tree.select(index);
    Ok(Value::Unit)
}

fn select_up(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("select_up", args, 0)?;
    host.tree.select_up();
    Ok(Value::Unit)
}

fn select_down(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("select_down", args, 0)?;
    host.tree.select_down();
    Ok(Value::Unit)
}

fn select_enclosing(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("select_enclosing", args, 0)?;
    host.tree.select_enclosing(host.tree.current_index());
    Ok(Value::Unit)
}

fn toggle(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("toggle", args, 1)?;
    let index = index_arg("toggle", host, &args[0])?;
    host.tree
        .toggle(index)
        .map_err(|e| ScriptError::Runtime(e.to_string()))?;
    Ok(Value::Unit)
}

fn current_index(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("current_index", args, 0)?;
    Ok(Value::Int(host.tree.current_index() as i64))
}

fn random_index(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("random_index", args, 0)?;
    let count = host.tree.item_count();
    let index = rand::thread_rng().gen_range(0..count);
    Ok(Value::Int(index as i64))
}

fn item_count(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("item_count", args, 0)?;
    Ok(Value::Int(host.tree.item_count() as i64))
}

// ── Entry queries ────────────────────────────────────────────────────────

fn depth(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("depth", args, 1)?;
    let index = index_arg("depth", host, &args[0])?;
    Ok(Value::Int(host.tree.depth(index) as i64))
}

fn is_dir(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("is_dir", args, 1)?;
    let index = index_arg("is_dir", host, &args[0])?;
    Ok(Value::Bool(host.tree.is_dir(index)))
}

fn selected_is_dir(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("selected_is_dir", args, 0)?;
    Ok(Value::Bool(host.tree.current_entry().is_dir()))
}

fn is_expanded(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("is_expanded", args, 1)?;
    let index = index_arg("is_expanded", host, &args[0])?;
    Ok(Value::Bool(host.tree.is_expanded(index)))
}

fn entry_name(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("entry_name", args, 1)?;
    let index = index_arg("entry_name", host, &args[0])?;
    Ok(Value::Str(host.tree.entry(index).name.clone()))
}

// ── Search ───────────────────────────────────────────────────────────────

fn set_search(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("set_search", args, 1)?;
    let term = str_arg("set_search", &args[0])?;
    host.tree.set_search(term);
    Ok(Value::Unit)
}

/// Advance the selection to the next matching entry, wrapping nowhere.
/// Returns whether a match was found.
fn next_match(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("next_match", args, 0)?;
    match host.tree.next_match(host.tree.current_index() + 1) {
        Some(index) => {
            host.tree.select(index);
            Ok(Value::Bool(true))
        }
        None => Ok(Value::Bool(false)),
    }
}

fn prev_match(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("prev_match", args, 0)?;
    let current = host.tree.current_index();
    if current == 0 {
        return Ok(Value::Bool(false));
    }
    match host.tree.prev_match(current - 1) {
        Some(index) => {
            host.tree.select(index);
            Ok(Value::Bool(true))
        }
        None => Ok(Value::Bool(false)),
    }
}

// ── Terminal I/O ─────────────────────────────────────────────────────────

fn get_line(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("get_line", args, 0)?;
    let line = host.input.read_line_blocking(host.log);
    Ok(Value::Str(line))
}

fn get_char(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    arity("get_char", args, 0)?;
    match host.input.read_char_blocking() {
        Some(c) => Ok(Value::Str(c.to_string())),
        None => Err(ScriptError::Runtime("input source closed".into())),
    }
}

fn print(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    for value in args {
        host.log.append(&value.to_string());
    }
    Ok(Value::Unit)
}

fn println(host: &mut ScriptHost, args: &[Value]) -> Result<Value, ScriptError> {
    for value in args {
        host.log.append(&value.to_string());
    }
    host.log.line("");
    Ok(Value::Unit)
}
