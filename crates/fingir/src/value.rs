//! Dynamic argument and result values.
//!
//! The generated adapter layer talks to the engine through a textual member
//! name plus an ordered argument list. Arguments and results are dynamic
//! JSON values, which gives matchers structural value equality (not
//! identity) and a printable form for failure messages.

use serde::{Deserialize, Serialize};

/// Dynamic value passed as an argument or produced as a result
pub type ArgValue = serde_json::Value;

/// A named argument within a recorded interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    /// Parameter name as known to the adapter
    pub name: String,
    /// Argument value
    pub value: ArgValue,
}

impl NamedArg {
    /// Create a named argument
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Name a flat value list positionally (`arg0`, `arg1`, ...)
///
/// Adapters that do not carry parameter names use this to build the
/// ordered argument list the engine records.
#[must_use]
pub fn positional_args<I, V>(values: I) -> Vec<NamedArg>
where
    I: IntoIterator<Item = V>,
    V: Into<ArgValue>,
{
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| NamedArg::new(format!("arg{i}"), v))
        .collect()
}

/// Render an argument list for diagnostics and failure messages
#[must_use]
pub fn render_args(args: &[NamedArg]) -> String {
    let rendered: Vec<String> = args
        .iter()
        .map(|a| format!("{}: {}", a.name, a.value))
        .collect();
    format!("[{}]", rendered.join(", "))
}
