//! Console command (ConCommand) implementation.
//!
//! ConCommands are named, typed commands restricted to a set of groups.
//! Their argument list is declared up front and validated before the handler
//! ever runs.

use std::fmt;

use bevy::prelude::*;

use super::{Capability, CommandContext, DispatchError, HandlerResult};

/// Declared type of a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Any token, kept verbatim.
    String,
    /// A floating point number.
    Number,
    /// A whole number.
    Integer,
    /// `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`.
    Boolean,
    /// Any token; the most specific value type is inferred.
    Unknown,
}

impl ArgType {
    /// Get the display name for this type.
    pub fn name(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Number => "number",
            ArgType::Integer => "integer",
            ArgType::Boolean => "boolean",
            ArgType::Unknown => "unknown",
        }
    }

    /// Parse a raw token as this type.
    pub fn parse(&self, token: &str) -> Option<ArgValue> {
        match self {
            ArgType::String => Some(ArgValue::String(token.to_string())),
            ArgType::Number => token
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ArgValue::Number),
            ArgType::Integer => token.parse().ok().map(ArgValue::Integer),
            ArgType::Boolean => match token.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(ArgValue::Boolean(true)),
                "false" | "0" | "no" | "off" => Some(ArgValue::Boolean(false)),
                _ => None,
            },
            ArgType::Unknown => Some(ArgValue::infer(token)),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of a command's argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSpec {
    /// Exactly one argument.
    Fixed(ArgType),
    /// Zero or more trailing arguments.
    Variadic(ArgType),
}

impl ArgSpec {
    #[inline]
    pub fn arg_type(&self) -> ArgType {
        match self {
            ArgSpec::Fixed(ty) | ArgSpec::Variadic(ty) => *ty,
        }
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        matches!(self, ArgSpec::Variadic(_))
    }
}

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
}

impl ArgValue {
    /// Infer the most specific value: boolean literal, integer, number, string.
    pub fn infer(token: &str) -> Self {
        match token {
            "true" => return ArgValue::Boolean(true),
            "false" => return ArgValue::Boolean(false),
            _ => {}
        }
        if let Ok(i) = token.parse() {
            ArgValue::Integer(i)
        } else if let Ok(n) = token.parse() {
            ArgValue::Number(n)
        } else {
            ArgValue::String(token.to_string())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            ArgValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::String(s) => f.write_str(s),
            ArgValue::Number(n) => write!(f, "{}", n),
            ArgValue::Integer(i) => write!(f, "{}", i),
            ArgValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parsed arguments passed to a command handler.
///
/// Fixed arguments come first, in declaration order, followed by any
/// variadic ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    values: Vec<ArgValue>,
    fixed: usize,
}

impl CommandArgs {
    pub fn new(values: Vec<ArgValue>, fixed: usize) -> Self {
        Self { values, fixed }
    }

    /// Get the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get an argument by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index)
    }

    /// Get a string argument by index.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(ArgValue::as_str)
    }

    /// The trailing variadic arguments.
    pub fn variadic(&self) -> &[ArgValue] {
        self.values.get(self.fixed..).unwrap_or(&[])
    }

    /// Get all arguments as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[ArgValue] {
        &self.values
    }

    /// Iterate over arguments.
    pub fn iter(&self) -> impl Iterator<Item = &ArgValue> {
        self.values.iter()
    }

    /// Join all arguments with a separator.
    pub fn join(&self, separator: &str) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Validate raw tokens against a command's argument list.
pub fn parse_args(
    command: &str,
    signature: &[ArgSpec],
    tokens: &[&str],
) -> Result<CommandArgs, DispatchError> {
    let fixed: Vec<ArgType> = signature
        .iter()
        .filter(|spec| !spec.is_variadic())
        .map(ArgSpec::arg_type)
        .collect();
    let variadic = signature.iter().find(|spec| spec.is_variadic()).map(ArgSpec::arg_type);

    let arity_ok = match variadic {
        Some(_) => tokens.len() >= fixed.len(),
        None => tokens.len() == fixed.len(),
    };
    if !arity_ok {
        return Err(DispatchError::Argument {
            command: command.into(),
            expected: match variadic {
                Some(_) => format!("at least {}", fixed.len()),
                None => fixed.len().to_string(),
            },
            got: tokens.len(),
            usage: usage(command, signature),
        });
    }

    let types = fixed.iter().copied().chain(std::iter::repeat(variadic.unwrap_or(ArgType::Unknown)));
    let mut values = Vec::with_capacity(tokens.len());
    for (index, (token, ty)) in tokens.iter().zip(types).enumerate() {
        let value = ty.parse(token).ok_or_else(|| DispatchError::ArgumentType {
            command: command.into(),
            position: index + 1,
            expected: ty,
            token: token.to_string(),
        })?;
        values.push(value);
    }

    Ok(CommandArgs::new(values, fixed.len()))
}

/// Render a usage line, e.g. `say <string>` or `print [unknown...]`.
pub fn usage(command: &str, signature: &[ArgSpec]) -> String {
    let mut out = command.to_string();
    for spec in signature {
        match spec {
            ArgSpec::Fixed(ty) => out.push_str(&format!(" <{}>", ty)),
            ArgSpec::Variadic(ty) => out.push_str(&format!(" [{}...]", ty)),
        }
    }
    out
}

/// Type alias for command handler functions.
///
/// Handlers receive:
/// - `ctx`: the call context (caller, parsed arguments, reply sink)
/// - `world`: Mutable access to the Bevy world
pub type CommandHandler = Box<dyn Fn(&mut CommandContext, &mut World) -> HandlerResult + Send + Sync>;

/// Metadata for a console command (stored in registry).
///
/// The handler is stored separately in `CommandHandlers` so handlers can
/// access the registry through `World` while running.
#[derive(Debug, Clone)]
pub struct ConCommandMeta {
    /// The command name.
    pub name: Box<str>,
    /// Description.
    pub description: &'static str,
    /// Declared arguments.
    pub signature: Vec<ArgSpec>,
    /// Groups whose members may run the command.
    pub allowed_groups: Vec<Box<str>>,
    /// Capability the caller must additionally resolve to `true`.
    pub required_capability: Option<Box<str>>,
}

impl ConCommandMeta {
    /// Get the command name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `group` is in the allowed list.
    pub fn allows(&self, group: &str) -> bool {
        self.allowed_groups.iter().any(|g| &**g == group)
    }

    /// Usage line built from the signature.
    pub fn usage(&self) -> String {
        usage(&self.name, &self.signature)
    }

    /// Check the signature: at most one variadic argument, and only last.
    pub fn validate_signature(&self) -> Result<(), &'static str> {
        let variadics = self.signature.iter().filter(|spec| spec.is_variadic()).count();
        if variadics > 1 {
            return Err("more than one variadic argument");
        }
        if variadics == 1 && !self.signature.last().is_some_and(ArgSpec::is_variadic) {
            return Err("variadic argument must be last");
        }
        Ok(())
    }
}

/// A console command with a handler function.
///
/// # Examples
///
/// ```ignore
/// let say = ConCommand::new("say", |ctx, _world| {
///     let message = ctx.args().str(0).unwrap_or_default().to_string();
///     ctx.reply_template("Console says '{Message}'", &[&message]);
///     Ok(())
/// })
/// .arg(ArgType::String)
/// .allow("user");
/// ```
pub struct ConCommand {
    meta: ConCommandMeta,
    handler: CommandHandler,
}

impl ConCommand {
    /// Create a new command with the given name and handler.
    pub fn new<F>(name: impl Into<Box<str>>, handler: F) -> Self
    where
        F: Fn(&mut CommandContext, &mut World) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            meta: ConCommandMeta {
                name: name.into(),
                description: "",
                signature: Vec::new(),
                allowed_groups: Vec::new(),
                required_capability: None,
            },
            handler: Box::new(handler),
        }
    }

    /// Set the description.
    pub fn description(mut self, desc: &'static str) -> Self {
        self.meta.description = desc;
        self
    }

    /// Append a fixed argument.
    pub fn arg(mut self, ty: ArgType) -> Self {
        self.meta.signature.push(ArgSpec::Fixed(ty));
        self
    }

    /// Append a variadic argument. Must be the last one.
    pub fn variadic(mut self, ty: ArgType) -> Self {
        self.meta.signature.push(ArgSpec::Variadic(ty));
        self
    }

    /// Allow members of `group` to run the command.
    pub fn allow(mut self, group: impl Into<Box<str>>) -> Self {
        self.meta.allowed_groups.push(group.into());
        self
    }

    /// Allow members of each group.
    pub fn allow_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        self.meta.allowed_groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Additionally require a capability to resolve to `true`.
    pub fn require(mut self, capability: &Capability) -> Self {
        self.meta.required_capability = Some(capability.into());
        self
    }

    /// Get the command name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[inline]
    pub fn meta(&self) -> &ConCommandMeta {
        &self.meta
    }

    /// Split the command into metadata and handler.
    ///
    /// This is used internally to store metadata and handler separately.
    pub fn split(self) -> (ConCommandMeta, CommandHandler) {
        (self.meta, self.handler)
    }
}

impl fmt::Debug for ConCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConCommand")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_type_parse() {
        assert_eq!(ArgType::Integer.parse("42"), Some(ArgValue::Integer(42)));
        assert_eq!(ArgType::Integer.parse("4.2"), None);
        assert_eq!(ArgType::Number.parse("4.5"), Some(ArgValue::Number(4.5)));
        assert_eq!(ArgType::Number.parse("NaN"), None);
        assert_eq!(ArgType::Number.parse("inf"), None);
        assert_eq!(ArgType::Number.parse("-infinity"), None);
        assert_eq!(ArgType::Boolean.parse("ON"), Some(ArgValue::Boolean(true)));
        assert_eq!(ArgType::Boolean.parse("maybe"), None);
        assert_eq!(ArgType::String.parse("42"), Some(ArgValue::String("42".into())));
    }

    #[test]
    fn test_unknown_infers() {
        assert_eq!(ArgValue::infer("true"), ArgValue::Boolean(true));
        assert_eq!(ArgValue::infer("7"), ArgValue::Integer(7));
        assert_eq!(ArgValue::infer("7.5"), ArgValue::Number(7.5));
        assert_eq!(ArgValue::infer("seven"), ArgValue::String("seven".into()));
    }

    #[test]
    fn test_parse_args_fixed() {
        let sig = [ArgSpec::Fixed(ArgType::String)];

        let args = parse_args("say", &sig, &["hello"]).unwrap();
        assert_eq!(args.str(0), Some("hello"));
        assert!(args.variadic().is_empty());

        assert!(matches!(
            parse_args("say", &sig, &[]),
            Err(DispatchError::Argument { got: 0, .. })
        ));
        assert!(matches!(
            parse_args("say", &sig, &["a", "b"]),
            Err(DispatchError::Argument { got: 2, .. })
        ));
    }

    #[test]
    fn test_parse_args_variadic() {
        let sig = [ArgSpec::Variadic(ArgType::Unknown)];

        assert!(parse_args("print", &sig, &[]).unwrap().is_empty());

        let args = parse_args("print", &sig, &["a", "1", "true"]).unwrap();
        assert_eq!(args.variadic().len(), 3);
        assert_eq!(args.join(" "), "a 1 true");
    }

    #[test]
    fn test_parse_args_type_mismatch() {
        let sig = [ArgSpec::Fixed(ArgType::String), ArgSpec::Variadic(ArgType::Integer)];

        let err = parse_args("sum", &sig, &["label", "1", "x"]).unwrap_err();
        match err {
            DispatchError::ArgumentType { position, expected, token, .. } => {
                assert_eq!(position, 3);
                assert_eq!(expected, ArgType::Integer);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_usage() {
        let sig = [ArgSpec::Fixed(ArgType::String), ArgSpec::Variadic(ArgType::Number)];
        assert_eq!(usage("sum", &sig), "sum <string> [number...]");
    }

    #[test]
    fn test_validate_signature() {
        let ok = ConCommand::new("a", |_, _| Ok(())).arg(ArgType::String).variadic(ArgType::Unknown);
        assert!(ok.meta().validate_signature().is_ok());

        let not_last = ConCommand::new("b", |_, _| Ok(())).variadic(ArgType::Unknown).arg(ArgType::String);
        assert_eq!(not_last.meta().validate_signature(), Err("variadic argument must be last"));

        let twice = ConCommand::new("c", |_, _| Ok(())).variadic(ArgType::Unknown).variadic(ArgType::Unknown);
        assert_eq!(twice.meta().validate_signature(), Err("more than one variadic argument"));
    }

    #[test]
    fn test_concommand_creation() {
        let cmd = ConCommand::new("ping", |_, _| Ok(()))
            .description("Reply with Pong!")
            .allow("creator")
            .allow_groups(["admin"]);

        assert_eq!(cmd.name(), "ping");
        assert!(cmd.meta().allows("creator"));
        assert!(cmd.meta().allows("admin"));
        assert!(!cmd.meta().allows("user"));
    }
}
