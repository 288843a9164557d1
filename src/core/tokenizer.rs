//! Tokenizer for raw console lines.
//!
//! Splits a line into the command name and argument tokens. Quotes group
//! whitespace into one token and backslash escapes are resolved, so handlers
//! receive the text the operator meant.

use thiserror::Error;

/// Result of tokenizing a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedCommand {
    /// The command name (first token).
    pub command: String,
    /// The arguments (remaining tokens).
    pub args: Vec<String>,
}

impl TokenizedCommand {
    /// Arguments as string slices, the form dispatch expects.
    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

/// Tokenize error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// Empty input string.
    #[error("empty input")]
    EmptyInput,
    /// Unterminated quoted string.
    #[error("unterminated string at position {position}")]
    UnterminatedString { position: usize },
}

/// Tokenize a command line into command name and arguments.
///
/// # Syntax
///
/// - Tokens are separated by whitespace
/// - Single or double quotes group whitespace; quotes may sit mid-token
///   (`a"b c"` is one token `ab c`)
/// - `\` escapes the next character, inside or outside quotes
/// - `//` outside quotes starts a comment
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::tokenize;
///
/// let result = tokenize(r#"say "hello world""#).unwrap();
/// assert_eq!(result.command, "say");
/// assert_eq!(result.args, vec!["hello world"]);
///
/// let result = tokenize(r#"say "she said \"hi\"""#).unwrap();
/// assert_eq!(result.args, vec![r#"she said "hi""#]);
/// ```
pub fn tokenize(input: &str) -> Result<TokenizedCommand, TokenizeError> {
    let mut tokens = tokenize_string(input)?.into_iter();
    let command = tokens.next().ok_or(TokenizeError::EmptyInput)?;

    Ok(TokenizedCommand {
        command,
        args: tokens.collect(),
    })
}

/// Tokenize a string into individual tokens.
///
/// Lower-level function that returns all tokens including the command.
pub fn tokenize_string(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token exists even when empty, e.g. `""`.
    let mut in_token = false;
    let mut quote: Option<(char, usize)> = None;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                if let Some((_, escaped)) = chars.next() {
                    current.push(escaped);
                }
                in_token = true;
            }
            (Some((open, _)), c) if c == open => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some((c, i));
                in_token = true;
            }
            (None, '/') if chars.peek().is_some_and(|&(_, next)| next == '/') => break,
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some((_, position)) = quote {
        return Err(TokenizeError::UnterminatedString { position });
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}

/// Split a command string by semicolons into multiple commands.
///
/// Respects quoted strings (semicolons inside quotes are preserved).
///
/// # Examples
///
/// ```
/// use bevy_console_access::core::split_commands;
///
/// let commands = split_commands(r#"say "a; b"; ping"#);
/// assert_eq!(commands, vec![r#"say "a; b""#, "ping"]);
/// ```
pub fn split_commands(input: &str) -> Vec<&str> {
    let mut commands = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, ';') => {
                let cmd = input[start..i].trim();
                if !cmd.is_empty() {
                    commands.push(cmd);
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    let cmd = input[start..].trim();
    if !cmd.is_empty() {
        commands.push(cmd);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        let result = tokenize("print hello world").unwrap();
        assert_eq!(result.command, "print");
        assert_eq!(result.args, vec!["hello", "world"]);
        assert_eq!(result.arg_refs(), vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_no_args() {
        let result = tokenize("ping").unwrap();
        assert_eq!(result.command, "ping");
        assert!(result.args.is_empty());
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(tokenize("say 'hello world'").unwrap().args, vec!["hello world"]);
        assert_eq!(tokenize(r#"say "it's fine""#).unwrap().args, vec!["it's fine"]);
    }

    #[test]
    fn test_tokenize_mid_token_quote() {
        assert_eq!(tokenize(r#"say a"b c"d"#).unwrap().args, vec!["ab cd"]);
    }

    #[test]
    fn test_tokenize_empty_quoted_token() {
        assert_eq!(tokenize(r#"say """#).unwrap().args, vec![""]);
    }

    #[test]
    fn test_tokenize_escapes() {
        assert_eq!(tokenize(r#"say "a\"b""#).unwrap().args, vec![r#"a"b"#]);
        assert_eq!(tokenize(r#"say C:\\dir"#).unwrap().args, vec![r#"C:\dir"#]);
        assert_eq!(tokenize(r#"say two\ words"#).unwrap().args, vec!["two words"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert_eq!(tokenize(""), Err(TokenizeError::EmptyInput));
        assert_eq!(tokenize("   \t"), Err(TokenizeError::EmptyInput));
        assert_eq!(tokenize("// only a comment"), Err(TokenizeError::EmptyInput));
    }

    #[test]
    fn test_tokenize_unterminated_string() {
        assert_eq!(
            tokenize(r#"say "hello"#),
            Err(TokenizeError::UnterminatedString { position: 4 })
        );
    }

    #[test]
    fn test_tokenize_comment() {
        let result = tokenize("say hello // ignored").unwrap();
        assert_eq!(result.args, vec!["hello"]);

        let result = tokenize(r#"say "http://example""#).unwrap();
        assert_eq!(result.args, vec!["http://example"]);
    }

    #[test]
    fn test_split_commands() {
        assert_eq!(split_commands("ping; print a; say b"), vec!["ping", "print a", "say b"]);
        assert_eq!(split_commands(r#"say "x;y"; ping"#), vec![r#"say "x;y""#, "ping"]);
        assert_eq!(split_commands(r#"say a\;b; ping"#), vec![r#"say a\;b"#, "ping"]);
        assert!(split_commands(";;;").is_empty());
        assert!(split_commands("").is_empty());
    }

    #[test]
    fn test_split_commands_escaped_quote() {
        assert_eq!(
            split_commands(r#"say "a\";b"; ping"#),
            vec![r#"say "a\";b""#, "ping"]
        );
    }
}
