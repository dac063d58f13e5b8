use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

/// A single command in a pipeline: argv plus optional I/O redirections.
///
/// Invariant: `args` is never empty once a `Command` escapes the parser —
/// an empty command between pipes is a parse error, not an empty `Command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
    pub input: Option<String>,
    /// `(path, append)` — append is only meaningful together with a path,
    /// but is tracked unconditionally to match the data model's pairing.
    pub output: Option<(String, bool)>,
}

impl Command {
    fn new() -> Self {
        Command {
            args: Vec::new(),
            input: None,
            output: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.args.is_empty() && self.input.is_none() && self.output.is_none()
    }
}

/// A non-empty ordered sequence of [`Command`]s plus a background flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub background: bool,
}

/// Parse a token stream into a [`Pipeline`].
///
/// Grammar:
/// ```text
/// pipeline  := command ('|' command)* ('&')?
/// command   := (WORD | redir)+
/// redir     := '<' WORD | '>' WORD | '>>' WORD
/// ```
pub fn parse(tokens: Vec<Token>) -> Result<Pipeline, ParseError> {
    let mut tokens = tokens.into_iter().peekable();
    let mut background = false;
    let mut commands = Vec::new();
    let mut current = Command::new();
    let mut any_word_in_current = false;

    while let Some(token) = tokens.next() {
        match token.kind {
            TokenKind::Word => {
                current.args.push(token.text);
                any_word_in_current = true;
            }
            TokenKind::RedirIn => {
                let target = expect_word(&mut tokens, "<")?;
                current.input = Some(target);
            }
            TokenKind::RedirOut => {
                let target = expect_word(&mut tokens, ">")?;
                current.output = Some((target, false));
            }
            TokenKind::RedirAppend => {
                let target = expect_word(&mut tokens, ">>")?;
                current.output = Some((target, true));
            }
            TokenKind::Pipe => {
                if !any_word_in_current {
                    return Err(ParseError::EmptyCommand);
                }
                commands.push(std::mem::replace(&mut current, Command::new()));
                any_word_in_current = false;
            }
            TokenKind::Background => {
                if tokens.peek().is_some() {
                    return Err(ParseError::MisplacedBackground);
                }
                if !any_word_in_current {
                    return Err(if commands.is_empty() {
                        ParseError::MissingLeadingWord
                    } else {
                        ParseError::EmptyCommand
                    });
                }
                background = true;
            }
        }
    }

    if any_word_in_current {
        commands.push(current);
    } else if !current.is_empty() {
        return Err(ParseError::EmptyCommand);
    } else if commands.is_empty() {
        return Err(ParseError::MissingLeadingWord);
    }

    Ok(Pipeline {
        commands,
        background,
    })
}

fn expect_word<I: Iterator<Item = Token>>(
    tokens: &mut std::iter::Peekable<I>,
    operator: &'static str,
) -> Result<String, ParseError> {
    match tokens.next() {
        Some(Token {
            kind: TokenKind::Word,
            text,
        }) => Ok(text),
        _ => Err(ParseError::MissingRedirectTarget(operator)),
    }
}
