use crate::error::LexError;

/// The kind of a lexed token. Quoting is resolved at lex time; a `Word`
/// token's text never carries surrounding quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,
    RedirIn,
    RedirOut,
    RedirAppend,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn word(text: String) -> Self {
        Token {
            kind: TokenKind::Word,
            text,
        }
    }

    fn operator(kind: TokenKind, text: &str) -> Self {
        Token {
            kind,
            text: text.to_string(),
        }
    }
}

/// Tokenizer state machine states.
enum State {
    /// Between tokens — whitespace is skipped.
    Normal,
    /// Building an unquoted word — whitespace and operators end it.
    InWord,
    /// Inside `"..."` — whitespace and operators are preserved literally.
    InDoubleQuote,
    /// Inside `'...'` — everything is literal, no exceptions.
    InSingleQuote,
}

/// Split a raw input line into an ordered sequence of [`Token`]s.
///
/// Whitespace separates words outside quotes. `|`, `<`, `>`, `&` terminate
/// the current word and become their own token; `>>` is recognized as a
/// single token when two `>` characters are adjacent outside quotes. A
/// leading `~` (followed by nothing or `/`) is expanded against `$HOME`
/// once the token is fully lexed, provided the `~` itself lay outside
/// quotes.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Tracks whether the token currently being built started with an
    // unquoted `~`, so tilde expansion only fires when it's legitimate.
    let mut current_tilde_eligible = false;
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    macro_rules! flush_word {
        () => {
            if !current.is_empty() {
                let text = if current_tilde_eligible {
                    expand_tilde(&current)
                } else {
                    std::mem::take(&mut current)
                };
                tokens.push(Token::word(text));
                current.clear();
                current_tilde_eligible = false;
            }
        };
    }

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Normal, ' ' | '\t' | '\n' | '\r') => {}
            (State::Normal, '"') => {
                state = State::InDoubleQuote;
            }
            (State::Normal, '\'') => {
                state = State::InSingleQuote;
            }
            (State::Normal, '|') => {
                tokens.push(Token::operator(TokenKind::Pipe, "|"));
            }
            (State::Normal, '<') => {
                tokens.push(Token::operator(TokenKind::RedirIn, "<"));
            }
            (State::Normal, '>') => {
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::operator(TokenKind::RedirAppend, ">>"));
                } else {
                    tokens.push(Token::operator(TokenKind::RedirOut, ">"));
                }
            }
            (State::Normal, '&') => {
                tokens.push(Token::operator(TokenKind::Background, "&"));
            }
            (State::Normal, c) => {
                if c == '~' {
                    current_tilde_eligible = true;
                }
                current.push(c);
                state = State::InWord;
            }

            (State::InWord, ' ' | '\t' | '\n' | '\r') => {
                flush_word!();
                state = State::Normal;
            }
            (State::InWord, '"') => {
                state = State::InDoubleQuote;
            }
            (State::InWord, '\'') => {
                state = State::InSingleQuote;
            }
            (State::InWord, '|') => {
                flush_word!();
                tokens.push(Token::operator(TokenKind::Pipe, "|"));
                state = State::Normal;
            }
            (State::InWord, '<') => {
                flush_word!();
                tokens.push(Token::operator(TokenKind::RedirIn, "<"));
                state = State::Normal;
            }
            (State::InWord, '>') => {
                flush_word!();
                if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::operator(TokenKind::RedirAppend, ">>"));
                } else {
                    tokens.push(Token::operator(TokenKind::RedirOut, ">"));
                }
                state = State::Normal;
            }
            (State::InWord, '&') => {
                flush_word!();
                tokens.push(Token::operator(TokenKind::Background, "&"));
                state = State::Normal;
            }
            (State::InWord, c) => {
                current.push(c);
            }

            (State::InDoubleQuote, '"') => {
                state = State::InWord;
            }
            (State::InDoubleQuote, c) => {
                current.push(c);
            }

            (State::InSingleQuote, '\'') => {
                state = State::InWord;
            }
            (State::InSingleQuote, c) => {
                current.push(c);
            }
        }
    }

    match state {
        State::InDoubleQuote | State::InSingleQuote => return Err(LexError::UnterminatedQuote),
        _ => {}
    }

    flush_word!();

    Ok(tokens)
}

/// Replace a leading unquoted `~` with `$HOME`, but only when `~` is the
/// whole token or is immediately followed by `/`.
fn expand_tilde(token: &str) -> String {
    if token == "~" {
        return std::env::var("HOME").unwrap_or_else(|_| token.to_string());
    }
    if let Some(rest) = token.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{home}/{rest}");
        }
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test]
    fn simple_command() {
        let tokens = tokenize("echo hello world").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn quote_grouping_preserves_tokens() {
        // echo 'a b' "c d" -> two tokens after "echo"
        let tokens = tokenize("echo 'a b' \"c d\"").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "a b", "c d"]);
    }

    #[test]
    fn double_quotes_no_interpolation() {
        let tokens = tokenize("echo \"$HOME\"").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "$HOME"]);
    }

    #[test]
    fn pipe_and_redirect_tokens() {
        let tokens = tokenize("grep -i foo < in.txt | sort -u >> out.txt &").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        use TokenKind::*;
        assert_eq!(
            kinds,
            vec![
                Word, Word, Word, RedirIn, Word, Pipe, Word, Word, RedirAppend, Word, Background
            ]
        );
    }

    #[test]
    fn operator_terminates_word_without_space() {
        let tokens = tokenize("echo hi>out.txt").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "hi", "out.txt"]);
        assert_eq!(tokens[2].kind, TokenKind::RedirOut);
    }

    #[test]
    fn double_greater_is_single_token() {
        let tokens = tokenize("cmd>>file").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::RedirAppend);
        assert_eq!(tokens[1].text, ">>");
    }

    #[test]
    fn unterminated_single_quote_is_error() {
        assert!(matches!(
            tokenize("echo 'unterminated"),
            Err(LexError::UnterminatedQuote)
        ));
    }

    #[test]
    fn unterminated_double_quote_is_error() {
        assert!(matches!(
            tokenize("echo \"unterminated"),
            Err(LexError::UnterminatedQuote)
        ));
    }

    #[test]
    fn operators_inside_quotes_are_literal() {
        let tokens = tokenize("echo '|' '>'").unwrap();
        assert_eq!(words(&tokens), vec!["echo", "|", ">"]);
    }

    #[test]
    fn tilde_alone_expands() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        let tokens = tokenize("~").unwrap();
        assert_eq!(words(&tokens), vec!["/home/tester"]);
    }

    #[test]
    fn tilde_with_path_expands() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        let tokens = tokenize("~/projects").unwrap();
        assert_eq!(words(&tokens), vec!["/home/tester/projects"]);
    }

    #[test]
    fn tilde_mid_token_not_expanded() {
        let tokens = tokenize("foo~bar").unwrap();
        assert_eq!(words(&tokens), vec!["foo~bar"]);
    }

    #[test]
    fn quoted_tilde_not_expanded() {
        let tokens = tokenize("'~'").unwrap();
        assert_eq!(words(&tokens), vec!["~"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }
}
