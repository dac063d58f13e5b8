use thiserror::Error;

/// Lexer failures. The only one specified: an unterminated quote.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Parser failures, matching the taxonomy of spec §4.2/§7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: empty command")]
    EmptyCommand,
    #[error("syntax error: expected word after '{0}'")]
    MissingRedirectTarget(&'static str),
    #[error("syntax error: unexpected '&'")]
    MisplacedBackground,
    #[error("syntax error: unexpected token at start of input")]
    MissingLeadingWord,
}
