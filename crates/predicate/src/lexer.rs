use serde::{Deserialize, Serialize};

/// Token types produced by the predicate lexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    /// A string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A boolean literal (`True`/`False`).
    Bool(bool),
    /// The `None` literal.
    NoneLit,

    /// An identifier.
    Ident(String),

    /// The `not` keyword.
    Not,
    /// The `in` keyword.
    In,

    Plus,       // +
    Minus,      // -
    Star,       // *
    StarStar,   // **
    Slash,      // /
    SlashSlash, // //
    Percent,    // %
    Lt,         // <
    Gt,         // >
    Le,         // <=
    Ge,         // >=
    EqEq,       // ==
    Ne,         // !=
    Amp,        // &
    Pipe,       // |
    Dot,        // .
    Comma,      // ,

    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]

    /// The end of the input.
    Eof,
}

/// Position in the predicate text for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer error.
#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),
}

/// Tokenize a predicate string into a sequence of tokens.
pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, LexError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];

        if ch.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        let token = match ch {
            '+' => {
                pos += 1;
                Token::Plus
            }
            '-' => {
                pos += 1;
                Token::Minus
            }
            '%' => {
                pos += 1;
                Token::Percent
            }
            '.' => {
                pos += 1;
                Token::Dot
            }
            ',' => {
                pos += 1;
                Token::Comma
            }
            '&' => {
                pos += 1;
                Token::Amp
            }
            '|' => {
                pos += 1;
                Token::Pipe
            }
            '(' => {
                pos += 1;
                Token::LParen
            }
            ')' => {
                pos += 1;
                Token::RParen
            }
            '[' => {
                pos += 1;
                Token::LBracket
            }
            ']' => {
                pos += 1;
                Token::RBracket
            }
            '*' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '*' {
                    pos += 2;
                    Token::StarStar
                } else {
                    pos += 1;
                    Token::Star
                }
            }
            '/' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '/' {
                    pos += 2;
                    Token::SlashSlash
                } else {
                    pos += 1;
                    Token::Slash
                }
            }
            '=' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                    pos += 2;
                    Token::EqEq
                } else {
                    return Err(LexError::UnexpectedChar(ch, pos));
                }
            }
            '!' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                    pos += 2;
                    Token::Ne
                } else {
                    return Err(LexError::UnexpectedChar(ch, pos));
                }
            }
            '<' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                    pos += 2;
                    Token::Le
                } else {
                    pos += 1;
                    Token::Lt
                }
            }
            '>' => {
                if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                    pos += 2;
                    Token::Ge
                } else {
                    pos += 1;
                    Token::Gt
                }
            }
            '"' | '\'' => {
                let quote = ch;
                pos += 1;
                let mut text = String::new();
                loop {
                    match chars.get(pos) {
                        None => return Err(LexError::UnterminatedString(start)),
                        Some(&c) if c == quote => {
                            pos += 1;
                            break;
                        }
                        Some('\\') => {
                            pos += 1;
                            match chars.get(pos) {
                                None => return Err(LexError::UnterminatedString(start)),
                                Some('n') => text.push('\n'),
                                Some('t') => text.push('\t'),
                                Some(&c) => text.push(c),
                            }
                            pos += 1;
                        }
                        Some(&c) => {
                            text.push(c);
                            pos += 1;
                        }
                    }
                }
                Token::Str(text)
            }
            c if c.is_ascii_digit() => {
                let mut is_float = false;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                // A decimal point only when followed by another digit, so
                // a trailing attribute access does not get swallowed.
                if pos + 1 < chars.len()
                    && chars[pos] == '.'
                    && chars[pos + 1].is_ascii_digit()
                {
                    is_float = true;
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text: String = chars[start..pos].iter().collect();
                if is_float {
                    Token::Float(text.parse().map_err(|_| {
                        LexError::UnexpectedChar(chars[start], start)
                    })?)
                } else {
                    Token::Int(text.parse().map_err(|_| {
                        LexError::UnexpectedChar(chars[start], start)
                    })?)
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while pos < chars.len()
                    && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_')
                {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                match word.as_str() {
                    "True" => Token::Bool(true),
                    "False" => Token::Bool(false),
                    "None" => Token::NoneLit,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => Token::Ident(word),
                }
            }
            _ => return Err(LexError::UnexpectedChar(ch, pos)),
        };

        tokens.push(SpannedToken {
            token,
            span: Span { start, end: pos },
        });
    }

    tokens.push(SpannedToken {
        token: Token::Eof,
        span: Span { start: pos, end: pos },
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn tokenize_simple_predicate() {
        let tokens = tok("props['int'] == 2");
        assert_eq!(tokens[0], Token::Ident("props".into()));
        assert_eq!(tokens[1], Token::LBracket);
        assert_eq!(tokens[2], Token::Str("int".into()));
        assert_eq!(tokens[3], Token::RBracket);
        assert_eq!(tokens[4], Token::EqEq);
        assert_eq!(tokens[5], Token::Int(2));
        assert_eq!(tokens[6], Token::Eof);
    }

    #[test]
    fn tokenize_compound_operators() {
        let tokens = tok("** // <= >= == != * /");
        assert_eq!(tokens[0], Token::StarStar);
        assert_eq!(tokens[1], Token::SlashSlash);
        assert_eq!(tokens[2], Token::Le);
        assert_eq!(tokens[3], Token::Ge);
        assert_eq!(tokens[4], Token::EqEq);
        assert_eq!(tokens[5], Token::Ne);
        assert_eq!(tokens[6], Token::Star);
        assert_eq!(tokens[7], Token::Slash);
    }

    #[test]
    fn tokenize_numbers() {
        let tokens = tok("42 3.125 7");
        assert_eq!(tokens[0], Token::Int(42));
        assert_eq!(tokens[1], Token::Float(3.125));
        assert_eq!(tokens[2], Token::Int(7));
    }

    #[test]
    fn integer_followed_by_attribute_access() {
        // `re.IGNORECASE` style access must not turn `re` into a float;
        // likewise a digit before a dot without digits after stays an int.
        let tokens = tok("re.IGNORECASE");
        assert_eq!(tokens[0], Token::Ident("re".into()));
        assert_eq!(tokens[1], Token::Dot);
        assert_eq!(tokens[2], Token::Ident("IGNORECASE".into()));
    }

    #[test]
    fn tokenize_keywords() {
        let tokens = tok("True False None not in");
        assert_eq!(tokens[0], Token::Bool(true));
        assert_eq!(tokens[1], Token::Bool(false));
        assert_eq!(tokens[2], Token::NoneLit);
        assert_eq!(tokens[3], Token::Not);
        assert_eq!(tokens[4], Token::In);
    }

    #[test]
    fn tokenize_strings_with_either_quote_and_escapes() {
        let tokens = tok(r#"'single' "double" 'it\'s'"#);
        assert_eq!(tokens[0], Token::Str("single".into()));
        assert_eq!(tokens[1], Token::Str("double".into()));
        assert_eq!(tokens[2], Token::Str("it's".into()));
    }

    #[test]
    fn unterminated_string_error() {
        assert!(tokenize("'hello").is_err());
    }

    #[test]
    fn unexpected_character_error() {
        assert!(matches!(
            tokenize("props @ 1"),
            Err(LexError::UnexpectedChar('@', _))
        ));
    }
}
