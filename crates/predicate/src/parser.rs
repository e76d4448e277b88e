use crate::ast::{BinaryOp, Expr, Func, Literal, PathKey, UnaryOp};
use crate::functions::IGNORECASE;
use crate::lexer::{tokenize, LexError, SpannedToken, Token};

/// Parser error types.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("unexpected token: {found}, expected: {expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("{name}() expects {expected} argument(s), got {found}")]
    WrongArity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    #[error("invalid subscript: {0}")]
    InvalidSubscript(String),
}

/// Parse a predicate string into an expression tree.
///
/// The surface syntax: `props['key']` subscripts, `props.get(...)`,
/// `&`/`|` for logic, `not`, `in`, `**`, `//`, and the registered
/// function names. One parsed tree serves both backends.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(ParseError::UnexpectedToken {
            found: format!("{other:?}"),
            expected: "end of input".to_string(),
        }),
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let token = self
            .tokens
            .get(self.pos)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof);
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        let found = self.advance().clone();
        if &found == expected {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                found: format!("{found:?}"),
                expected: format!("{expected:?}"),
            })
        }
    }

    // Precedence, loosest first: `not`, comparisons and `in`, `|`, `&`,
    // additive, multiplicative, unary minus, `**`, postfix, primary.

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_not()
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == &Token::Not {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::unary(UnaryOp::Not, operand));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_or()?;

        let op = match self.peek() {
            Token::EqEq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Gt => BinaryOp::Gt,
            Token::Le => BinaryOp::Le,
            Token::Ge => BinaryOp::Ge,
            Token::In => BinaryOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_or()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.peek() == &Token::Pipe {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.peek() == &Token::Amp {
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::SlashSlash => BinaryOp::FloorDiv,
                Token::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek() == &Token::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::unary(UnaryOp::Neg, operand));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.peek() == &Token::StarStar {
            self.advance();
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.advance();
                    let key = self.parse_path_key()?;
                    self.expect(&Token::RBracket)?;
                    expr = match expr {
                        Expr::Prop(mut path) => {
                            path.push(key);
                            Expr::Prop(path)
                        }
                        _ => {
                            return Err(ParseError::InvalidSubscript(
                                "subscripting is only supported on props".to_string(),
                            ))
                        }
                    };
                }
                Token::Dot => {
                    self.advance();
                    let name = match self.advance().clone() {
                        Token::Ident(name) => name,
                        other => {
                            return Err(ParseError::UnexpectedToken {
                                found: format!("{other:?}"),
                                expected: "method name".to_string(),
                            })
                        }
                    };
                    if name != "get" {
                        return Err(ParseError::UnknownFunction(name));
                    }
                    let Expr::Prop(path) = expr else {
                        return Err(ParseError::InvalidSubscript(
                            ".get() is only supported on props".to_string(),
                        ));
                    };
                    expr = self.parse_get_call(path)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_get_call(&mut self, mut path: Vec<PathKey>) -> Result<Expr, ParseError> {
        self.expect(&Token::LParen)?;
        path.push(self.parse_path_key()?);
        let default = if self.peek() == &Token::Comma {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect(&Token::RParen)?;
        Ok(Expr::PropGet { path, default })
    }

    fn parse_path_key(&mut self) -> Result<PathKey, ParseError> {
        match self.advance().clone() {
            Token::Str(key) => Ok(PathKey::Key(key)),
            Token::Int(i) if i >= 0 => Ok(PathKey::Index(i as usize)),
            other => Err(ParseError::InvalidSubscript(format!(
                "expected a string key or non-negative index, got {other:?}"
            ))),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance().clone() {
            Token::Ident(name) => match name.as_str() {
                "props" => Ok(Expr::Prop(vec![])),
                "re" => self.parse_regex_flag(),
                _ if self.peek() == &Token::LParen => self.parse_call(&name),
                _ => Err(ParseError::UnknownIdentifier(name.clone())),
            },
            Token::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            Token::Int(i) => Ok(Expr::Literal(Literal::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Literal::Float(f))),
            Token::Bool(b) => Ok(Expr::Literal(Literal::Bool(b))),
            Token::NoneLit => Ok(Expr::Literal(Literal::Null)),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Token::RBracket {
                    items.push(self.parse_expr()?);
                    while self.peek() == &Token::Comma {
                        self.advance();
                        items.push(self.parse_expr()?);
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(Expr::Array(items))
            }
            Token::Eof => Err(ParseError::UnexpectedEof),
            other => Err(ParseError::UnexpectedToken {
                found: format!("{other:?}"),
                expected: "expression".to_string(),
            }),
        }
    }

    /// `re.IGNORECASE` (or `re.I`), the case-insensitivity flag constant.
    fn parse_regex_flag(&mut self) -> Result<Expr, ParseError> {
        self.expect(&Token::Dot)?;
        match self.advance().clone() {
            Token::Ident(attr) if attr == "IGNORECASE" || attr == "I" => {
                Ok(Expr::Literal(Literal::Int(IGNORECASE)))
            }
            other => Err(ParseError::UnexpectedToken {
                found: format!("{other:?}"),
                expected: "IGNORECASE".to_string(),
            }),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, ParseError> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            args.push(self.parse_expr()?);
            while self.peek() == &Token::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.expect(&Token::RParen)?;
        let found = args.len();

        match name {
            "regexp" => {
                check_arity(name, found == 2 || found == 3, "2 or 3", found)?;
                Ok(Expr::call(Func::Regexp, args))
            }
            "has_key" => {
                check_arity(name, found == 2, "2", found)?;
                Ok(Expr::call(Func::HasKey, args))
            }
            "is_none" => {
                check_arity(name, found == 1, "1", found)?;
                Ok(Expr::call(Func::IsNone, args))
            }
            "is_not_none" => {
                check_arity(name, found == 1, "1", found)?;
                Ok(Expr::call(Func::IsNotNone, args))
            }
            "sum" => {
                check_arity(name, found == 1, "1", found)?;
                Ok(Expr::call(Func::ListSum, args))
            }
            "json_contains" => {
                check_arity(name, found == 2, "2", found)?;
                Ok(Expr::call(Func::Contains, args))
            }
            "abs" => {
                check_arity(name, found == 1, "1", found)?;
                let operand = args.into_iter().next().ok_or(ParseError::UnexpectedEof)?;
                Ok(Expr::unary(UnaryOp::Abs, operand))
            }
            _ => Err(ParseError::UnknownFunction(name.to_string())),
        }
    }
}

fn check_arity(
    name: &str,
    ok: bool,
    expected: &'static str,
    found: usize,
) -> Result<(), ParseError> {
    if ok {
        Ok(())
    } else {
        Err(ParseError::WrongArity {
            name: name.to_string(),
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_comparison() {
        let expr = parse("props['int'] == 2").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Eq, lhs, rhs } => {
                assert_eq!(*lhs, Expr::Prop(vec![PathKey::Key("int".into())]));
                assert_eq!(*rhs, Expr::Literal(Literal::Int(2)));
            }
            other => panic!("expected Eq, got {other:?}"),
        }
    }

    #[test]
    fn parse_nested_subscripts() {
        let expr = parse("props['nesting']['fib'][4]").unwrap();
        assert_eq!(
            expr,
            Expr::Prop(vec![
                PathKey::Key("nesting".into()),
                PathKey::Key("fib".into()),
                PathKey::Index(4),
            ])
        );
    }

    #[test]
    fn parse_logical_combination() {
        let expr = parse("(props['int'] == 2) | (props['int'] == 3)").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Eq, .. }));
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Eq, .. }));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn ampersand_binds_tighter_than_comparisons() {
        // `a == 2 & b` groups as `a == (2 & b)`, as in the original
        // surface language; predicates parenthesize comparisons instead.
        let expr = parse("props['int'] == 2 & props['bool']").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Eq, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("expected Eq at the top, got {other:?}"),
        }
    }

    #[test]
    fn parse_power_is_right_associative() {
        let expr = parse("2 ** 3 ** 2").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Pow, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("expected Pow, got {other:?}"),
        }
    }

    #[test]
    fn parse_unary_forms() {
        assert_eq!(
            parse("-1").unwrap(),
            Expr::unary(UnaryOp::Neg, Expr::Literal(Literal::Int(1)))
        );
        assert!(matches!(
            parse("not props['bool']").unwrap(),
            Expr::Unary { op: UnaryOp::Not, .. }
        ));
        assert!(matches!(
            parse("2 ** -1").unwrap(),
            Expr::Binary { op: BinaryOp::Pow, .. }
        ));
    }

    #[test]
    fn parse_membership() {
        let expr = parse("1 in props['list']").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::In, .. }));

        let expr = parse("2 in [1, 2, 3]").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::In, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Array(ref items) if items.len() == 3));
            }
            other => panic!("expected In, got {other:?}"),
        }
    }

    #[test]
    fn parse_get_with_and_without_default() {
        assert_eq!(
            parse("props.get('foo')").unwrap(),
            Expr::PropGet {
                path: vec![PathKey::Key("foo".into())],
                default: None,
            }
        );
        assert_eq!(
            parse("props.get('foo', 42)").unwrap(),
            Expr::PropGet {
                path: vec![PathKey::Key("foo".into())],
                default: Some(Box::new(Expr::Literal(Literal::Int(42)))),
            }
        );
        assert_eq!(
            parse("props['nesting'].get('fib')").unwrap(),
            Expr::PropGet {
                path: vec![PathKey::Key("nesting".into()), PathKey::Key("fib".into())],
                default: None,
            }
        );
    }

    #[test]
    fn parse_function_calls() {
        let expr = parse("regexp('hello', props['string'], re.IGNORECASE)").unwrap();
        match expr {
            Expr::Call { func: Func::Regexp, args } => {
                assert_eq!(args.len(), 3);
                assert_eq!(args[2], Expr::Literal(Literal::Int(IGNORECASE)));
            }
            other => panic!("expected regexp call, got {other:?}"),
        }

        assert!(matches!(
            parse("abs(props['neg'])").unwrap(),
            Expr::Unary { op: UnaryOp::Abs, .. }
        ));
        assert!(matches!(
            parse("sum(props['list'])").unwrap(),
            Expr::Call { func: Func::ListSum, .. }
        ));
        assert!(matches!(
            parse("has_key(props, 'foo')").unwrap(),
            Expr::Call { func: Func::HasKey, .. }
        ));
    }

    #[test]
    fn parse_literals() {
        assert_eq!(parse("None").unwrap(), Expr::Literal(Literal::Null));
        assert_eq!(parse("True").unwrap(), Expr::Literal(Literal::Bool(true)));
        assert_eq!(parse("3.125").unwrap(), Expr::Literal(Literal::Float(3.125)));
    }

    #[test]
    fn reject_trailing_tokens() {
        assert!(matches!(
            parse("1 < 2 < 3"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn reject_unknown_names() {
        assert!(matches!(
            parse("frobnicate(1)"),
            Err(ParseError::UnknownFunction(_))
        ));
        assert!(matches!(
            parse("banana"),
            Err(ParseError::UnknownIdentifier(_))
        ));
    }

    #[test]
    fn reject_wrong_arity() {
        assert!(matches!(
            parse("is_none()"),
            Err(ParseError::WrongArity { .. })
        ));
        assert!(matches!(
            parse("regexp('a')"),
            Err(ParseError::WrongArity { .. })
        ));
    }

    #[test]
    fn reject_subscript_on_non_props() {
        assert!(matches!(
            parse("abs(1)[0]"),
            Err(ParseError::InvalidSubscript(_))
        ));
    }
}
