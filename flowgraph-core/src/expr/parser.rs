//! Tokenizer and precedence-climbing parser for operator scripts.

use super::ast::{BinaryOp, Expr, Stmt, UnaryOp, UNARY_PRECEDENCE};
use super::ExprError;

/// Limit on expression tree height, whether it comes from parentheses,
/// calls, prefix operators or a long chain of binary operators.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Assign,
    LParen,
    RParen,
    Comma,
    Separator,
    Eof,
}

impl TokenKind {
    fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number `{n}`"),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Separator => "end of statement".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::EqEq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Assign => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            _ => "",
        }
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        Some(match self {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::Caret => BinaryOp::Pow,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn parse_error(position: usize, message: impl Into<String>) -> ExprError {
    ExprError::Parse {
        position,
        message: message.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        let kind = match c {
            b' ' | b'\t' | b'\r' => {
                i += 1;
                continue;
            }
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'\n' | b';' => {
                i += 1;
                TokenKind::Separator
            }
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &source[start..i];
                let value: f64 = text
                    .parse()
                    .map_err(|_| parse_error(start, format!("invalid number `{text}`")))?;
                if !value.is_finite() {
                    return Err(parse_error(start, format!("number `{text}` is out of range")));
                }
                TokenKind::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                TokenKind::Ident(source[start..i].to_string())
            }
            _ => {
                let next = bytes.get(i + 1).copied();
                let (kind, width) = match (c, next) {
                    (b'<', Some(b'=')) => (TokenKind::Le, 2),
                    (b'>', Some(b'=')) => (TokenKind::Ge, 2),
                    (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
                    (b'!', Some(b'=')) => (TokenKind::Ne, 2),
                    (b'<', _) => (TokenKind::Lt, 1),
                    (b'>', _) => (TokenKind::Gt, 1),
                    (b'=', _) => (TokenKind::Assign, 1),
                    (b'+', _) => (TokenKind::Plus, 1),
                    (b'-', _) => (TokenKind::Minus, 1),
                    (b'*', _) => (TokenKind::Star, 1),
                    (b'/', _) => (TokenKind::Slash, 1),
                    (b'%', _) => (TokenKind::Percent, 1),
                    (b'^', _) => (TokenKind::Caret, 1),
                    (b'(', _) => (TokenKind::LParen, 1),
                    (b')', _) => (TokenKind::RParen, 1),
                    (b',', _) => (TokenKind::Comma, 1),
                    _ => {
                        let ch = source[start..].chars().next().unwrap_or('?');
                        return Err(parse_error(start, format!("unexpected character `{ch}`")));
                    }
                };
                i += width;
                kind
            }
        };

        tokens.push(Token {
            kind,
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: source.len(),
    });
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with `Eof`, and `advance` never moves
        // past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_second(&self) -> &TokenKind {
        let index = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ExprError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(parse_error(
                token.position,
                format!("expected {}, found {}", kind.describe(), token.kind.describe()),
            ))
        }
    }

    fn skip_separators(&mut self) {
        while self.peek().kind == TokenKind::Separator {
            self.advance();
        }
    }

    fn script(&mut self) -> Result<Vec<Stmt>, ExprError> {
        let mut statements = Vec::new();

        loop {
            self.skip_separators();
            if self.peek().kind == TokenKind::Eof {
                break;
            }
            statements.push(self.statement()?);

            let token = self.peek();
            match token.kind {
                TokenKind::Separator | TokenKind::Eof => {}
                ref other => {
                    return Err(parse_error(
                        token.position,
                        format!("expected end of statement, found {}", other.describe()),
                    ));
                }
            }
        }

        match statements.last() {
            Some(Stmt::Expr(_)) => Ok(statements),
            _ => Err(parse_error(
                self.peek().position,
                "script must end with an expression",
            )),
        }
    }

    fn statement(&mut self) -> Result<Stmt, ExprError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            if *self.peek_second() == TokenKind::Assign {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.expression()?;
                return Ok(Stmt::Assign { name, value });
            }
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        Ok(self.climb(0)?.0)
    }

    /// Parse operators binding at least as tight as `min_precedence`.
    /// Returns the expression with the height of its tree.
    fn climb(&mut self, min_precedence: u8) -> Result<(Expr, usize), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }

        let (mut lhs, mut height) = self.prefix()?;
        while let Some(op) = self.peek().kind.binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let (rhs, rhs_height) = self.climb(next_min)?;
            // A flat chain like `1 + 1 + ...` nests to the left without
            // recursing here.
            height = self.grow(height.max(rhs_height))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        self.depth -= 1;
        Ok((lhs, height))
    }

    fn prefix(&mut self) -> Result<(Expr, usize), ExprError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok((Expr::Number(value), 1)),
            TokenKind::Minus => self.unary(UnaryOp::Neg),
            TokenKind::Plus => self.unary(UnaryOp::Plus),
            TokenKind::LParen => {
                let inner = self.climb(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.peek().kind != TokenKind::LParen {
                    return Ok((Expr::Variable(name), 1));
                }
                self.advance();
                let mut args = Vec::new();
                let mut height = 0;
                if self.peek().kind != TokenKind::RParen {
                    loop {
                        let (arg, arg_height) = self.climb(0)?;
                        args.push(arg);
                        height = height.max(arg_height);
                        if self.peek().kind == TokenKind::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen)?;
                let call = Expr::Call {
                    function: name,
                    args,
                };
                Ok((call, self.grow(height)?))
            }
            other => Err(parse_error(
                token.position,
                format!("expected an expression, found {}", other.describe()),
            )),
        }
    }

    fn unary(&mut self, op: UnaryOp) -> Result<(Expr, usize), ExprError> {
        let (operand, height) = self.climb(UNARY_PRECEDENCE)?;
        let unary = Expr::Unary {
            op,
            operand: Box::new(operand),
        };
        Ok((unary, self.grow(height)?))
    }

    /// Height of a node above children of `height`.
    fn grow(&self, height: usize) -> Result<usize, ExprError> {
        match height + 1 {
            h if h > MAX_DEPTH => Err(self.too_deep()),
            h => Ok(h),
        }
    }

    fn too_deep(&self) -> ExprError {
        parse_error(self.peek().position, "expression nested too deeply")
    }
}

/// Parse a script into statements.
pub(crate) fn parse_script(source: &str) -> Result<Vec<Stmt>, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.script()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> Expr {
        let mut statements = parse_script(source).unwrap();
        assert_eq!(statements.len(), 1);
        match statements.pop().unwrap() {
            Stmt::Expr(expr) => expr,
            other => panic!("expected expression, got {other:?}"),
        }
    }

    #[test]
    fn parses_with_precedence() {
        assert_eq!(single("a + b * c").to_string(), "a + b * c");
        assert_eq!(single("(a + b) * c").to_string(), "(a + b) * c");
        assert_eq!(single("a - b - c").to_string(), "a - b - c");
        assert_eq!(single("2 ^ 3 ^ 2").to_string(), "2 ^ 3 ^ 2");
        assert_eq!(single("-x ^ 2").to_string(), "-x ^ 2");
        assert_eq!(single("a < b + 1").to_string(), "a < b + 1");
    }

    #[test]
    fn power_is_right_associative() {
        match single("2 ^ 3 ^ 2") {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(op, BinaryOp::Pow);
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn parses_calls_and_numbers() {
        assert_eq!(
            single("max(a, 2.5, 1e3)"),
            Expr::Call {
                function: "max".to_string(),
                args: vec![
                    Expr::Variable("a".to_string()),
                    Expr::Number(2.5),
                    Expr::Number(1000.0),
                ],
            }
        );
        assert_eq!(single("f()").to_string(), "f()");
    }

    #[test]
    fn parses_assignments_and_separators() {
        let statements = parse_script("x = a + 1; y = x * 2\n# comment\ny - 1").unwrap();
        assert_eq!(statements.len(), 3);
        assert!(matches!(&statements[0], Stmt::Assign { name, .. } if name == "x"));
        assert!(matches!(&statements[2], Stmt::Expr(_)));
    }

    #[test]
    fn rejects_trailing_assignment() {
        let err = parse_script("x = 1").unwrap_err();
        assert!(matches!(err, ExprError::Parse { .. }));
    }

    #[test]
    fn rejects_empty_script() {
        assert!(parse_script("  \n ; ").is_err());
    }

    #[test]
    fn reports_position_of_unexpected_token() {
        match parse_script("a + * b").unwrap_err() {
            ExprError::Parse { position, message } => {
                assert_eq!(position, 4);
                assert!(message.contains("`*`"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_characters_and_unbalanced_parens() {
        assert!(parse_script("a $ b").is_err());
        assert!(parse_script("(a + b").is_err());
        assert!(parse_script("a + b)").is_err());
    }

    #[test]
    fn rejects_out_of_range_literals() {
        assert!(parse_script("1e999").is_err());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let source = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse_script(&source).is_err());
    }

    #[test]
    fn rejects_long_operator_chains() {
        let source = vec!["1"; 30_000].join("+");
        assert!(matches!(parse_script(&source), Err(ExprError::Parse { .. })));

        let mixed = vec!["x"; 30_000].join(" * 2 - ");
        assert!(matches!(parse_script(&mixed), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn accepts_chains_within_the_limit() {
        let source = vec!["1"; MAX_DEPTH].join("+");
        assert_eq!(parse_script(&source).unwrap().len(), 1);

        let nested = format!("({}) + 1", vec!["1"; MAX_DEPTH].join("+"));
        assert!(parse_script(&nested).is_err());
    }
}
