//! Recursive descent parser
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons, `+ -`,
//! `* / // %`, unary `- +`, `**`, then postfix `.attr`, calls and
//! indexing.

use crate::ast::{BinOp, BoolOp, CmpOp, Expr, Program, Stmt, StmtKind, Target, UnaryOp};
use crate::error::{CompileError, CompileErrorKind};
use crate::lexer::{tokenize, Keyword, Token, TokenKind};

/// Deepest expression nesting the parser accepts.
pub const MAX_NESTING: usize = 100;

/// Compiles source text into a program
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let stmts = parser.program()?;
    Ok(Program::new(stmts, source))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.token().kind
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn token(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CompileError {
        let token = self.token();
        CompileError::syntax(message, token.line, token.column)
    }

    fn unexpected(&self) -> CompileError {
        match self.peek() {
            TokenKind::Eof => self.error_here("unexpected EOF while parsing"),
            _ => self.error_here("invalid syntax"),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), CompileError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Enters one level of the expression tree
    fn descend(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let token = self.token();
            return Err(CompileError::new(
                CompileErrorKind::Memory,
                "expression nesting too deep",
                token.line,
                token.column,
            ));
        }
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        self.descend()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn program(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                    continue;
                }
                _ => {}
            }

            stmts.push(self.statement()?);

            match self.peek() {
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Eof => {}
                _ => return Err(self.unexpected()),
            }
        }
        Ok(stmts)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        let line = self.token().line;
        let kind = match self.peek().clone() {
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.advance();
                let mut targets = vec![self.target()?];
                while self.eat(&TokenKind::Comma) {
                    targets.push(self.target()?);
                }
                StmtKind::Del(targets)
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Raise(None)
                } else {
                    StmtKind::Raise(Some(self.expr()?))
                }
            }
            TokenKind::Keyword(Keyword::Reserved(word)) => {
                return Err(self.error_here(format!("'{}' is not supported", word)));
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    fn expression_statement(&mut self) -> Result<StmtKind, CompileError> {
        let start = self.pos;
        let expr = self.expr()?;

        let aug = match self.peek() {
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            _ => None,
        };

        if let Some(op) = aug {
            let target = self.to_target(expr, start)?;
            self.advance();
            let value = self.expr()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        if self.peek() != &TokenKind::Assign {
            return Ok(StmtKind::Expr(expr));
        }

        let mut targets = vec![self.to_target(expr, start)?];
        loop {
            self.advance();
            let start = self.pos;
            let value = self.expr()?;
            if self.peek() == &TokenKind::Assign {
                targets.push(self.to_target(value, start)?);
            } else {
                return Ok(StmtKind::Assign { targets, value });
            }
        }
    }

    fn target(&mut self) -> Result<Target, CompileError> {
        let start = self.pos;
        let expr = self.expr()?;
        self.to_target(expr, start)
    }

    fn to_target(&self, expr: Expr, start: usize) -> Result<Target, CompileError> {
        let message = match expr {
            Expr::Name(name) => return Ok(Target::Name(name)),
            Expr::Attribute { value, attr } => {
                return Ok(Target::Attribute {
                    value: *value,
                    attr,
                })
            }
            Expr::Index { value, index } => {
                return Ok(Target::Index {
                    value: *value,
                    index: *index,
                })
            }
            Expr::Call { .. } => "cannot assign to function call",
            Expr::None | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => {
                "cannot assign to literal"
            }
            _ => "cannot assign to expression",
        };
        let token = &self.tokens[start.min(self.tokens.len().saturating_sub(1))];
        Err(CompileError::syntax(message, token.line, token.column))
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::or_expr)
    }

    fn or_expr(&mut self) -> Result<Expr, CompileError> {
        let mark = self.depth;
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Keyword(Keyword::Or)) {
            self.descend()?;
            let right = self.and_expr()?;
            left = Expr::Logical {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = mark;
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, CompileError> {
        let mark = self.depth;
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::Keyword(Keyword::And)) {
            self.descend()?;
            let right = self.not_expr()?;
            left = Expr::Logical {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = mark;
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, CompileError> {
        if self.eat(&TokenKind::Keyword(Keyword::Not)) {
            let operand = self.nested(Self::not_expr)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        let left = self.sum()?;
        let mut links = Vec::new();

        loop {
            let op = match self.peek() {
                TokenKind::Eq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::NotEq,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::Keyword(Keyword::In) => CmpOp::In,
                TokenKind::Keyword(Keyword::Not)
                    if self.peek_next() == Some(&TokenKind::Keyword(Keyword::In)) =>
                {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            links.push((op, self.sum()?));
        }

        if links.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                links,
            })
        }
    }

    fn sum(&mut self) -> Result<Expr, CompileError> {
        let mark = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.term()?;
            left = binary(op, left, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        let mark = self.depth;
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.factor()?;
            left = binary(op, left, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.nested(Self::factor)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> Result<Expr, CompileError> {
        let base = self.postfix()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.nested(Self::factor)?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mark = self.depth;
        let mut expr = self.atom()?;
        loop {
            if matches!(
                self.peek(),
                TokenKind::Dot | TokenKind::LParen | TokenKind::LBracket
            ) {
                self.descend()?;
            }
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let TokenKind::Name(attr) = self.advance() else {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    };
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let (args, kwargs) = self.arguments()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Index {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        self.depth = mark;
        Ok(expr)
    }

    /// Parses call arguments after the opening parenthesis
    fn arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), CompileError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while self.peek() != &TokenKind::RParen {
            let keyword = match (self.peek(), self.peek_next()) {
                (TokenKind::Name(name), Some(TokenKind::Assign)) => Some(name.clone()),
                _ => None,
            };

            if let Some(name) = keyword {
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(self.error_here(format!("keyword argument repeated: {}", name)));
                }
                self.advance();
                self.advance();
                kwargs.push((name, self.expr()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                args.push(self.expr()?);
            }

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RParen)?;
        Ok((args, kwargs))
    }

    fn atom(&mut self) -> Result<Expr, CompileError> {
        let expr = match self.peek().clone() {
            TokenKind::Name(name) => {
                self.advance();
                Expr::Name(name)
            }
            TokenKind::Int(value) => {
                self.advance();
                Expr::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                Expr::Float(value)
            }
            TokenKind::Str(first) => {
                self.advance();
                let mut text = first;
                while let TokenKind::Str(next) = self.peek() {
                    text.push_str(next);
                    self.advance();
                }
                Expr::Str(text)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Expr::Bool(true)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Expr::Bool(false)
            }
            TokenKind::Keyword(Keyword::None) => {
                self.advance();
                Expr::None
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                if self.peek() == &TokenKind::Comma {
                    return Err(self.error_here("tuples are not supported"));
                }
                self.expect(&TokenKind::RParen)?;
                inner
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.peek() != &TokenKind::RBracket {
                    items.push(self.expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Expr::List(items)
            }
            _ => return Err(self.unexpected()),
        };
        Ok(expr)
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_expr(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match &program.stmts[0].kind {
            StmtKind::Expr(expr) => expr.clone(),
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = single_expr("1 + 2 * 3");
        assert_eq!(
            expr,
            binary(
                BinOp::Add,
                Expr::Int(1),
                binary(BinOp::Mul, Expr::Int(2), Expr::Int(3))
            )
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = single_expr("-2 ** 2");
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(binary(BinOp::Pow, Expr::Int(2), Expr::Int(2))),
            }
        );
    }

    #[test]
    fn test_statements_split_on_newline_and_semicolon() {
        let program = parse("x = 1; y = 2\nz = 3;").unwrap();
        assert_eq!(program.stmts.len(), 3);
        assert_eq!(program.stmts[2].line, 2);
    }

    #[test]
    fn test_chained_assignment() {
        let program = parse("a = b = 1").unwrap();
        match &program.stmts[0].kind {
            StmtKind::Assign { targets, value } => {
                assert_eq!(targets.len(), 2);
                assert_eq!(value, &Expr::Int(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = single_expr("print(1, 2, sep='-')");
        match expr {
            Expr::Call { args, kwargs, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(kwargs[0].0, "sep");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_not_in_comparison() {
        let expr = single_expr("1 not in [2, 3]");
        match expr {
            Expr::Compare { links, .. } => assert_eq!(links[0].0, CmpOp::NotIn),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assign_to_literal_is_rejected() {
        let err = parse("1 = x").unwrap_err();
        assert_eq!(err.message, "cannot assign to literal");
    }

    #[test]
    fn test_positional_after_keyword() {
        let err = parse("f(a=1, 2)").unwrap_err();
        assert_eq!(err.message, "positional argument follows keyword argument");
    }

    #[test]
    fn test_incomplete_expression() {
        let err = parse("1 +").unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Syntax);
    }

    #[test]
    fn test_reserved_keyword() {
        let err = parse("def f(): pass").unwrap_err();
        assert_eq!(err.message, "'def' is not supported");
    }

    #[test]
    fn test_deep_unary_chain_is_memory_error() {
        let source = format!("{}1", "-".repeat(MAX_NESTING + 10));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Memory);
    }

    #[test]
    fn test_long_operator_chains_are_memory_errors() {
        for op in ["+", "*", " or ", " and "] {
            let source = format!("1{}", format!("{}1", op).repeat(20_000));
            let err = parse(&source).unwrap_err();
            assert_eq!(err.kind, CompileErrorKind::Memory, "operator {:?}", op);
        }
        let calls = format!("f{}", "()".repeat(MAX_NESTING + 1));
        assert_eq!(parse(&calls).unwrap_err().kind, CompileErrorKind::Memory);
        let attrs = format!("x{}", ".y".repeat(MAX_NESTING + 1));
        assert_eq!(parse(&attrs).unwrap_err().kind, CompileErrorKind::Memory);
    }

    #[test]
    fn test_chain_depth_counts_with_brackets() {
        let inner = format!("(1{})", "+1".repeat(60));
        let source = format!("1{}", format!("+{}", inner).repeat(60));
        assert_eq!(parse(&source).unwrap_err().kind, CompileErrorKind::Memory);
    }

    #[test]
    fn test_moderate_chains_parse() {
        let source = format!("1{}", "+1".repeat(50));
        assert!(parse(&source).is_ok());
        assert!(parse(&format!("{}\n{}", source, source)).is_ok());
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert_eq!(single_expr("'a' 'b'"), Expr::Str("ab".to_string()));
    }

    #[test]
    fn test_ends_with_expression() {
        assert!(parse("x = 1\nx").unwrap().ends_with_expression());
        assert!(!parse("x = 1").unwrap().ends_with_expression());
    }
}
