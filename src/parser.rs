// ABOUTME: Recursive-descent parser: token stream to AST, with precedence-climbing expressions

use std::sync::Arc;

use crate::ast::{AssignOp, BinOp, Block, Case, Expr, Stmt, TypeExpr, UnOp};
use crate::error::Error;
use crate::lexer::{lex, Token};

pub fn parse(src: &str) -> Result<Block, Error> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let block = parser.parse_stmts_until(None)?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected("statement"));
    }
    Ok(block)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, token: &Token, context: &str) -> Result<(), Error> {
        if self.eat(token) {
            return Ok(());
        }
        Err(Error::Parse(format!(
            "expected {:?} in {}, found {}",
            token,
            context,
            self.describe_next()
        )))
    }

    fn unexpected(&self, wanted: &str) -> Error {
        Error::Parse(format!("expected {}, found {}", wanted, self.describe_next()))
    }

    fn describe_next(&self) -> String {
        match self.peek() {
            Some(t) => format!("{:?}", t),
            None => "end of input".to_string(),
        }
    }

    fn skip_semis(&mut self) {
        while self.eat(&Token::Semi) {}
    }

    /// Parse statements until `stop` (or end of input when `None`)
    fn parse_stmts_until(&mut self, stop: Option<&Token>) -> Result<Block, Error> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            match (self.peek(), stop) {
                (None, None) => break,
                (Some(t), Some(s)) if t == s => break,
                (None, Some(_)) => return Err(self.unexpected("'}'")),
                _ => {}
            }
            stmts.push(self.parse_stmt()?);
            self.terminate_stmt()?;
        }
        Ok(Block { stmts })
    }

    /// Consume the statement terminator; `}` and end of input also qualify
    fn terminate_stmt(&mut self) -> Result<(), Error> {
        match self.peek() {
            Some(Token::Semi) => {
                self.pos += 1;
                Ok(())
            }
            Some(Token::RBrace) | None => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_block(&mut self) -> Result<Block, Error> {
        self.expect(&Token::LBrace, "block")?;
        let block = self.parse_stmts_until(Some(&Token::RBrace))?;
        self.expect(&Token::RBrace, "block")?;
        Ok(block)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek() {
            Some(Token::Var) => self.parse_var(),
            Some(Token::Return) => {
                self.pos += 1;
                match self.peek() {
                    Some(Token::Semi) | Some(Token::RBrace) | None => Ok(Stmt::Return(None)),
                    _ => Ok(Stmt::Return(Some(self.parse_expr()?))),
                }
            }
            Some(Token::Break) => {
                self.pos += 1;
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.pos += 1;
                Ok(Stmt::Continue)
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::If) => self.parse_if(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Switch) => self.parse_switch(),
            _ => self.parse_simple_stmt(),
        }
    }

    /// `var name [T] [= expr]`
    fn parse_var(&mut self) -> Result<Stmt, Error> {
        self.expect(&Token::Var, "declaration")?;
        let name = self.parse_ident_name()?;
        let ty = match self.peek() {
            Some(Token::Assign) | Some(Token::Semi) | Some(Token::RBrace) | None => None,
            _ => Some(self.parse_type()?),
        };
        let init = if self.eat(&Token::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Stmt::Var { name, ty, init })
    }

    /// Assignments, declarations, `++`/`--`, and expression statements
    fn parse_simple_stmt(&mut self) -> Result<Stmt, Error> {
        let target = self.parse_expr()?;
        match self.peek() {
            Some(Token::Define) => {
                self.pos += 1;
                let Expr::Ident(_) = target else {
                    return Err(Error::Parse(
                        "left side of := must be an identifier".to_string(),
                    ));
                };
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    op: AssignOp::Define,
                    target,
                    value,
                })
            }
            Some(Token::Assign) => {
                self.pos += 1;
                self.check_assignable(&target)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    op: AssignOp::Set,
                    target,
                    value,
                })
            }
            Some(Token::PlusAssign) => {
                self.pos += 1;
                self.check_assignable(&target)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    op: AssignOp::Add,
                    target,
                    value,
                })
            }
            Some(Token::PlusPlus) | Some(Token::MinusMinus) => {
                let inc = self.peek() == Some(&Token::PlusPlus);
                self.pos += 1;
                let Expr::Ident(name) = target else {
                    return Err(Error::Parse(
                        "++ and -- require a plain variable".to_string(),
                    ));
                };
                Ok(Stmt::IncDec { name, inc })
            }
            _ => Ok(Stmt::Expr(target)),
        }
    }

    fn check_assignable(&self, target: &Expr) -> Result<(), Error> {
        match target {
            Expr::Ident(_) | Expr::Index { .. } | Expr::Selector { .. } => Ok(()),
            _ => Err(Error::Parse("left side is not assignable".to_string())),
        }
    }

    /// `if [init;] cond { ... } [else if ... | else { ... }]`
    fn parse_if(&mut self) -> Result<Stmt, Error> {
        self.expect(&Token::If, "if statement")?;
        let first = self.parse_simple_stmt()?;
        let (init, cond) = if self.eat(&Token::Semi) {
            (Some(Box::new(first)), self.parse_expr()?)
        } else {
            match first {
                Stmt::Expr(cond) => (None, cond),
                _ => return Err(Error::Parse("if condition must be an expression".into())),
            }
        };
        let then = self.parse_block()?;
        let alt = if self.eat(&Token::Else) {
            match self.peek() {
                Some(Token::If) => Some(Box::new(self.parse_if()?)),
                _ => Some(Box::new(Stmt::Block(self.parse_block()?))),
            }
        } else {
            None
        };
        Ok(Stmt::If {
            init,
            cond,
            then,
            alt,
        })
    }

    /// The three loop headers plus `for [k[, v]] := range expr`
    fn parse_for(&mut self) -> Result<Stmt, Error> {
        self.expect(&Token::For, "for statement")?;
        if self.peek() == Some(&Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(Stmt::For {
                init: None,
                cond: None,
                post: None,
                body,
            });
        }
        if let Some(stmt) = self.try_parse_range()? {
            return Ok(stmt);
        }
        let first = self.parse_simple_stmt()?;
        if self.eat(&Token::Semi) {
            let cond = match self.peek() {
                Some(Token::Semi) => None,
                _ => Some(self.parse_expr()?),
            };
            self.expect(&Token::Semi, "for header")?;
            let post = match self.peek() {
                Some(Token::LBrace) => None,
                _ => Some(Box::new(self.parse_simple_stmt()?)),
            };
            let body = self.parse_block()?;
            return Ok(Stmt::For {
                init: Some(Box::new(first)),
                cond,
                post,
                body,
            });
        }
        let cond = match first {
            Stmt::Expr(cond) => cond,
            _ => return Err(Error::Parse("for condition must be an expression".into())),
        };
        let body = self.parse_block()?;
        Ok(Stmt::For {
            init: None,
            cond: Some(cond),
            post: None,
            body,
        })
    }

    /// Lookahead for `[ident [, ident] :=] range`; backtracks on no match.
    /// `for range xs { }` iterates without binding key or value.
    fn try_parse_range(&mut self) -> Result<Option<Stmt>, Error> {
        let (key, value) = if self.eat(&Token::Range) {
            (None, None)
        } else {
            let looks_like_range = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Ident(_)), Some(Token::Define)) => {
                    self.peek_at(2) == Some(&Token::Range)
                }
                (Some(Token::Ident(_)), Some(Token::Comma)) => {
                    matches!(self.peek_at(2), Some(Token::Ident(_)))
                        && self.peek_at(3) == Some(&Token::Define)
                        && self.peek_at(4) == Some(&Token::Range)
                }
                _ => false,
            };
            if !looks_like_range {
                return Ok(None);
            }
            let key = self.parse_binding_name()?;
            let value = if self.eat(&Token::Comma) {
                self.parse_binding_name()?
            } else {
                None
            };
            self.expect(&Token::Define, "range clause")?;
            self.expect(&Token::Range, "range clause")?;
            (key, value)
        };
        let subject = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Some(Stmt::Range {
            key,
            value,
            subject,
            body,
        }))
    }

    /// A range binding; `_` means "discard"
    fn parse_binding_name(&mut self) -> Result<Option<String>, Error> {
        match self.advance() {
            Some(Token::Ident(name)) if name == "_" => Ok(None),
            Some(Token::Ident(name)) => Ok(Some(name)),
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// `switch [init;] [tag] { case e1, e2: ... default: ... }`
    fn parse_switch(&mut self) -> Result<Stmt, Error> {
        self.expect(&Token::Switch, "switch statement")?;
        let mut init = None;
        let mut tag = None;
        if self.peek() != Some(&Token::LBrace) {
            let first = self.parse_simple_stmt()?;
            if self.eat(&Token::Semi) {
                init = Some(Box::new(first));
                if self.peek() != Some(&Token::LBrace) {
                    tag = Some(self.parse_expr()?);
                }
            } else {
                match first {
                    Stmt::Expr(expr) => tag = Some(expr),
                    _ => return Err(Error::Parse("switch tag must be an expression".into())),
                }
            }
        }
        self.expect(&Token::LBrace, "switch body")?;
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            self.skip_semis();
            match self.peek() {
                Some(Token::Case) => {
                    self.pos += 1;
                    let mut exprs = vec![self.parse_expr()?];
                    while self.eat(&Token::Comma) {
                        exprs.push(self.parse_expr()?);
                    }
                    self.expect(&Token::Colon, "case clause")?;
                    let body = self.parse_case_body()?;
                    cases.push(Case { exprs, body });
                }
                Some(Token::Default) => {
                    self.pos += 1;
                    self.expect(&Token::Colon, "default clause")?;
                    if default.is_some() {
                        return Err(Error::Parse("duplicate default clause".into()));
                    }
                    default = Some(self.parse_case_body()?);
                }
                Some(Token::RBrace) => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("case, default, or '}'")),
            }
        }
        Ok(Stmt::Switch {
            init,
            tag,
            cases,
            default,
        })
    }

    /// Statements up to the next case, default, or closing brace
    fn parse_case_body(&mut self) -> Result<Block, Error> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            match self.peek() {
                Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace) | None => break,
                _ => {}
            }
            stmts.push(self.parse_stmt()?);
            match self.peek() {
                Some(Token::Semi) => self.pos += 1,
                Some(Token::Case) | Some(Token::Default) | Some(Token::RBrace) => {}
                _ => return Err(self.unexpected("end of statement")),
            }
        }
        Ok(Block { stmts })
    }

    fn parse_ident_name(&mut self) -> Result<String, Error> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(self.unexpected("identifier")),
        }
    }

    // ===== Expressions =====

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec)) = self.peek().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.parse_binary(prec + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.peek() {
            Some(Token::Not) => Some(UnOp::Not),
            Some(Token::Minus) => Some(UnOp::Neg),
            Some(Token::Plus) => Some(UnOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    self.pos += 1;
                    let mut args = Vec::new();
                    while self.peek() != Some(&Token::RParen) {
                        args.push(self.parse_expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                        self.skip_semis();
                    }
                    self.expect(&Token::RParen, "call")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "index expression")?;
                    expr = Expr::Index {
                        subject: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    let field = self.parse_ident_name()?;
                    expr = Expr::Selector {
                        subject: Box::new(expr),
                        field,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.peek() {
            Some(Token::Int(_)) => match self.advance() {
                Some(Token::Int(n)) => Ok(Expr::Int(n)),
                _ => Err(self.unexpected("literal")),
            },
            Some(Token::Float(_)) => match self.advance() {
                Some(Token::Float(x)) => Ok(Expr::Float(x)),
                _ => Err(self.unexpected("literal")),
            },
            Some(Token::Str(_)) => match self.advance() {
                Some(Token::Str(s)) => Ok(Expr::Str(s)),
                _ => Err(self.unexpected("literal")),
            },
            Some(Token::Ident(_)) => {
                let name = self.parse_ident_name()?;
                Ok(Expr::Ident(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "parenthesized expression")?;
                Ok(inner)
            }
            Some(Token::Func) => self.parse_func_lit(),
            Some(Token::Map) | Some(Token::LBracket) => {
                let ty = self.parse_type()?;
                if self.peek() == Some(&Token::LBrace) {
                    self.parse_composite_lit(ty)
                } else {
                    Ok(Expr::TypeLit(ty))
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `func(a, b string) [T | (name T)] { ... }`
    fn parse_func_lit(&mut self) -> Result<Expr, Error> {
        self.expect(&Token::Func, "function literal")?;
        self.expect(&Token::LParen, "parameter list")?;
        let mut params = Vec::new();
        while self.peek() != Some(&Token::RParen) {
            params.push(self.parse_ident_name()?);
            // optional parameter type; execution is dynamic so it is discarded
            match self.peek() {
                Some(Token::Comma) | Some(Token::RParen) => {}
                _ => {
                    self.parse_type()?;
                }
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "parameter list")?;
        let mut named_result = None;
        match self.peek() {
            Some(Token::LBrace) => {}
            Some(Token::LParen) => {
                self.pos += 1;
                let name = self.parse_ident_name()?;
                let ty = self.parse_type()?;
                named_result = Some((name, ty));
                self.expect(&Token::RParen, "result list")?;
            }
            _ => {
                // bare result type, discarded
                self.parse_type()?;
            }
        }
        let body = self.parse_block()?;
        Ok(Expr::Func {
            params,
            named_result,
            body: Arc::new(body),
        })
    }

    /// `map[K]V{ k: v, ... }` or `[]T{ e, ... }`
    fn parse_composite_lit(&mut self, ty: TypeExpr) -> Result<Expr, Error> {
        self.expect(&Token::LBrace, "composite literal")?;
        match ty {
            TypeExpr::Map(_, _) => {
                let mut entries = Vec::new();
                loop {
                    self.skip_semis();
                    if self.peek() == Some(&Token::RBrace) {
                        break;
                    }
                    let key = self.parse_expr()?;
                    self.expect(&Token::Colon, "map literal")?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.eat(&Token::Comma) {
                        self.skip_semis();
                        break;
                    }
                }
                self.expect(&Token::RBrace, "map literal")?;
                Ok(Expr::MapLit { entries })
            }
            TypeExpr::Slice(_) => {
                let mut elems = Vec::new();
                loop {
                    self.skip_semis();
                    if self.peek() == Some(&Token::RBrace) {
                        break;
                    }
                    elems.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma) {
                        self.skip_semis();
                        break;
                    }
                }
                self.expect(&Token::RBrace, "slice literal")?;
                Ok(Expr::SliceLit { elems })
            }
            other => Err(Error::Parse(format!(
                "composite literal requires a map or slice type, found {:?}",
                other
            ))),
        }
    }

    fn parse_type(&mut self) -> Result<TypeExpr, Error> {
        match self.peek() {
            Some(Token::Map) => {
                self.pos += 1;
                self.expect(&Token::LBracket, "map type")?;
                let key = self.parse_type()?;
                self.expect(&Token::RBracket, "map type")?;
                let value = self.parse_type()?;
                Ok(TypeExpr::Map(Box::new(key), Box::new(value)))
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                self.expect(&Token::RBracket, "slice type")?;
                let elem = self.parse_type()?;
                Ok(TypeExpr::Slice(Box::new(elem)))
            }
            Some(Token::Ident(_)) => Ok(TypeExpr::Named(self.parse_ident_name()?)),
            _ => Err(self.unexpected("type")),
        }
    }
}

fn binary_op(token: &Token) -> Option<(BinOp, u8)> {
    let entry = match token {
        Token::OrOr => (BinOp::Or, 1),
        Token::AndAnd => (BinOp::And, 2),
        Token::EqEq => (BinOp::Eq, 3),
        Token::NotEq => (BinOp::Ne, 3),
        Token::Lt => (BinOp::Lt, 3),
        Token::Le => (BinOp::Le, 3),
        Token::Gt => (BinOp::Gt, 3),
        Token::Ge => (BinOp::Ge, 3),
        Token::Plus => (BinOp::Add, 4),
        Token::Minus => (BinOp::Sub, 4),
        Token::Star => (BinOp::Mul, 5),
        Token::Slash => (BinOp::Div, 5),
        Token::Percent => (BinOp::Rem, 5),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Stmt {
        let block = parse(src).unwrap();
        assert_eq!(block.stmts.len(), 1, "expected one statement in {:?}", src);
        block.stmts.into_iter().next().unwrap()
    }

    #[test]
    fn test_precedence() {
        let stmt = parse_one("1 + 2 * 3");
        let Stmt::Expr(Expr::Binary(BinOp::Add, _, right)) = stmt else {
            panic!("expected addition at the top");
        };
        assert!(matches!(*right, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn test_short_decl_and_assign() {
        assert!(matches!(
            parse_one("x := 1"),
            Stmt::Assign {
                op: AssignOp::Define,
                ..
            }
        ));
        assert!(matches!(
            parse_one("x = 1"),
            Stmt::Assign {
                op: AssignOp::Set,
                ..
            }
        ));
        assert!(matches!(
            parse_one("x += 1"),
            Stmt::Assign {
                op: AssignOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_three_part_for() {
        let stmt = parse_one("for i := 0; i < 3; i++ { }");
        let Stmt::For {
            init, cond, post, ..
        } = stmt
        else {
            panic!("expected for");
        };
        assert!(init.is_some());
        assert!(cond.is_some());
        assert!(matches!(post.as_deref(), Some(Stmt::IncDec { .. })));
    }

    #[test]
    fn test_range_forms() {
        let stmt = parse_one("for _, m := range xs { }");
        let Stmt::Range { key, value, .. } = stmt else {
            panic!("expected range");
        };
        assert_eq!(key, None);
        assert_eq!(value, Some("m".to_string()));

        let stmt = parse_one("for k := range xs { }");
        let Stmt::Range { key, value, .. } = stmt else {
            panic!("expected range");
        };
        assert_eq!(key, Some("k".to_string()));
        assert_eq!(value, None);

        let stmt = parse_one("for range xs { }");
        let Stmt::Range { key, value, .. } = stmt else {
            panic!("expected range");
        };
        assert_eq!(key, None);
        assert_eq!(value, None);
    }

    #[test]
    fn test_if_with_init() {
        let stmt = parse_one("if x := 1; x > 0 { } else { }");
        let Stmt::If { init, alt, .. } = stmt else {
            panic!("expected if");
        };
        assert!(init.is_some());
        assert!(matches!(alt.as_deref(), Some(Stmt::Block(_))));
    }

    #[test]
    fn test_map_literal_with_trailing_comma() {
        let stmt = parse_one("map[string]any{\n\t\"x\": 1,\n\t\"y\": 2,\n}");
        let Stmt::Expr(Expr::MapLit { entries }) = stmt else {
            panic!("expected map literal");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_slice_literal_and_index() {
        let stmt = parse_one("[]any{1, 2, 3}[0]");
        assert!(matches!(stmt, Stmt::Expr(Expr::Index { .. })));
    }

    #[test]
    fn test_func_lit_with_named_result() {
        let stmt = parse_one("func(a string) (ret string) { ret = a }");
        let Stmt::Expr(Expr::Func {
            params,
            named_result,
            ..
        }) = stmt
        else {
            panic!("expected function literal");
        };
        assert_eq!(params, vec!["a".to_string()]);
        assert_eq!(
            named_result,
            Some(("ret".to_string(), TypeExpr::Named("string".to_string())))
        );
    }

    #[test]
    fn test_switch() {
        let stmt = parse_one("switch x {\ncase 1, 2:\n\ty := 0\n\ty++\ncase 3:\ndefault:\n\tz := 1\n}");
        let Stmt::Switch { tag, cases, default, .. } = stmt else {
            panic!("expected switch");
        };
        assert!(tag.is_some());
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].exprs.len(), 2);
        assert!(default.is_some());
    }

    #[test]
    fn test_selector_chain() {
        let stmt = parse_one("a.b.c(1).d");
        assert!(matches!(stmt, Stmt::Expr(Expr::Selector { .. })));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("1 +").is_err());
        assert!(parse("if { }").is_err());
        assert!(parse("x :=").is_err());
        assert!(parse("for i := 0; i < 3 { }").is_err());
    }
}
