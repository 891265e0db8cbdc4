// ABOUTME: Tokenizer built on nom: literals, identifiers, operators, automatic statement termination

use nom::{
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    IResult, Parser,
};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    // keywords
    Func,
    Return,
    Break,
    Continue,
    If,
    Else,
    For,
    Range,
    Switch,
    Case,
    Default,
    Var,
    Map,
    // operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Define,
    PlusAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Not,
    Comma,
    Semi,
    Colon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

/// Tokenize the whole source. A newline terminates a statement when the
/// previous token can end one, so scripts may omit semicolons the way the
/// host language's grammar does.
pub(crate) fn lex(src: &str) -> Result<Vec<Token>, Error> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut rest = src;
    loop {
        let (after, newline) = skip_trivia(rest)?;
        rest = after;
        if newline && ends_statement(tokens.last()) {
            tokens.push(Token::Semi);
        }
        let Some(c) = rest.chars().next() else { break };
        if c.is_ascii_digit() {
            let (after, token) = lex_number(rest).map_err(|_| bad_token(rest))?;
            rest = after;
            tokens.push(token);
        } else if c == '"' || c == '\'' || c == '`' {
            let (after, token) = lex_quoted(rest, c)?;
            rest = after;
            tokens.push(token);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let (after, token) = lex_ident(rest).map_err(|_| bad_token(rest))?;
            rest = after;
            tokens.push(token);
        } else if let Some((len, token)) = lex_operator(rest) {
            rest = &rest[len..];
            tokens.push(token);
        } else {
            return Err(bad_token(rest));
        }
    }
    if ends_statement(tokens.last()) {
        tokens.push(Token::Semi);
    }
    Ok(tokens)
}

fn bad_token(rest: &str) -> Error {
    let snippet: String = rest.chars().take(12).collect();
    Error::Parse(format!("invalid token near {:?}", snippet))
}

/// True for tokens that may end a statement before a newline
fn ends_statement(last: Option<&Token>) -> bool {
    matches!(
        last,
        Some(
            Token::Int(_)
                | Token::Float(_)
                | Token::Str(_)
                | Token::Ident(_)
                | Token::Return
                | Token::Break
                | Token::Continue
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
                | Token::PlusPlus
                | Token::MinusMinus
        )
    )
}

/// Skip whitespace and comments, reporting whether a newline was crossed
fn skip_trivia(mut rest: &str) -> Result<(&str, bool), Error> {
    let mut newline = false;
    loop {
        if rest.starts_with("//") {
            match rest.find('\n') {
                Some(i) => rest = &rest[i..],
                None => rest = "",
            }
            continue;
        }
        if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(i) => {
                    newline |= rest[..2 + i].contains('\n');
                    rest = &rest[2 + i + 2..];
                }
                None => return Err(Error::Parse("unterminated block comment".into())),
            }
            continue;
        }
        match rest.chars().next() {
            Some(' ') | Some('\t') | Some('\r') => rest = &rest[1..],
            Some('\n') => {
                newline = true;
                rest = &rest[1..];
            }
            _ => return Ok((rest, newline)),
        }
    }
}

fn lex_number(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize((digit1, opt((char('.'), digit1)))).parse(input)?;
    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));
    let token = if text.contains('.') {
        Token::Float(text.parse().map_err(|_| fail())?)
    } else {
        Token::Int(text.parse().map_err(|_| fail())?)
    };
    Ok((rest, token))
}

fn lex_ident(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize((
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)?;
    let token = match text {
        "func" => Token::Func,
        "return" => Token::Return,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "if" => Token::If,
        "else" => Token::Else,
        "for" => Token::For,
        "range" => Token::Range,
        "switch" => Token::Switch,
        "case" => Token::Case,
        "default" => Token::Default,
        "var" => Token::Var,
        "map" => Token::Map,
        other => Token::Ident(other.to_string()),
    };
    Ok((rest, token))
}

/// Double- and single-quoted strings process escapes; backtick strings are
/// taken verbatim up to the closing backtick.
fn lex_quoted(input: &str, quote: char) -> Result<(&str, Token), Error> {
    let mut out = String::new();
    let mut it = input.char_indices();
    it.next(); // opening quote
    if quote == '`' {
        for (i, c) in it {
            if c == '`' {
                return Ok((&input[i + 1..], Token::Str(out)));
            }
            out.push(c);
        }
        return Err(Error::Parse("unterminated raw string".into()));
    }
    while let Some((i, c)) = it.next() {
        if c == quote {
            return Ok((&input[i + c.len_utf8()..], Token::Str(out)));
        }
        match c {
            '\\' => match it.next() {
                Some((_, esc)) => out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                }),
                None => return Err(Error::Parse("unterminated string".into())),
            },
            '\n' => return Err(Error::Parse("newline in string literal".into())),
            _ => out.push(c),
        }
    }
    Err(Error::Parse("unterminated string".into()))
}

fn lex_operator(rest: &str) -> Option<(usize, Token)> {
    const TWO: &[(&str, Token)] = &[
        ("==", Token::EqEq),
        ("!=", Token::NotEq),
        ("<=", Token::Le),
        (">=", Token::Ge),
        ("&&", Token::AndAnd),
        ("||", Token::OrOr),
        (":=", Token::Define),
        ("+=", Token::PlusAssign),
        ("++", Token::PlusPlus),
        ("--", Token::MinusMinus),
    ];
    for (pat, token) in TWO {
        if rest.starts_with(pat) {
            return Some((pat.len(), token.clone()));
        }
    }
    let token = match rest.chars().next()? {
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Star,
        '/' => Token::Slash,
        '%' => Token::Percent,
        '=' => Token::Assign,
        '<' => Token::Lt,
        '>' => Token::Gt,
        '!' => Token::Not,
        ',' => Token::Comma,
        ';' => Token::Semi,
        ':' => Token::Colon,
        '.' => Token::Dot,
        '(' => Token::LParen,
        ')' => Token::RParen,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '{' => Token::LBrace,
        '}' => Token::RBrace,
        _ => return None,
    };
    Some((1, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let tokens = lex(r#"x := 1 + 2.5"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".into()),
                Token::Define,
                Token::Int(1),
                Token::Plus,
                Token::Float(2.5),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_newline_terminates_statement() {
        let tokens = lex("a = 1\nb = 2").unwrap();
        let semis = tokens.iter().filter(|t| **t == Token::Semi).count();
        assert_eq!(semis, 2);
    }

    #[test]
    fn test_no_termination_after_operator() {
        let tokens = lex("a = 1 +\n2").unwrap();
        let semis = tokens.iter().filter(|t| **t == Token::Semi).count();
        assert_eq!(semis, 1);
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(
            lex(r#""a\"b""#).unwrap()[0],
            Token::Str("a\"b".to_string())
        );
        assert_eq!(
            lex(r"'it\'s'").unwrap()[0],
            Token::Str("it's".to_string())
        );
        assert_eq!(
            lex("`raw \\n text`").unwrap()[0],
            Token::Str("raw \\n text".to_string())
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = lex("1 // trailing\n/* block\ncomment */ 2").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Int(1), Token::Semi, Token::Int(2), Token::Semi]
        );
    }

    #[test]
    fn test_keywords_and_operators() {
        let tokens = lex("for i := 0; i < 3; i++ {}").unwrap();
        assert_eq!(tokens[0], Token::For);
        assert!(tokens.contains(&Token::PlusPlus));
        assert!(tokens.contains(&Token::Lt));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(lex("\"oops").is_err());
    }
}
