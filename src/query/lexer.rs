//! Lexer for the query language.

use crate::error::ParseError;
use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token<'src> {
    #[token("->")]
    Arrow,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token(",")]
    Comma,

    #[token("|")]
    Pipe,

    #[token("?")]
    Question,

    #[token("+")]
    Plus,

    #[token("!")]
    Bang,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    /// Raw motion hash, e.g. `0x0a1b2c3d4e`
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice())]
    Hex(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u32>().ok())]
    Number(u32),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    /// Quoted label, for labels that are not plain identifiers
    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Str(&'src str),
}

impl Token<'_> {
    /// Whether this token can begin an operand; used for juxtaposed sequences.
    pub fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::ParenOpen
                | Token::Bang
                | Token::Dot
                | Token::Hex(_)
                | Token::Ident(_)
                | Token::Str(_)
        )
    }

    pub fn describe(&self) -> String {
        match self {
            Token::Arrow => "'->'".to_string(),
            Token::ParenOpen => "'('".to_string(),
            Token::ParenClose => "')'".to_string(),
            Token::BraceOpen => "'{'".to_string(),
            Token::BraceClose => "'}'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Question => "'?'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Hex(s) | Token::Ident(s) => format!("\"{}\"", s),
            Token::Number(n) => n.to_string(),
            Token::Str(s) => format!("\"{}\"", s),
        }
    }
}

/// Tokenize a query. Fails on the first character that starts no token.
pub fn lex(input: &str) -> Result<Vec<(Token<'_>, Range<usize>)>, ParseError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(ParseError::new(
                    format!("unexpected input {:?}", &input[span.clone()]),
                    span,
                ));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        lex(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_lex_sequence() {
        assert_eq!(
            kinds("nair -> utilt"),
            vec![Token::Ident("nair"), Token::Arrow, Token::Ident("utilt")]
        );
    }

    #[test]
    fn test_lex_operators() {
        assert_eq!(
            kinds("(a|b)+ !c? .3 x{1,2}:hit"),
            vec![
                Token::ParenOpen,
                Token::Ident("a"),
                Token::Pipe,
                Token::Ident("b"),
                Token::ParenClose,
                Token::Plus,
                Token::Bang,
                Token::Ident("c"),
                Token::Question,
                Token::Dot,
                Token::Number(3),
                Token::Ident("x"),
                Token::BraceOpen,
                Token::Number(1),
                Token::Comma,
                Token::Number(2),
                Token::BraceClose,
                Token::Colon,
                Token::Ident("hit"),
            ]
        );
    }

    #[test]
    fn test_lex_hex_and_string_labels() {
        assert_eq!(
            kinds(r#"0x0a1b2c3d4e "side b""#),
            vec![Token::Hex("0x0a1b2c3d4e"), Token::Str("side b")]
        );
    }

    #[test]
    fn test_lex_spans() {
        let tokens = lex("  ab ->c").unwrap();
        assert_eq!(tokens[0].1, 2..4);
        assert_eq!(tokens[1].1, 5..7);
        assert_eq!(tokens[2].1, 7..8);
    }

    #[test]
    fn test_lex_rejects_unknown_characters() {
        let err = lex("nair & utilt").unwrap_err();
        assert_eq!(err.span, 5..6);
        assert!(err.message.contains('&'));
    }
}
