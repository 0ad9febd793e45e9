//! Recursive-descent parser for the query language.
//!
//! # Grammar
//!
//! ```text
//! query    = sequence EOF
//! sequence = union (["->"] union)*
//! union    = postfix ("|" postfix)*
//! postfix  = prefix ("+" | "?" | bounds | ":" QUALIFIER)*
//! bounds   = "{" [NUMBER] ["," [NUMBER]] "}"
//! prefix   = "!" prefix | primary
//! primary  = "(" sequence ")" | "." [NUMBER] | IDENT | HEX | STRING
//! ```
//!
//! Parsing either produces a complete tree or fails; there is no partial
//! result.

use super::ast::{Ast, MAX_REPEAT, Qualifiers};
use super::lexer::{Token, lex};
use crate::error::ParseError;
use std::ops::Range;

/// Nesting limit for parentheses and prefix operators
const MAX_DEPTH: u32 = 128;

/// Parse query text into a syntax tree
pub fn parse(input: &str) -> Result<Ast, ParseError> {
    let mut parser = Parser::new(input)?;
    if parser.peek().is_none() {
        return Err(ParseError::new("empty query", 0..input.len()));
    }
    let ast = parser.parse_sequence()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::new(
            format!("unexpected {}", token.describe()),
            parser.current_span(),
        ));
    }
    Ok(ast)
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    input: &'src str,
    depth: u32,
}

impl<'src> Parser<'src> {
    fn new(input: &'src str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: lex(input)?,
            pos: 0,
            input,
            depth: 0,
        })
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or(self.input.len()..self.input.len())
    }

    fn error_here(&self, expected: &str) -> ParseError {
        let found = self
            .peek()
            .map(|t| t.describe())
            .unwrap_or_else(|| "end of query".to_string());
        ParseError::new(format!("expected {}, found {}", expected, found), self.current_span())
    }

    fn expect(&mut self, expected: Token<'src>, what: &str) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(what))
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new("query is nested too deeply", self.current_span()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_sequence(&mut self) -> Result<Ast, ParseError> {
        let mut items = vec![self.parse_union()?];
        loop {
            match self.peek() {
                Some(Token::Arrow) => {
                    self.advance();
                    items.push(self.parse_union()?);
                }
                Some(token) if token.starts_operand() => items.push(self.parse_union()?),
                _ => break,
            }
        }
        Ok(if items.len() == 1 {
            items.swap_remove(0)
        } else {
            Ast::Sequence(items)
        })
    }

    fn parse_union(&mut self) -> Result<Ast, ParseError> {
        let mut items = vec![self.parse_postfix()?];
        while self.peek() == Some(Token::Pipe) {
            self.advance();
            items.push(self.parse_postfix()?);
        }
        Ok(if items.len() == 1 {
            items.swap_remove(0)
        } else {
            Ast::Union(items)
        })
    }

    fn parse_postfix(&mut self) -> Result<Ast, ParseError> {
        let mut node = self.parse_prefix()?;
        loop {
            node = match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    repeat(node, 1, None)
                }
                Some(Token::Question) => {
                    self.advance();
                    repeat(node, 0, Some(1))
                }
                Some(Token::BraceOpen) => {
                    let (min, max) = self.parse_bounds()?;
                    repeat(node, min, max)
                }
                Some(Token::Colon) => {
                    self.advance();
                    let qualifier = self.parse_qualifier()?;
                    qualify(node, qualifier)
                }
                _ => return Ok(node),
            };
        }
    }

    fn parse_qualifier(&mut self) -> Result<Qualifiers, ParseError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Ident(keyword)) => {
                self.advance();
                Qualifiers::from_keyword(keyword).ok_or_else(|| {
                    ParseError::new(format!("unknown qualifier \"{}\"", keyword), span)
                })
            }
            _ => Err(self.error_here("qualifier")),
        }
    }

    fn parse_bounds(&mut self) -> Result<(u32, Option<u32>), ParseError> {
        let start = self.current_span().start;
        self.expect(Token::BraceOpen, "'{'")?;

        let min = self.parse_number();
        let (min, max) = if self.peek() == Some(Token::Comma) {
            self.advance();
            (min, self.parse_number())
        } else {
            (min, min)
        };
        let end = self.current_span().end;
        self.expect(Token::BraceClose, "'}'")?;

        let span = start..end;
        let bounds = match (min, max) {
            (None, None) => return Err(ParseError::new("repetition needs a bound", span)),
            (min, max) => (min.unwrap_or(0), max),
        };
        match bounds {
            (_, Some(0)) => Err(ParseError::new("repetition maximum must be at least 1", span)),
            (min, Some(max)) if max < min => Err(ParseError::new(
                format!("repetition maximum {} is less than minimum {}", max, min),
                span,
            )),
            (min, max) if min > MAX_REPEAT || max.is_some_and(|m| m > MAX_REPEAT) => Err(
                ParseError::new(format!("repetition bounds cannot exceed {}", MAX_REPEAT), span),
            ),
            bounds => Ok(bounds),
        }
    }

    fn parse_number(&mut self) -> Option<u32> {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.advance();
                Some(n)
            }
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Result<Ast, ParseError> {
        if self.peek() == Some(Token::Bang) {
            self.advance();
            self.enter()?;
            let body = self.parse_prefix()?;
            self.leave();
            return Ok(Ast::Inversion(Box::new(body)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::ParenOpen) => {
                self.advance();
                self.enter()?;
                let inner = self.parse_sequence()?;
                self.leave();
                self.expect(Token::ParenClose, "')'")?;
                Ok(inner)
            }
            Some(Token::Dot) => {
                self.advance();
                match self.parse_number() {
                    None => Ok(Ast::Wildcard(1)),
                    Some(n) if (1..=MAX_REPEAT).contains(&n) => Ok(Ast::Wildcard(n)),
                    Some(n) => Err(ParseError::new(
                        format!("wildcard count must be between 1 and {}, got {}", MAX_REPEAT, n),
                        span.start..self.tokens[self.pos - 1].1.end,
                    )),
                }
            }
            Some(Token::Ident(text)) | Some(Token::Hex(text)) => {
                self.advance();
                Ok(Ast::label(text))
            }
            Some(Token::Str(text)) => {
                self.advance();
                if text.trim().is_empty() {
                    return Err(ParseError::new("empty label", span));
                }
                Ok(Ast::label(text))
            }
            _ => Err(self.error_here("label, wildcard or '('")),
        }
    }
}

fn repeat(body: Ast, min: u32, max: Option<u32>) -> Ast {
    Ast::Repetition {
        body: Box::new(body),
        min,
        max,
    }
}

/// Successive qualifiers on one operand accumulate into a single node.
fn qualify(node: Ast, qualifier: Qualifiers) -> Ast {
    match node {
        Ast::Qualifier { body, qualifiers } => Ast::Qualifier {
            body,
            qualifiers: qualifiers | qualifier,
        },
        body => Ast::Qualifier {
            body: Box::new(body),
            qualifiers: qualifier,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Ast {
        Ast::label(s)
    }

    #[test]
    fn test_parse_single_label() {
        assert_eq!(parse("nair").unwrap(), label("nair"));
    }

    #[test]
    fn test_parse_arrow_and_juxtaposition_are_equivalent() {
        let expected = Ast::Sequence(vec![label("nair"), label("utilt"), label("grab")]);
        assert_eq!(parse("nair -> utilt -> grab").unwrap(), expected);
        assert_eq!(parse("nair utilt grab").unwrap(), expected);
        assert_eq!(parse("nair utilt->grab").unwrap(), expected);
    }

    #[test]
    fn test_union_binds_tighter_than_sequence() {
        assert_eq!(
            parse("a -> b | c").unwrap(),
            Ast::Sequence(vec![label("a"), Ast::Union(vec![label("b"), label("c")])])
        );
    }

    #[test]
    fn test_inversion_binds_tighter_than_repetition() {
        assert_eq!(
            parse("!a+").unwrap(),
            repeat(Ast::Inversion(Box::new(label("a"))), 1, None)
        );
    }

    #[test]
    fn test_parse_repetitions() {
        assert_eq!(parse("a?").unwrap(), repeat(label("a"), 0, Some(1)));
        assert_eq!(parse("a{3}").unwrap(), repeat(label("a"), 3, Some(3)));
        assert_eq!(parse("a{2,}").unwrap(), repeat(label("a"), 2, None));
        assert_eq!(parse("a{,4}").unwrap(), repeat(label("a"), 0, Some(4)));
        assert_eq!(parse("a{1,4}").unwrap(), repeat(label("a"), 1, Some(4)));
    }

    #[test]
    fn test_parse_wildcards() {
        assert_eq!(parse(".").unwrap(), Ast::Wildcard(1));
        assert_eq!(
            parse("nair -> .3 -> grab").unwrap(),
            Ast::Sequence(vec![label("nair"), Ast::Wildcard(3), label("grab")])
        );
    }

    #[test]
    fn test_parse_qualifiers_accumulate() {
        assert_eq!(
            parse("(fair | bair):hit:os").unwrap(),
            Ast::Qualifier {
                body: Box::new(Ast::Union(vec![label("fair"), label("bair")])),
                qualifiers: Qualifiers::HIT | Qualifiers::ON_SHIELD,
            }
        );
        assert_eq!(parse("(a:hit):os").unwrap(), parse("a:hit:os").unwrap());
    }

    #[test]
    fn test_qualifier_keywords_are_labels_elsewhere() {
        assert_eq!(
            parse("hit -> sh").unwrap(),
            Ast::Sequence(vec![label("hit"), label("sh")])
        );
    }

    #[test]
    fn test_parse_hex_and_quoted_labels() {
        assert_eq!(
            parse(r#"0x0a1b2c3d4e -> "side b""#).unwrap(),
            Ast::Sequence(vec![label("0x0a1b2c3d4e"), label("side b")])
        );
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            "",
            "   ",
            "nair ->",
            "(nair",
            "nair)",
            "a | ",
            "a{}",
            "a{3,2}",
            "a{0}",
            "a{1,65}",
            ".0",
            "a:bogus",
            "a:",
            "-> a",
            "\"\"",
            "a & b",
        ];
        for case in cases {
            assert!(parse(case).is_err(), "expected parse error for {:?}", case);
        }
    }

    #[test]
    fn test_error_spans_point_at_offending_token() {
        let err = parse("nair )").unwrap_err();
        assert_eq!(err.span, 5..6);

        let err = parse("a:bogus").unwrap_err();
        assert_eq!(err.span, 2..7);
        assert!(err.message.contains("bogus"));

        let err = parse("nair ->").unwrap_err();
        assert_eq!(err.span, 7..7);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let query = format!("{}a{}", "(".repeat(200), ")".repeat(200));
        assert!(parse(&query).is_err());
        let query = format!("{}a", "!".repeat(200));
        assert!(parse(&query).is_err());
    }

    #[test]
    fn test_canonical_print_round_trip() {
        let corpus = [
            "nair",
            "nair -> utilt",
            "nair utilt grab",
            "nair -> . -> grab",
            "jab{2,3} -> grab",
            "jab+ -> .2 -> dashattack?",
            "(fair | bair):hit -> !shield",
            "!(a | b) -> c{,3}",
            "!(a+)",
            "(a -> b){2} | c",
            "((a | b) | c) -> d",
            "a:hit:whiff+ -> b:oos",
            "x:fh -> nair:sh:dj:idj -> y:rising | z:falling:dmg",
            "0x0a1b2c3d4e -> \"side b\"",
            "(a -> (b -> c)) -> d",
            "!!a -> .{2,}",
        ];
        for query in corpus {
            let ast = parse(query).unwrap();
            let printed = ast.to_string();
            let reparsed = parse(&printed)
                .unwrap_or_else(|e| panic!("{:?} printed as {:?}: {}", query, printed, e));
            assert_eq!(ast, reparsed, "{:?} printed as {:?}", query, printed);
            assert_eq!(printed, reparsed.to_string());
        }
    }
}
