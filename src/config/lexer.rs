//! Tokenizer for command header lines
//!
//! A header is everything on a declaration line before the opening `{`,
//! e.g. `|deploy|(env, opt tag) <build, test>`.

use std::iter::Peekable;
use std::str::Chars;

/// A single header token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of non-delimiter, non-whitespace characters
    Word(String),
    LParen,
    RParen,
    LAngle,
    RAngle,
    Comma,
    Pipe,
    Star,
}

impl Token {
    fn from_delimiter(c: char) -> Option<Token> {
        match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '<' => Some(Token::LAngle),
            '>' => Some(Token::RAngle),
            ',' => Some(Token::Comma),
            '|' => Some(Token::Pipe),
            '*' => Some(Token::Star),
            _ => None,
        }
    }
}

/// Explicit-state scanner over a header string
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
        }
    }

    /// Consume the whole input into a token list
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn next_token(&mut self) -> Option<Token> {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let c = self.chars.next()?;
        if let Some(token) = Token::from_delimiter(c) {
            return Some(token);
        }

        let mut word = String::from(c);
        while let Some(next) = self
            .chars
            .next_if(|c| !c.is_whitespace() && Token::from_delimiter(*c).is_none())
        {
            word.push(next);
        }
        Some(Token::Word(word))
    }
}

/// Tokenize a header string
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
