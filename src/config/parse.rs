//! Source file parsing and discovery
//!
//! Statements are line oriented:
//!
//! ```text
//! // comment
//! var name = value
//! _ {                          default command
//! |deploy|(env, opt tag) <build> {
//!     var target = &env
//!     $ ./deploy.sh env tag
//! }
//! ```
//!
//! The header before `{` goes through the [`lexer`](crate::config::lexer)
//! and a small recursive-descent parser. The body is every following line
//! up to, not including, the first line containing `}`.

use crate::config::expr::evaluate_expression;
use crate::config::lexer::{tokenize, Token};
use crate::config::types::{Argument, Command, Program, Variable, GLOBAL_SCOPE};
use crate::error::{LoadError, LoadResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default source file name
pub const SOURCE_FILE_NAME: &str = "Constfile";

/// Keyword marking an argument as optional
const OPTIONAL_KEYWORD: &str = "opt";

/// Find the source file by searching current and parent directories
pub fn find_source_file() -> LoadResult<PathBuf> {
    let current_dir = env::current_dir().map_err(|e| LoadError::Unreadable {
        path: PathBuf::from("."),
        error: format!("Failed to get current directory: {}", e),
    })?;
    find_source_file_from(current_dir, SOURCE_FILE_NAME)
}

/// Find `file_name` starting from a specific directory and walking up
pub fn find_source_file_from(start_dir: PathBuf, file_name: &str) -> LoadResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        let candidate = current_dir.join(file_name);
        searched_paths.push(candidate.display().to_string());

        if candidate.is_file() {
            return Ok(candidate);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(LoadError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a source file from a path
pub fn parse_source_file(path: &Path) -> LoadResult<Program> {
    let contents = fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    log::debug!("parsing {}", path.display());
    Ok(parse_source(&contents))
}

/// Parse source text into a program
///
/// Malformed declarations are skipped rather than reported.
pub fn parse_source(source: &str) -> Program {
    Parser::new(source).parse()
}

/// Line-oriented parser state
pub struct Parser<'a> {
    lines: Vec<&'a str>,
    current_index: usize,
    program: Program,
}

/// A parsed command header
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    name: String,
    cloud_accessible: bool,
    arguments: Vec<Argument>,
    prereqs: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser {
            lines: source.lines().collect(),
            current_index: 0,
            program: Program::default(),
        }
    }

    /// Gets the current line number (1-based).
    fn current_line_number(&self) -> usize {
        self.current_index + 1
    }

    pub fn parse(mut self) -> Program {
        while let Some(line) = self.lines.get(self.current_index).copied() {
            let trimmed = line.trim();
            self.current_index += 1;

            if trimmed.is_empty() || trimmed.starts_with("//") {
                continue;
            }

            if is_var_line(trimmed) {
                self.parse_variable(trimmed, GLOBAL_SCOPE);
                continue;
            }

            let is_default = trimmed.starts_with('_');
            self.parse_command(trimmed, is_default);
        }

        self.program
    }

    /// Parse `var name = expression` into the program
    fn parse_variable(&mut self, line: &str, scope: &str) {
        let declaration = line.strip_prefix("var").unwrap_or(line);
        let (name, expression) = match declaration.split_once('=') {
            Some((name, expression)) => (name.trim(), Some(expression)),
            None => (declaration.trim(), None),
        };

        if name.is_empty() {
            log::warn!("line {}: variable without a name", self.current_line_number() - 1);
            return;
        }

        let value = match expression {
            Some(expression) => {
                let evaluated =
                    evaluate_expression(expression, name, scope, &self.program.variables);
                if let Some(lazy) = evaluated.lazy {
                    self.program.commands.push(lazy);
                }
                evaluated.value
            }
            None => String::new(),
        };

        self.program.variables.push(Variable::new(name, value, scope));
    }

    /// Parse a command declaration starting at the line just consumed
    fn parse_command(&mut self, line: &str, is_default: bool) {
        let header_line = self.current_line_number() - 1;

        let Some((header, rest)) = line.split_once('{') else {
            log::trace!("line {}: not a declaration, skipped", header_line);
            return;
        };

        let Some(header) = parse_header(header) else {
            log::warn!("line {}: command without a name, skipped", header_line);
            return;
        };

        let raw_body = match rest.split_once('}') {
            Some((inline, _)) => vec![inline.trim().to_string()],
            None => match self.capture_body() {
                Some(body) => body,
                None => {
                    log::warn!(
                        "line {}: body of '{}' is never closed, skipped",
                        header_line,
                        header.name
                    );
                    return;
                }
            },
        };

        if raw_body.iter().all(|l| l.is_empty()) {
            log::debug!("line {}: '{}' has an empty body, skipped", header_line, header.name);
            return;
        }

        let mut body = Vec::with_capacity(raw_body.len());
        for body_line in raw_body {
            if is_var_line(&body_line) {
                self.parse_variable(&body_line, &header.name);
            } else if !body_line.is_empty() {
                body.push(body_line);
            }
        }

        log::debug!(
            "parsed command '{}' ({} lines, {} prerequisites)",
            header.name,
            body.len(),
            header.prereqs.len()
        );

        self.program.commands.push(Command {
            name: header.name,
            is_default,
            cloud_accessible: header.cloud_accessible,
            prereqs: header.prereqs,
            arguments: header.arguments,
            body,
            lazy_eval: None,
        });
    }

    /// Collect trimmed lines until the first one containing `}`
    ///
    /// Returns `None` when the file ends first; the rest of the file is
    /// consumed in that case.
    fn capture_body(&mut self) -> Option<Vec<String>> {
        let start = self.current_index;
        let Some(end) = self.lines[start..].iter().position(|l| l.contains('}')) else {
            self.current_index = self.lines.len();
            return None;
        };
        let end = end + start;

        let body = self.lines[start..end]
            .iter()
            .map(|l| l.trim().to_string())
            .collect();
        self.current_index = end + 1;
        Some(body)
    }
}

/// `var` followed by whitespace
fn is_var_line(line: &str) -> bool {
    line.strip_prefix("var")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

/// Parse the header text preceding `{`
fn parse_header(header: &str) -> Option<Header> {
    HeaderParser {
        tokens: tokenize(header),
        pos: 0,
    }
    .header()
}

/// Recursive-descent parser over header tokens
///
/// ```text
/// header    := name ['*' ...] [arguments] [prereqs]
/// name      := ['|'] word+ ['|']
/// arguments := '(' [spec (',' spec)*] ')'
/// spec      := ['opt'] word
/// prereqs   := '<' [word (',' word)*] '>'
/// ```
struct HeaderParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl HeaderParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip tokens until `stop` returns true or input ends
    fn skip_until(&mut self, stop: impl Fn(&Token) -> bool) {
        while let Some(token) = self.peek() {
            if stop(token) {
                break;
            }
            self.pos += 1;
        }
    }

    fn header(&mut self) -> Option<Header> {
        let (name, cloud_accessible) = self.name()?;

        self.skip_until(|t| matches!(t, Token::LParen | Token::LAngle));
        let arguments = if self.eat(&Token::LParen) {
            self.arguments()
        } else {
            Vec::new()
        };

        self.skip_until(|t| matches!(t, Token::LAngle));
        let prereqs = if self.eat(&Token::LAngle) {
            self.prereqs()
        } else {
            Vec::new()
        };

        Some(Header {
            name,
            cloud_accessible,
            arguments,
            prereqs,
        })
    }

    fn name(&mut self) -> Option<(String, bool)> {
        let opens_with_pipe = self.eat(&Token::Pipe);
        let mut words = Vec::new();
        let mut closes_with_pipe = false;

        while let Some(token) = self.peek() {
            match token {
                Token::Word(w) => {
                    words.push(w.clone());
                    closes_with_pipe = false;
                }
                Token::Pipe => closes_with_pipe = true,
                _ => break,
            }
            self.pos += 1;
        }

        if words.is_empty() {
            return None;
        }

        let name = words.join(" ");
        if opens_with_pipe && closes_with_pipe {
            Some((name, true))
        } else if opens_with_pipe {
            Some((format!("|{}", name), false))
        } else if closes_with_pipe {
            Some((format!("{}|", name), false))
        } else {
            Some((name, false))
        }
    }

    fn arguments(&mut self) -> Vec<Argument> {
        let mut arguments = Vec::new();
        let mut spec = Vec::new();

        loop {
            match self.advance() {
                Some(Token::Word(w)) => spec.push(w.clone()),
                Some(Token::Comma) => {
                    arguments.extend(argument_from_spec(&spec));
                    spec.clear();
                }
                Some(Token::RParen) | None => {
                    arguments.extend(argument_from_spec(&spec));
                    return arguments;
                }
                Some(_) => {}
            }
        }
    }

    fn prereqs(&mut self) -> Vec<String> {
        let mut prereqs = Vec::new();
        let mut current = Vec::new();

        loop {
            match self.advance() {
                Some(Token::Word(w)) => current.push(w.clone()),
                Some(Token::Comma) => {
                    if !current.is_empty() {
                        prereqs.push(current.join(" "));
                    }
                    current.clear();
                }
                Some(Token::RAngle) | None => {
                    if !current.is_empty() {
                        prereqs.push(current.join(" "));
                    }
                    return prereqs;
                }
                Some(_) => {}
            }
        }
    }
}

/// The last word is the name; a preceding `opt` marks it optional
fn argument_from_spec(spec: &[String]) -> Option<Argument> {
    let (name, modifiers) = spec.split_last()?;
    Some(Argument {
        name: name.clone(),
        is_optional: modifiers.iter().any(|m| m == OPTIONAL_KEYWORD),
    })
}
