//! Parser and evaluator for request-mapping expressions.
//!
//! Grammar (whitespace around tokens is ignored):
//!
//! ```text
//! expression := ['$'] 'input' '.' operation '(' [ string ] ')' accessor*
//! operation  := 'params' | 'json' | 'path'
//! accessor   := '.' identifier | '[' string ']' | '[' integer ']'
//! string     := '\'' ... '\'' | '"' ... '"'        (backslash escapes)
//! ```
//!
//! An expression is only *recognized* when its text contains `input.<name>(`;
//! anything else is inert and maps to nothing.  Recognized text that does not
//! fit the grammar is a [`MappingError`].

use super::jsonpath;
use crate::error::MappingError;
use crate::types::{InboundRequest, is_truthy};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;

static INPUT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"input\.[A-Za-z_][A-Za-z0-9_]*\s*\(").expect("input call pattern is valid")
});

/// The three operations of the mapping language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `params(name?)`: path → query → header lookup, or the full snapshot.
    Params,
    /// `json(path)`: first JSON-path match against the body.
    Json,
    /// `path(expr)`: never implemented.
    Path,
}

impl Operation {
    fn from_name(name: &str) -> Result<Self, MappingError> {
        match name {
            "params" => Ok(Operation::Params),
            "json" => Ok(Operation::Json),
            "path" => Ok(Operation::Path),
            other => Err(MappingError::UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Accessor {
    Member(String),
    Index(usize),
}

/// A parsed mapping expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    operation: Operation,
    argument: Option<String>,
    accessors: Vec<Accessor>,
}

impl Expression {
    /// Parse `text`.
    ///
    /// Returns `Ok(None)` when the text does not invoke the mapping language.
    pub fn parse(text: &str) -> Result<Option<Self>, MappingError> {
        if !INPUT_CALL.is_match(text) {
            return Ok(None);
        }
        Cursor::new(text).expression().map(Some)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// Evaluate against `request`.  `Ok(None)` means "no value".
    pub fn evaluate(&self, request: &InboundRequest) -> Result<Option<Value>, MappingError> {
        let value = match self.operation {
            Operation::Params => params(request, self.argument.as_deref()),
            Operation::Json => {
                let path = self.argument.as_deref().ok_or_else(|| MappingError::JsonPath {
                    path: String::new(),
                    message: "missing path argument".to_string(),
                })?;
                jsonpath::first_match(path, &request.body)?
            }
            Operation::Path => return Err(MappingError::Unimplemented),
        };

        Ok(self
            .accessors
            .iter()
            .try_fold(value, |current, accessor| {
                let current = current?;
                let next = match accessor {
                    Accessor::Member(name) => current.get(name.as_str()).cloned(),
                    Accessor::Index(index) => current.get(*index).cloned(),
                };
                next.map(Some)
            })
            .flatten())
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(text: &str, request: &InboundRequest) -> Result<Option<Value>, MappingError> {
    match Expression::parse(text)? {
        Some(expr) => expr.evaluate(request),
        None => Ok(None),
    }
}

fn params(request: &InboundRequest, name: Option<&str>) -> Option<Value> {
    // An empty name asks for the snapshot, same as no argument.
    match name.filter(|name| !name.is_empty()) {
        Some(name) => [
            request.path_params.get(name).map(String::as_str),
            request.query.get(name).map(String::as_str),
            request.header(name),
        ]
        .into_iter()
        .flatten()
        .map(|v| Value::String(v.to_string()))
        .find(is_truthy),
        // "headers" carries the path parameters, not the request headers.
        None => Some(json!({
            "headers": request.path_params,
            "querystring": request.query,
            "path": request.path_params,
        })),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────────────────────────

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn expression(&mut self) -> Result<Expression, MappingError> {
        self.skip_ws();
        self.eat('$');
        self.keyword("input")?;
        self.expect('.')?;
        let name = self.identifier()?;
        let operation = Operation::from_name(&name)?;

        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        let argument = match self.peek() {
            Some(')') => None,
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                Some(self.string(q)?)
            }
            _ => return Err(self.error("expected a quoted string argument")),
        };
        self.skip_ws();
        self.expect(')')?;

        let mut accessors = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    accessors.push(Accessor::Member(self.identifier()?));
                }
                Some('[') => {
                    self.pos += 1;
                    self.skip_ws();
                    let accessor = match self.peek() {
                        Some(q @ ('\'' | '"')) => {
                            self.pos += 1;
                            Accessor::Member(self.string(q)?)
                        }
                        Some(c) if c.is_ascii_digit() => Accessor::Index(self.index()?),
                        _ => return Err(self.error("expected a string or index")),
                    };
                    self.skip_ws();
                    self.expect(']')?;
                    accessors.push(accessor);
                }
                None => break,
                Some(other) => {
                    return Err(self.error(format!("unexpected trailing '{other}'")));
                }
            }
        }

        Ok(Expression {
            operation,
            argument,
            accessors,
        })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), MappingError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn keyword(&mut self, word: &str) -> Result<(), MappingError> {
        let start = self.pos;
        for expected in word.chars() {
            if !self.eat(expected) {
                self.pos = start;
                return Err(self.error(format!("expected '{word}'")));
            }
        }
        Ok(())
    }

    fn identifier(&mut self) -> Result<String, MappingError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == '_' || c.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn index(&mut self) -> Result<usize, MappingError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(format!("invalid index '{text}'")))
    }

    fn string(&mut self, quote: char) -> Result<String, MappingError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        out.push(escaped);
                        self.pos += 1;
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> MappingError {
        MappingError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InboundRequest {
        InboundRequest::new("req-1", "/users/42")
            .with_body(json!({ "user": { "name": "a", "roles": ["admin"] } }))
            .with_path_param("id", "42")
            .with_path_param("empty", "")
            .with_query("id", "query-id")
            .with_query("page", "2")
            .with_query("empty", "from-query")
            .with_header("X-Trace", "t-1")
    }

    #[test]
    fn non_language_text_is_inert() {
        assert_eq!(evaluate("static value", &request()).unwrap(), None);
        assert_eq!(evaluate("$input.params", &request()).unwrap(), None);
        assert_eq!(evaluate("", &request()).unwrap(), None);
    }

    #[test]
    fn params_prefers_path_then_query_then_header() {
        let req = request();
        assert_eq!(evaluate("$input.params('id')", &req).unwrap(), Some(json!("42")));
        assert_eq!(evaluate("input.params(\"page\")", &req).unwrap(), Some(json!("2")));
        assert_eq!(evaluate("$input.params('x-trace')", &req).unwrap(), Some(json!("t-1")));
        assert_eq!(evaluate("$input.params('missing')", &req).unwrap(), None);
    }

    #[test]
    fn params_skips_empty_values() {
        assert_eq!(
            evaluate("$input.params('empty')", &request()).unwrap(),
            Some(json!("from-query"))
        );
    }

    #[test]
    fn params_snapshot_labels_path_params_as_headers() {
        // Known quirk: "headers" exposes path parameters, never HTTP headers.
        let snapshot = evaluate("$input.params()", &request()).unwrap().unwrap();
        assert_eq!(snapshot["headers"], snapshot["path"]);
        assert_eq!(snapshot["headers"]["id"], "42");
        assert!(snapshot["headers"].get("x-trace").is_none());
        assert_eq!(snapshot["querystring"]["page"], "2");
    }

    #[test]
    fn empty_params_argument_returns_snapshot() {
        let req = request();
        let snapshot = evaluate("$input.params()", &req).unwrap();
        assert!(snapshot.is_some());
        assert_eq!(evaluate("$input.params('')", &req).unwrap(), snapshot);
        assert_eq!(evaluate("$input.params(\"\")", &req).unwrap(), snapshot);
    }

    #[test]
    fn accessors_navigate_the_result() {
        let req = request();
        assert_eq!(
            evaluate("$input.params().querystring.page", &req).unwrap(),
            Some(json!("2"))
        );
        assert_eq!(
            evaluate("$input.json('$.user')['roles'][0]", &req).unwrap(),
            Some(json!("admin"))
        );
        assert_eq!(evaluate("$input.json('$.user').nope", &req).unwrap(), None);
    }

    #[test]
    fn json_returns_first_match() {
        let req = request();
        assert_eq!(evaluate("$input.json('user.name')", &req).unwrap(), Some(json!("a")));
        assert_eq!(evaluate("$input.json('$.user.email')", &req).unwrap(), None);
    }

    #[test]
    fn path_is_unimplemented() {
        assert_eq!(
            evaluate("$input.path('$.a')", &request()),
            Err(MappingError::Unimplemented)
        );
    }

    #[test]
    fn unknown_operation_is_an_error() {
        assert_eq!(
            evaluate("$input.body('x')", &request()),
            Err(MappingError::UnknownOperation("body".to_string()))
        );
    }

    #[test]
    fn malformed_recognized_text_is_a_syntax_error() {
        let req = request();
        assert!(matches!(
            evaluate("$input.params(id)", &req),
            Err(MappingError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate("'x' + $input.params('id')", &req),
            Err(MappingError::Syntax { .. })
        ));
        assert!(matches!(
            evaluate("$input.params('id') trailing", &req),
            Err(MappingError::Syntax { .. })
        ));
    }

    #[test]
    fn parse_exposes_operation_and_argument() {
        let expr = Expression::parse("  $input.json( \"$.a\" )  ").unwrap().unwrap();
        assert_eq!(expr.operation(), Operation::Json);
        assert_eq!(expr.argument(), Some("$.a"));
    }
}
