//! Minimal JSON-path evaluator backing `input.json(...)`.
//!
//! Supported syntax:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `$` | root (optional; a path without it is rooted implicitly) |
//! | `.name`, `['name']`, `["name"]` | object member |
//! | `[n]` | array element, negative `n` counts from the end |
//! | `.*`, `[*]` | every member / element |
//! | `..name`, `..*`, `..[n]` | recursive descent |
//!
//! Filters and slices are rejected with [`MappingError::JsonPath`].

use crate::error::MappingError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Name(String),
    Index(i64),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    recursive: bool,
    selector: Selector,
}

/// A compiled JSON path.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    steps: Vec<Step>,
}

impl JsonPath {
    /// Compile `path`.
    pub fn parse(path: &str) -> Result<Self, MappingError> {
        Parser::new(path).parse()
    }

    /// All matches in document order.
    pub fn query<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut nodes = vec![root];
        for step in &self.steps {
            let mut next = Vec::new();
            for node in nodes {
                if step.recursive {
                    let mut all = Vec::new();
                    collect_descendants(node, &mut all);
                    for candidate in all {
                        select(candidate, &step.selector, &mut next);
                    }
                } else {
                    select(node, &step.selector, &mut next);
                }
            }
            nodes = next;
            if nodes.is_empty() {
                break;
            }
        }
        nodes
    }
}

/// First match of `path` in `root`, cloned.
pub fn first_match(path: &str, root: &Value) -> Result<Option<Value>, MappingError> {
    let compiled = JsonPath::parse(path)?;
    Ok(compiled.query(root).first().map(|v| (*v).clone()))
}

fn select<'a>(node: &'a Value, selector: &Selector, out: &mut Vec<&'a Value>) {
    match (selector, node) {
        (Selector::Name(name), Value::Object(map)) => out.extend(map.get(name)),
        (Selector::Index(index), Value::Array(items)) => {
            let len = items.len() as i64;
            let resolved = if *index < 0 { len + index } else { *index };
            if (0..len).contains(&resolved) {
                out.push(&items[resolved as usize]);
            }
        }
        (Selector::Wildcard, Value::Object(map)) => out.extend(map.values()),
        (Selector::Wildcard, Value::Array(items)) => out.extend(items.iter()),
        _ => {}
    }
}

fn collect_descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Object(map) => map.values().for_each(|v| collect_descendants(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_descendants(v, out)),
        _ => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────────────

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<JsonPath, MappingError> {
        let mut steps = Vec::new();

        if self.peek() == Some('$') {
            self.pos += 1;
        } else if !matches!(self.peek(), Some('.') | Some('[') | None) {
            // Implicit root: `user.name` reads as `$.user.name`.
            steps.push(self.member(false)?);
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    let recursive = self.peek() == Some('.');
                    if recursive {
                        self.pos += 1;
                    }
                    if recursive && self.peek() == Some('[') {
                        steps.push(self.bracket(true)?);
                    } else {
                        steps.push(self.member(recursive)?);
                    }
                }
                '[' => steps.push(self.bracket(false)?),
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            }
        }

        Ok(JsonPath { steps })
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn member(&mut self, recursive: bool) -> Result<Step, MappingError> {
        if self.peek() == Some('*') {
            self.pos += 1;
            return Ok(Step {
                recursive,
                selector: Selector::Wildcard,
            });
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected member name"));
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        Ok(Step {
            recursive,
            selector: Selector::Name(name),
        })
    }

    fn bracket(&mut self, recursive: bool) -> Result<Step, MappingError> {
        // consume '['
        self.pos += 1;
        self.skip_ws();
        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                Selector::Name(self.quoted(q)?)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Selector::Index(self.integer()?),
            Some(other) => {
                return Err(self.error(format!("unsupported bracket expression starting with '{other}'")));
            }
            None => return Err(self.error("unterminated bracket")),
        };
        self.skip_ws();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(Step {
            recursive,
            selector,
        })
    }

    fn quoted(&mut self, quote: char) -> Result<String, MappingError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => match self.peek() {
                    Some(escaped) => {
                        out.push(escaped);
                        self.pos += 1;
                    }
                    None => break,
                },
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn integer(&mut self) -> Result<i64, MappingError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| self.error(format!("invalid index '{text}'")))
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> MappingError {
        MappingError::JsonPath {
            path: self.source.to_string(),
            message: format!("{} (at {})", message.into(), self.pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "user": { "name": "a", "tags": ["x", "y", "z"] },
            "items": [ { "id": 1 }, { "id": 2 } ],
            "odd key": true
        })
    }

    #[test]
    fn implicit_root_dot_path() {
        assert_eq!(first_match("user.name", &doc()).unwrap(), Some(json!("a")));
    }

    #[test]
    fn explicit_root_and_brackets() {
        assert_eq!(first_match("$.user['name']", &doc()).unwrap(), Some(json!("a")));
        assert_eq!(first_match("$[\"odd key\"]", &doc()).unwrap(), Some(json!(true)));
        assert_eq!(first_match("$.user.tags[1]", &doc()).unwrap(), Some(json!("y")));
        assert_eq!(first_match("$.user.tags[-1]", &doc()).unwrap(), Some(json!("z")));
    }

    #[test]
    fn root_alone_returns_whole_document() {
        assert_eq!(first_match("$", &doc()).unwrap(), Some(doc()));
    }

    #[test]
    fn wildcard_and_recursive_descent() {
        let path = JsonPath::parse("$.items[*].id").unwrap();
        let d = doc();
        let ids: Vec<&Value> = path.query(&d);
        assert_eq!(ids, vec![&json!(1), &json!(2)]);

        assert_eq!(first_match("$..id", &doc()).unwrap(), Some(json!(1)));
        assert_eq!(first_match("$..tags[0]", &doc()).unwrap(), Some(json!("x")));
    }

    #[test]
    fn missing_member_is_absent() {
        assert_eq!(first_match("user.email", &doc()).unwrap(), None);
        assert_eq!(first_match("$.items[9]", &doc()).unwrap(), None);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(first_match("$.items[?(@.id)]", &doc()).is_err());
        assert!(first_match("$.user[", &doc()).is_err());
        assert!(first_match("$.", &doc()).is_err());
        assert!(first_match("$['open", &doc()).is_err());
    }
}
