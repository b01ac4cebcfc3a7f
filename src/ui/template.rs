//! ui::template
//!
//! A small Go-style text template engine evaluated over JSON values.
//!
//! # Supported Syntax
//!
//! ```text
//! {{.Email}}                      field of the current value
//! {{.Region.Slug}}                nested field
//! {{.}}                           the current value itself
//! {{if .Active}}..{{else}}..{{end}}
//! {{if .A}}..{{else if .B}}..{{end}}
//! {{range .Items}}..{{else}}..{{end}}
//! {{with .Links}}..{{end}}
//! {{.Name | len}}                 pipelines
//! {{- .Name -}}                   whitespace trimming
//! ```
//!
//! Functions: `len`, `index`, `print`, `eq`, `ne`, `not`, `and`, `or`, `json`.
//!
//! # Field Lookup
//!
//! A field name first matches an object key exactly. Failing that it matches
//! case-insensitively with `_` and `-` ignored, so `.DropletLimit` reads the
//! `droplet_limit` key of an API response.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors from parsing or executing a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template: parse error: {0}")]
    Parse(String),

    #[error("template: {0}")]
    Exec(String),
}

fn parse_err<T>(msg: impl Into<String>) -> Result<T, TemplateError> {
    Err(TemplateError::Parse(msg.into()))
}

fn exec_err<T>(msg: impl Into<String>) -> Result<T, TemplateError> {
    Err(TemplateError::Exec(msg.into()))
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Action(Pipeline),
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
struct Pipeline {
    commands: Vec<Vec<Operand>>,
}

#[derive(Debug, Clone)]
enum Operand {
    /// Field chain from the current value; empty is `.` itself.
    Field(Vec<String>),
    Func(String),
    Literal(Value),
    Sub(Pipeline),
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let items = lex(source)?;
        let mut parser = Parser { items, pos: 0 };
        let (nodes, stop) = parser.parse_list()?;
        match stop {
            Stop::Eof => Ok(Self { nodes }),
            Stop::End => parse_err("unexpected {{end}}"),
            Stop::Else | Stop::ElseIf(_) => parse_err("unexpected {{else}}"),
        }
    }

    /// Execute against `data`.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        exec_list(&self.nodes, data, &mut out)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Lexing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Item {
    Text(String),
    Action(String),
}

fn lex(source: &str) -> Result<Vec<Item>, TemplateError> {
    let mut items = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    while let Some(open) = rest.find("{{") {
        let mut text = &rest[..open];
        if trim_next {
            text = text.trim_start();
        }
        let after_open = &rest[open + 2..];
        let trim_prev = after_open.starts_with("- ")
            || after_open.starts_with("-\t")
            || after_open.starts_with("-\n");
        if trim_prev {
            text = text.trim_end();
        }
        if !text.is_empty() {
            items.push(Item::Text(text.to_string()));
        }

        let body_start = if trim_prev { 1 } else { 0 };
        let close = match after_open.find("}}") {
            Some(i) => i,
            None => return parse_err("unclosed action"),
        };
        let mut body = &after_open[body_start..close];
        trim_next = body.ends_with(" -") || body.ends_with("\t-") || body.ends_with("\n-");
        if trim_next {
            body = &body[..body.len() - 1];
        }
        items.push(Item::Action(body.trim().to_string()));
        rest = &after_open[close + 2..];
    }

    let tail = if trim_next { rest.trim_start() } else { rest };
    if !tail.is_empty() {
        items.push(Item::Text(tail.to_string()));
    }
    Ok(items)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(Vec<String>),
    Ident(String),
    Str(String),
    Number(Number),
    Pipe,
    Open,
    Close,
}

fn tokenize(action: &str) -> Result<Vec<Token>, TemplateError> {
    let chars: Vec<char> = action.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return parse_err("unterminated quoted string"),
                        Some('"') => break,
                        Some('\\') => {
                            i += 1;
                            match chars.get(i) {
                                Some('n') => s.push('\n'),
                                Some('t') => s.push('\t'),
                                Some(other) => s.push(*other),
                                None => return parse_err("unterminated quoted string"),
                            }
                        }
                        Some(other) => s.push(*other),
                    }
                    i += 1;
                }
                tokens.push(Token::Str(s));
                i += 1;
            }
            '`' => {
                let start = i + 1;
                let end = match chars[start..].iter().position(|&ch| ch == '`') {
                    Some(p) => start + p,
                    None => return parse_err("unterminated raw string"),
                };
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '.' => {
                let mut path = Vec::new();
                while chars.get(i) == Some(&'.') {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && is_ident_char(chars[end]) {
                        end += 1;
                    }
                    if end == start {
                        if path.is_empty() {
                            i = end;
                            break;
                        }
                        return parse_err("bad field syntax");
                    }
                    path.push(chars[start..end].iter().collect());
                    i = end;
                }
                tokens.push(Token::Field(path));
            }
            '$' => return parse_err("variables are not supported"),
            c if c.is_ascii_digit()
                || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = if let Ok(n) = text.parse::<i64>() {
                    Number::from(n)
                } else {
                    text.parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .ok_or_else(|| TemplateError::Parse(format!("bad number {:?}", text)))?
                };
                tokens.push(Token::Number(number));
            }
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return parse_err(format!("unexpected {:?} in action", other)),
        }
    }
    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

enum Stop {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

struct Parser {
    items: Vec<Item>,
    pos: usize,
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.get(self.pos).cloned() {
            self.pos += 1;
            let action = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action(action) => action,
            };
            let tokens = tokenize(&action)?;
            let Some(first) = tokens.first() else {
                return parse_err("missing value for command");
            };
            match first {
                Token::Ident(kw) if kw == "end" => {
                    if tokens.len() > 1 {
                        return parse_err("unexpected tokens after end");
                    }
                    return Ok((nodes, Stop::End));
                }
                Token::Ident(kw) if kw == "else" => {
                    return match tokens.get(1) {
                        None => Ok((nodes, Stop::Else)),
                        Some(Token::Ident(next)) if next == "if" => {
                            Ok((nodes, Stop::ElseIf(parse_pipeline(&tokens[2..])?)))
                        }
                        Some(_) => parse_err("unexpected tokens after else"),
                    };
                }
                Token::Ident(kw) if kw == "if" => {
                    let cond = parse_pipeline(&tokens[1..])?;
                    let (then, otherwise) = self.parse_branches(true)?;
                    nodes.push(Node::If {
                        cond,
                        then,
                        otherwise,
                    });
                }
                Token::Ident(kw) if kw == "range" => {
                    let pipe = parse_pipeline(&tokens[1..])?;
                    let (body, otherwise) = self.parse_branches(false)?;
                    nodes.push(Node::Range {
                        pipe,
                        body,
                        otherwise,
                    });
                }
                Token::Ident(kw) if kw == "with" => {
                    let pipe = parse_pipeline(&tokens[1..])?;
                    let (body, otherwise) = self.parse_branches(false)?;
                    nodes.push(Node::With {
                        pipe,
                        body,
                        otherwise,
                    });
                }
                _ => nodes.push(Node::Action(parse_pipeline(&tokens)?)),
            }
        }
        Ok((nodes, Stop::Eof))
    }

    /// Parse a body and optional else branch up to the matching `{{end}}`.
    fn parse_branches(
        &mut self,
        allow_else_if: bool,
    ) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        let (body, stop) = self.parse_list()?;
        let otherwise = match stop {
            Stop::End => Vec::new(),
            Stop::Else => {
                let (otherwise, stop) = self.parse_list()?;
                match stop {
                    Stop::End => otherwise,
                    Stop::Eof => return parse_err("unexpected EOF"),
                    _ => return parse_err("expected {{end}}"),
                }
            }
            Stop::ElseIf(cond) if allow_else_if => {
                let (then, otherwise) = self.parse_branches(true)?;
                vec![Node::If {
                    cond,
                    then,
                    otherwise,
                }]
            }
            Stop::ElseIf(_) => return parse_err("else if is only allowed after if"),
            Stop::Eof => return parse_err("unexpected EOF"),
        };
        Ok((body, otherwise))
    }
}

fn parse_pipeline(tokens: &[Token]) -> Result<Pipeline, TemplateError> {
    let (pipeline, used) = parse_pipeline_at(tokens, 0)?;
    if used != tokens.len() {
        return parse_err("unexpected )");
    }
    Ok(pipeline)
}

fn parse_pipeline_at(tokens: &[Token], mut i: usize) -> Result<(Pipeline, usize), TemplateError> {
    let mut commands = Vec::new();
    let mut current = Vec::new();
    while i < tokens.len() {
        match &tokens[i] {
            Token::Close => break,
            Token::Pipe => {
                if current.is_empty() {
                    return parse_err("missing command before |");
                }
                commands.push(std::mem::take(&mut current));
                i += 1;
            }
            Token::Open => {
                let (sub, next) = parse_pipeline_at(tokens, i + 1)?;
                if tokens.get(next) != Some(&Token::Close) {
                    return parse_err("unclosed left paren");
                }
                current.push(Operand::Sub(sub));
                i = next + 1;
            }
            Token::Field(path) => {
                current.push(Operand::Field(path.clone()));
                i += 1;
            }
            Token::Str(s) => {
                current.push(Operand::Literal(Value::String(s.clone())));
                i += 1;
            }
            Token::Number(n) => {
                current.push(Operand::Literal(Value::Number(n.clone())));
                i += 1;
            }
            Token::Ident(name) => {
                current.push(match name.as_str() {
                    "true" => Operand::Literal(Value::Bool(true)),
                    "false" => Operand::Literal(Value::Bool(false)),
                    "nil" => Operand::Literal(Value::Null),
                    "if" | "range" | "with" | "else" | "end" => {
                        return parse_err(format!("unexpected keyword {}", name))
                    }
                    _ => {
                        if !is_function(name) {
                            return parse_err(format!("function {:?} not defined", name));
                        }
                        Operand::Func(name.clone())
                    }
                });
                i += 1;
            }
        }
    }
    if current.is_empty() {
        return parse_err("missing value for command");
    }
    commands.push(current);
    Ok((Pipeline { commands }, i))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn exec_list(nodes: &[Node], dot: &Value, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipe) => out.push_str(&print_value(&eval_pipeline(pipe, dot)?)),
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                if truthy(&eval_pipeline(cond, dot)?) {
                    exec_list(then, dot, out)?;
                } else {
                    exec_list(otherwise, dot, out)?;
                }
            }
            Node::With {
                pipe,
                body,
                otherwise,
            } => {
                let value = eval_pipeline(pipe, dot)?;
                if truthy(&value) {
                    exec_list(body, &value, out)?;
                } else {
                    exec_list(otherwise, dot, out)?;
                }
            }
            Node::Range {
                pipe,
                body,
                otherwise,
            } => {
                let value = eval_pipeline(pipe, dot)?;
                let elements: Vec<&Value> = match &value {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(map) => map.values().collect(),
                    Value::Null => Vec::new(),
                    other => {
                        let message = format!("range can't iterate over {}", print_value(other));
                        return exec_err(message);
                    }
                };
                if elements.is_empty() {
                    exec_list(otherwise, dot, out)?;
                }
                for element in elements {
                    exec_list(body, element, out)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_pipeline(pipe: &Pipeline, dot: &Value) -> Result<Value, TemplateError> {
    let mut piped: Option<Value> = None;
    for command in &pipe.commands {
        piped = Some(eval_command(command, dot, piped.take())?);
    }
    piped.map_or_else(|| exec_err("empty pipeline"), Ok)
}

fn eval_command(
    command: &[Operand],
    dot: &Value,
    piped: Option<Value>,
) -> Result<Value, TemplateError> {
    match command {
        [Operand::Func(name), args @ ..] => {
            let mut values = args
                .iter()
                .map(|a| eval_operand(a, dot))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(p) = piped {
                values.push(p);
            }
            call(name, values)
        }
        [single] if piped.is_none() => eval_operand(single, dot),
        _ => exec_err("can't give argument to non-function"),
    }
}

fn eval_operand(operand: &Operand, dot: &Value) -> Result<Value, TemplateError> {
    match operand {
        Operand::Field(path) => lookup_path(dot, path),
        Operand::Literal(v) => Ok(v.clone()),
        Operand::Sub(pipe) => eval_pipeline(pipe, dot),
        Operand::Func(name) => call(name, Vec::new()),
    }
}

fn lookup_path(dot: &Value, path: &[String]) -> Result<Value, TemplateError> {
    let mut current = dot;
    for name in path {
        current = match current {
            Value::Object(map) => match find_key(map, name) {
                Some(v) => v,
                None => return exec_err(format!("can't evaluate field {}", name)),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return exec_err(format!(
                    "can't evaluate field {} in {}",
                    name,
                    type_name(other)
                ))
            }
        };
    }
    Ok(current.clone())
}

fn find_key<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(name) {
        return Some(v);
    }
    let wanted = normalize(name);
    map.iter()
        .find(|(k, _)| normalize(k) == wanted)
        .map(|(_, v)| v)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

const FUNCTIONS: &[&str] = &["len", "index", "print", "eq", "ne", "not", "and", "or", "json"];

fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, TemplateError> {
    match name {
        "len" => {
            let [arg] = args.as_slice() else {
                return exec_err("wrong number of args for len: want 1");
            };
            let n = match arg {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(m) => m.len(),
                other => return exec_err(format!("len of {}", type_name(other))),
            };
            Ok(Value::from(n))
        }
        "index" => {
            let Some((first, keys)) = args.split_first() else {
                return exec_err("wrong number of args for index: want at least 1");
            };
            let mut current = first.clone();
            for key in keys {
                current = match (&current, key) {
                    (Value::Array(items), Value::Number(n)) => {
                        let idx = n
                            .as_u64()
                            .and_then(|i| usize::try_from(i).ok())
                            .ok_or_else(|| TemplateError::Exec(format!("bad index {}", n)))?;
                        items
                            .get(idx)
                            .cloned()
                            .ok_or_else(|| {
                                TemplateError::Exec(format!("index out of range: {}", idx))
                            })?
                    }
                    (Value::Object(map), Value::String(k)) => {
                        map.get(k).cloned().unwrap_or(Value::Null)
                    }
                    (Value::Null, _) => Value::Null,
                    (container, _) => {
                        let message = format!("can't index item of type {}", type_name(container));
                        return exec_err(message);
                    }
                };
            }
            Ok(current)
        }
        "print" => {
            let mut out = String::new();
            for (i, arg) in args.iter().enumerate() {
                if i > 0 && !args[i - 1].is_string() && !arg.is_string() {
                    out.push(' ');
                }
                out.push_str(&print_value(arg));
            }
            Ok(Value::String(out))
        }
        "eq" => {
            let Some((first, rest)) = args.split_first() else {
                return exec_err("wrong number of args for eq: want at least 2");
            };
            if rest.is_empty() {
                return exec_err("wrong number of args for eq: want at least 2");
            }
            Ok(Value::Bool(rest.iter().any(|v| values_equal(first, v))))
        }
        "ne" => {
            let [a, b] = args.as_slice() else {
                return exec_err("wrong number of args for ne: want 2");
            };
            Ok(Value::Bool(!values_equal(a, b)))
        }
        "not" => {
            let [arg] = args.as_slice() else {
                return exec_err("wrong number of args for not: want 1");
            };
            Ok(Value::Bool(!truthy(arg)))
        }
        "and" => {
            if args.is_empty() {
                return exec_err("wrong number of args for and: want at least 1");
            }
            let last = args.len() - 1;
            Ok(args
                .iter()
                .position(|v| !truthy(v))
                .map_or_else(|| args[last].clone(), |i| args[i].clone()))
        }
        "or" => {
            if args.is_empty() {
                return exec_err("wrong number of args for or: want at least 1");
            }
            let last = args.len() - 1;
            Ok(args
                .iter()
                .position(truthy)
                .map_or_else(|| args[last].clone(), |i| args[i].clone()))
        }
        "json" => {
            let [arg] = args.as_slice() else {
                return exec_err("wrong number of args for json: want 1");
            };
            serde_json::to_string(arg)
                .map(Value::String)
                .map_err(|e| TemplateError::Exec(e.to_string()))
        }
        other => exec_err(format!("function {:?} not defined", other)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Go truthiness: zero values are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(m) => !m.is_empty(),
    }
}

/// Text form of a value as printed by an action.
pub fn print_value(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(print_value).collect();
            format!("[{}]", parts.join(" "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", k, print_value(v)))
                .collect();
            format!("map[{}]", parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(src: &str, data: Value) -> String {
        Template::parse(src).unwrap().render(&data).unwrap()
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("hello", json!({})), "hello");
    }

    #[test]
    fn field_lookup_exact_and_fuzzy() {
        let data = json!({"email": "sammy@digitalocean.com", "droplet_limit": 25});
        assert_eq!(
            render("{{.email}} {{.DropletLimit}}", data),
            "sammy@digitalocean.com 25"
        );
    }

    #[test]
    fn nested_fields_and_dot() {
        let data = json!({"region": {"slug": "nyc3"}});
        assert_eq!(render("{{.Region.Slug}}", data), "nyc3");
        assert_eq!(render("{{.}}", json!("x")), "x");
    }

    #[test]
    fn missing_field_is_an_error() {
        let t = Template::parse("{{.Nope}}").unwrap();
        assert!(matches!(t.render(&json!({"a": 1})), Err(TemplateError::Exec(_))));
    }

    #[test]
    fn null_prints_nil() {
        assert_eq!(render("{{.completed_at}}", json!({"completed_at": null})), "<nil>");
    }

    #[test]
    fn if_else_if_chain() {
        let src = concat!(
            "{{if eq .status \"completed\"}}done",
            "{{else if eq .status \"errored\"}}failed",
            "{{else}}busy{{end}}"
        );
        assert_eq!(render(src, json!({"status": "completed"})), "done");
        assert_eq!(render(src, json!({"status": "errored"})), "failed");
        assert_eq!(render(src, json!({"status": "in-progress"})), "busy");
    }

    #[test]
    fn range_with_else() {
        let src = "{{range .tags}}<{{.}}>{{else}}none{{end}}";
        assert_eq!(render(src, json!({"tags": ["a", "b"]})), "<a><b>");
        assert_eq!(render(src, json!({"tags": []})), "none");
    }

    #[test]
    fn with_rebinds_dot() {
        let src = "{{with .links}}{{.next}}{{else}}last{{end}}";
        assert_eq!(render(src, json!({"links": {"next": "p2"}})), "p2");
        assert_eq!(render(src, json!({"links": {}})), "last");
    }

    #[test]
    fn pipelines_and_functions() {
        let data = json!({"name": "abc", "items": [1, 2, 3], "m": {"k": "v"}});
        assert_eq!(render("{{.name | len}}", data.clone()), "3");
        assert_eq!(render("{{index .items 1}}", data.clone()), "2");
        assert_eq!(render("{{index .m \"k\"}}", data.clone()), "v");
        assert_eq!(render("{{not true}}", data.clone()), "false");
        assert_eq!(render("{{print 1 2 \"x\"}}", data.clone()), "1 2x");
        assert_eq!(render("{{json .m}}", data.clone()), "{\"k\":\"v\"}");
        assert_eq!(render("{{if (eq (len .items) 3)}}three{{end}}", data), "three");
    }

    #[test]
    fn composite_values_print_go_style() {
        assert_eq!(render("{{.}}", json!(["a", "b"])), "[a b]");
        assert_eq!(render("{{.}}", json!({"a": 1})), "map[a:1]");
    }

    #[test]
    fn trim_markers() {
        let src = "a  {{- .x -}}  b";
        assert_eq!(render(src, json!({"x": "-"})), "a-b");
    }

    #[test]
    fn parse_errors() {
        assert!(Template::parse("{{if .a}}x").is_err());
        assert!(Template::parse("{{end}}").is_err());
        assert!(Template::parse("{{.a").is_err());
        assert!(Template::parse("{{nosuchfunc .a}}").is_err());
        assert!(Template::parse("{{$x := 1}}").is_err());
    }
}
