//! Path expressions evaluated against a record element.
//!
//! A path expression names a descendant of the record element and,
//! optionally, one of its attributes:
//!
//! | Expression                     | Selects                                        |
//! |--------------------------------|------------------------------------------------|
//! | `Name`                         | text of the first `Name` child                 |
//! | `Venues/Venue`                 | text of the first `Venue` under `Venues`       |
//! | `Terms//Rate`                  | text of the first `Rate` anywhere under `Terms`|
//! | `Id/@isin`                     | attribute `isin` of the first `Id` child       |
//! | `@id`                          | attribute `id` of the record element itself    |
//! | `//Instrument/Name`            | same as `Name` (anchor dropped)                |
//! | `//Name`                       | same as `Name`                                 |
//! | `Id[@type='ISIN']`             | text of the first `Id` with `type="ISIN"`      |
//! | `Id[@type='ISIN']/@src`        | attribute `src` of that element                |
//!
//! Grammar (an ElementTree-style subset):
//!
//! ```text
//! path      := step ( ('/' | '//') step )*
//! step      := '.' | '*' | NAME | (NAME | '*') predicate+ | '@' NAME   (last step only)
//! predicate := '[' ( '@' NAME | '@' NAME '=' QUOTED | NAME | NAME '=' QUOTED
//!                  | INTEGER | 'last()' ) ']'
//! ```
//!
//! Before parsing, [`split_expression`] separates a trailing attribute
//! selector from expressions without predicates, and a leading `//NAME`
//! anchor (the record element itself) is dropped. An anchor with nothing
//! after it is kept as a plain child step.
//!
//! Position predicates count among same-named siblings under the parent,
//! whatever the axis, and every predicate filters independently.

use once_cell::sync::Lazy;
use regex::Regex;

use super::XmlNode;
use crate::error::PathResolutionError;
use crate::logs::log_warning;

static STEP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<test>\*|\.|[^\[\]/@=\s]+)(?P<preds>(?:\[[^\]]*\])*)$").unwrap()
});
static PREDICATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());
static ATTR_EXISTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([^=\s]+)$").unwrap());
static ATTR_EQUALS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@([^=\s]+)\s*=\s*(?:'([^']*)'|"([^"]*)")$"#).unwrap()
});
static CHILD_EQUALS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([^=\s@]+)\s*=\s*(?:'([^']*)'|"([^"]*)")$"#).unwrap()
});
static CHILD_EXISTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^=\s@\d][^=\s@]*)$").unwrap());
static ATTRIBUTE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\[\]/@=\s]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Current,
    Any,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
    HasChild(String),
    ChildTextEquals(String, String),
    /// 1-based, among same-named siblings
    Position(usize),
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    source: String,
    steps: Vec<Step>,
    attribute: Option<String>,
}

/// Split an expression into `(path, attribute)`.
///
/// Without predicate brackets, a `@` splits on its last occurrence and the
/// path loses its trailing `/`. With brackets, the whole expression is the
/// path, since predicates may contain `@` themselves.
pub fn split_expression(expression: &str) -> (&str, Option<&str>) {
    let has_predicate = expression.contains('[') && expression.contains(']');
    match expression.rfind('@') {
        Some(at) if !has_predicate => (
            expression[..at].trim_end_matches('/'),
            Some(&expression[at + 1..]),
        ),
        _ => (expression, None),
    }
}

/// Drop a leading `//NAME` anchor so the path is relative to the record element.
///
/// `//Rec/X` → `X`, `//Rec//X` → `.//X`, and a lone `//X` → `X`.
fn strip_anchor(path: &str) -> String {
    let Some(rest) = path.strip_prefix("//") else {
        return path.to_string();
    };
    match find_top_level(rest, '/') {
        Some(idx) => {
            let remainder = &rest[idx + 1..];
            // `//Record//X` keeps its descendant axis
            if remainder.starts_with('/') {
                format!(".{}", &rest[idx..])
            } else {
                remainder.to_string()
            }
        }
        None => rest.to_string(),
    }
}

/// Index of `needle` outside brackets and quotes.
fn find_top_level(s: &str, needle: char) -> Option<usize> {
    split_top_level(s).into_iter().next().and_then(|first| {
        if first.len() < s.len() && s[first.len()..].starts_with(needle) {
            Some(first.len())
        } else {
            None
        }
    })
}

/// Split on `/` outside brackets and quotes. Empty segments mark `//`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                segments.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&s[start..]);
    segments
}

impl PathExpr {
    /// Split, normalize and parse a path expression.
    pub fn compile(expression: &str) -> Result<Self, PathResolutionError> {
        let err = |message: &str| PathResolutionError::new(expression, message);

        let (path, attribute) = split_expression(expression);
        let attribute = match attribute {
            Some(name) if !ATTRIBUTE_NAME_RE.is_match(name) => {
                return Err(err("invalid attribute name"));
            }
            other => other.map(str::to_string),
        };

        let path = strip_anchor(path.trim());
        let (steps, inline_attribute) = parse_steps(&path).map_err(|m| err(&m))?;

        let attribute = match (attribute, inline_attribute) {
            (Some(_), Some(_)) => return Err(err("more than one attribute selector")),
            (a, b) => a.or(b),
        };

        Ok(Self {
            source: expression.to_string(),
            steps,
            attribute,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Attribute selected on the target nodes, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Every node the path selects, in document order.
    pub fn select<'a>(&self, node: &'a XmlNode) -> Vec<&'a XmlNode> {
        let mut current = vec![node];

        for step in &self.steps {
            let mut next: Vec<&XmlNode> = Vec::new();
            for ctx in &current {
                if step.test == NodeTest::Current {
                    match step.axis {
                        Axis::Child => next.push(*ctx),
                        Axis::Descendant => {
                            next.extend(std::iter::once(*ctx).chain(ctx.descendants()))
                        }
                    }
                    continue;
                }

                let mut candidates: Vec<(&XmlNode, &XmlNode)> = Vec::new();
                match step.axis {
                    Axis::Child => candidates.extend(ctx.children().iter().map(|c| (*ctx, c))),
                    Axis::Descendant => with_parents(ctx, &mut candidates),
                }
                next.extend(
                    candidates
                        .into_iter()
                        .filter(|(parent, n)| {
                            step.test.matches(n)
                                && step.predicates.iter().all(|p| p.accepts(parent, n))
                        })
                        .map(|(_, n)| n),
                );
            }
            next.sort_by_key(|n| n.order());
            next.dedup_by_key(|n| n.order());
            current = next;
        }

        current
    }

    /// Value of the first selected node.
    pub fn first_value(&self, node: &XmlNode) -> Option<String> {
        self.select(node)
            .into_iter()
            .next()
            .and_then(|target| self.value_of(target))
    }

    /// One value per selected node, in document order.
    pub fn all_values(&self, node: &XmlNode) -> Vec<Option<String>> {
        self.select(node)
            .into_iter()
            .map(|target| self.value_of(target))
            .collect()
    }

    fn value_of(&self, target: &XmlNode) -> Option<String> {
        match &self.attribute {
            Some(attr) => target.attribute(attr).map(str::to_string),
            None => target.text().map(str::to_string),
        }
    }
}

impl NodeTest {
    fn matches(&self, node: &XmlNode) -> bool {
        match self {
            NodeTest::Current | NodeTest::Any => true,
            NodeTest::Name(name) => node.name() == name,
        }
    }
}

impl Predicate {
    fn accepts(&self, parent: &XmlNode, node: &XmlNode) -> bool {
        let mut siblings = parent.children().iter().filter(|c| c.name() == node.name());
        match self {
            Predicate::Position(n) => siblings.nth(n - 1).is_some_and(|c| c.order() == node.order()),
            Predicate::Last => siblings.last().is_some_and(|c| c.order() == node.order()),
            Predicate::HasAttribute(attr) => node.attribute(attr).is_some(),
            Predicate::AttributeEquals(attr, value) => node.attribute(attr) == Some(value.as_str()),
            Predicate::HasChild(child) => node.children().iter().any(|c| c.name() == child),
            Predicate::ChildTextEquals(child, value) => node
                .children()
                .iter()
                .any(|c| c.name() == child && c.text().unwrap_or("") == value),
        }
    }
}

/// Every descendant of `node` with its parent, in document order.
fn with_parents<'a>(node: &'a XmlNode, out: &mut Vec<(&'a XmlNode, &'a XmlNode)>) {
    for child in node.children() {
        out.push((node, child));
        with_parents(child, out);
    }
}

/// Parse a normalized path into steps and an optional trailing attribute step.
fn parse_steps(path: &str) -> Result<(Vec<Step>, Option<String>), String> {
    if path.is_empty() {
        return Ok((Vec::new(), None));
    }
    if path.starts_with('/') {
        return Err("absolute paths are not allowed on a record element".into());
    }

    let segments = split_top_level(path);
    let mut steps = Vec::new();
    let mut attribute = None;
    let mut axis = Axis::Child;

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i + 1 == segments.len();

        if segment.is_empty() {
            if is_last || axis == Axis::Descendant {
                return Err("empty step".into());
            }
            axis = Axis::Descendant;
            continue;
        }

        if let Some(name) = segment.strip_prefix('@') {
            if !is_last {
                return Err("attribute selector must be the last step".into());
            }
            if axis == Axis::Descendant || !ATTRIBUTE_NAME_RE.is_match(name) {
                return Err(format!("invalid attribute step '{}'", segment));
            }
            attribute = Some(name.to_string());
            continue;
        }

        steps.push(parse_step(segment, axis)?);
        axis = Axis::Child;
    }

    Ok((steps, attribute))
}

fn parse_step(segment: &str, axis: Axis) -> Result<Step, String> {
    if segment.matches('[').count() != segment.matches(']').count() {
        return Err(format!("unbalanced brackets in '{}'", segment));
    }
    let caps = STEP_RE
        .captures(segment)
        .ok_or_else(|| format!("invalid step '{}'", segment))?;

    let test = match &caps["test"] {
        "." => NodeTest::Current,
        "*" => NodeTest::Any,
        name => NodeTest::Name(name.to_string()),
    };

    let predicates = PREDICATE_RE
        .captures_iter(&caps["preds"])
        .map(|p| parse_predicate(p[1].trim()))
        .collect::<Result<Vec<_>, _>>()?;

    if test == NodeTest::Current && !predicates.is_empty() {
        return Err("predicates are not supported on '.'".into());
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(body: &str) -> Result<Predicate, String> {
    if body == "last()" {
        return Ok(Predicate::Last);
    }
    if let Ok(position) = body.parse::<usize>() {
        if position == 0 {
            return Err("positions start at 1".into());
        }
        return Ok(Predicate::Position(position));
    }
    if let Some(c) = ATTR_EXISTS_RE.captures(body) {
        return Ok(Predicate::HasAttribute(c[1].to_string()));
    }
    if let Some(c) = ATTR_EQUALS_RE.captures(body) {
        let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
        return Ok(Predicate::AttributeEquals(c[1].to_string(), value.to_string()));
    }
    if let Some(c) = CHILD_EQUALS_RE.captures(body) {
        let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
        return Ok(Predicate::ChildTextEquals(c[1].to_string(), value.to_string()));
    }
    if let Some(c) = CHILD_EXISTS_RE.captures(body) {
        return Ok(Predicate::HasChild(c[1].to_string()));
    }
    Err(format!("unsupported predicate '[{}]'", body))
}

/// Value of the first node selected by `expression`.
pub fn try_resolve(node: &XmlNode, expression: &str) -> Result<Option<String>, PathResolutionError> {
    Ok(PathExpr::compile(expression)?.first_value(node))
}

/// One value per node selected by `expression`, in document order.
pub fn try_resolve_all(
    node: &XmlNode,
    expression: &str,
) -> Result<Vec<Option<String>>, PathResolutionError> {
    Ok(PathExpr::compile(expression)?.all_values(node))
}

/// Like [`try_resolve`]; a malformed expression is logged and yields `None`.
pub fn resolve(node: &XmlNode, expression: &str) -> Option<String> {
    try_resolve(node, expression).unwrap_or_else(|e| {
        log_warning(e.to_string());
        None
    })
}

/// Like [`try_resolve_all`]; a malformed expression is logged and yields no values.
pub fn resolve_all(node: &XmlNode, expression: &str) -> Vec<Option<String>> {
    try_resolve_all(node, expression).unwrap_or_else(|e| {
        log_warning(e.to_string());
        Vec::new()
    })
}
