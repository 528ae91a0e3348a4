//! XPath extraction over XML bodies
//!
//! Bodies are parsed with quick-xml into a small element tree and queried
//! with an XPath subset:
//!
//! - absolute `/a/b`, descendant `//b`, relative `a/b` (from the document)
//! - name tests, `*`, namespace-prefixed names (`soap:Body`, also matched by `Body`)
//! - `@attr`, `text()`, `.`
//! - predicates `[n]`, `[last()]`, `[@a]`, `[@a='v']`, `[child='v']`
//!
//! The first match's string value is returned.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone)]
enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Content>,
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    /// Pre-order descendants, excluding self
    fn descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.elements() {
            out.push(child);
            child.descendants(out);
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| name_matches(k, name))
            .map(|(_, v)| v.as_str())
    }

    fn direct_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    /// XPath string value: all descendant text in document order
    fn string_value(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Content::Text(t) => out.push_str(t),
                Content::Element(e) => e.collect_text(out),
            }
        }
    }
}

/// `soap:Body` matches the test `soap:Body` and the unprefixed `Body`
fn name_matches(actual: &str, test: &str) -> bool {
    if actual == test {
        return true;
    }
    !test.contains(':') && actual.rsplit_once(':').is_some_and(|(_, local)| local == test)
}

fn start_element(e: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let attributes = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = unescape(&String::from_utf8_lossy(&attr.value));
            (key, value)
        })
        .collect();
    Element {
        name,
        attributes,
        children: Vec::new(),
    }
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Predefined XML entities plus decimal and hex character references
fn resolve_reference(name: &str) -> Option<String> {
    let resolved = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => name.strip_prefix('#')?.parse().ok()?,
            };
            char::from_u32(code)?
        }
    };
    Some(resolved.to_string())
}

/// Move accumulated character data into `parent` as one text node
fn flush_text(pending: &mut String, parent: Option<&mut Element>) {
    let text = pending.trim();
    if let (Some(parent), false) = (parent, text.is_empty()) {
        parent.children.push(Content::Text(text.to_string()));
    }
    pending.clear();
}

/// Parse a document into a synthetic document node whose only child is the root
///
/// Text, references and CDATA between two tags form a single text node, trimmed
/// only at its ends.
fn parse_document(xml: &str) -> Option<Element> {
    let mut reader = Reader::from_str(xml);

    let mut document = Element::default();
    let mut stack: Vec<Element> = Vec::new();
    let mut pending = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                flush_text(&mut pending, stack.last_mut());
                stack.push(start_element(e));
            }
            Ok(Event::End(_)) => {
                flush_text(&mut pending, stack.last_mut());
                let element = stack.pop()?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Content::Element(element)),
                    None => document.children.push(Content::Element(element)),
                }
            }
            Ok(Event::Empty(ref e)) => {
                flush_text(&mut pending, stack.last_mut());
                let element = start_element(e);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Content::Element(element)),
                    None => document.children.push(Content::Element(element)),
                }
            }
            Ok(Event::Text(ref e)) => pending.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::GeneralRef(ref e)) => {
                let name = String::from_utf8_lossy(e);
                match resolve_reference(&name) {
                    Some(resolved) => pending.push_str(&resolved),
                    None => tracing::debug!(entity = %name, "unresolved xml entity"),
                }
            }
            Ok(Event::CData(ref e)) => pending.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    if !stack.is_empty() || document.elements().next().is_none() {
        return None;
    }
    Some(document)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    Attribute(String),
    Text,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttribute(String),
    AttributeEquals(String, String),
    ChildEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

fn parse_xpath(path: &str) -> Option<Vec<Step>> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let mut steps = Vec::new();
    let mut rest = path;
    let mut axis = Axis::Child;

    loop {
        if let Some(r) = rest.strip_prefix("//") {
            axis = Axis::Descendant;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        }
        if rest.is_empty() {
            break;
        }

        let end = step_end(rest);
        let (raw, tail) = rest.split_at(end);
        steps.push(parse_step(raw, axis)?);
        rest = tail;
        axis = Axis::Child;
    }

    if steps.is_empty() { None } else { Some(steps) }
}

/// Index of the next `/` outside brackets and quotes
fn step_end(s: &str) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

fn parse_step(raw: &str, axis: Axis) -> Option<Step> {
    let (head, mut rest) = match raw.find('[') {
        Some(i) => raw.split_at(i),
        None => (raw, ""),
    };
    let head = head.trim();

    let test = match head {
        "" => return None,
        "*" => NodeTest::Any,
        "." => NodeTest::SelfNode,
        "text()" => NodeTest::Text,
        h if h.starts_with('@') => NodeTest::Attribute(h[1..].to_string()),
        h => NodeTest::Name(h.to_string()),
    };

    let mut predicates = Vec::new();
    while let Some(r) = rest.strip_prefix('[') {
        let close = r.find(']')?;
        predicates.push(parse_predicate(r[..close].trim())?);
        rest = &r[close + 1..];
    }
    if !rest.trim().is_empty() {
        return None;
    }

    Some(Step { axis, test, predicates })
}

fn parse_predicate(p: &str) -> Option<Predicate> {
    if p == "last()" {
        return Some(Predicate::Last);
    }
    if let Ok(n) = p.parse::<usize>() {
        return (n > 0).then_some(Predicate::Position(n));
    }

    match p.split_once('=') {
        Some((lhs, rhs)) => {
            let value = unquote(rhs.trim())?;
            let lhs = lhs.trim();
            match lhs.strip_prefix('@') {
                Some(attr) => Some(Predicate::AttributeEquals(attr.to_string(), value)),
                None => Some(Predicate::ChildEquals(lhs.to_string(), value)),
            }
        }
        None => p
            .strip_prefix('@')
            .map(|attr| Predicate::HasAttribute(attr.to_string())),
    }
}

fn unquote(s: &str) -> Option<String> {
    let first = s.chars().next()?;
    if (first == '\'' || first == '"') && s.len() >= 2 && s.ends_with(first) {
        Some(s[1..s.len() - 1].to_string())
    } else {
        None
    }
}

fn apply_predicates<'a>(mut nodes: Vec<&'a Element>, predicates: &[Predicate]) -> Vec<&'a Element> {
    for predicate in predicates {
        nodes = match predicate {
            Predicate::Position(n) => nodes.get(n - 1).copied().into_iter().collect(),
            Predicate::Last => nodes.last().copied().into_iter().collect(),
            Predicate::HasAttribute(a) => {
                nodes.into_iter().filter(|e| e.attribute(a).is_some()).collect()
            }
            Predicate::AttributeEquals(a, v) => nodes
                .into_iter()
                .filter(|e| e.attribute(a) == Some(v.as_str()))
                .collect(),
            Predicate::ChildEquals(c, v) => nodes
                .into_iter()
                .filter(|e| {
                    e.elements()
                        .any(|child| name_matches(&child.name, c) && child.string_value() == *v)
                })
                .collect(),
        };
    }
    nodes
}

/// Evaluate `steps`, returning the string value of every match in order
fn evaluate(document: &Element, steps: &[Step]) -> Vec<String> {
    let mut context: Vec<&Element> = vec![document];

    for (i, step) in steps.iter().enumerate() {
        let is_last = i + 1 == steps.len();

        match &step.test {
            NodeTest::Attribute(name) => {
                if !is_last {
                    return Vec::new();
                }
                let mut values = Vec::new();
                for node in context.iter().copied() {
                    let mut scope = vec![node];
                    if step.axis == Axis::Descendant {
                        node.descendants(&mut scope);
                    }
                    values.extend(
                        scope.iter().filter_map(|e| e.attribute(name)).map(str::to_string),
                    );
                }
                return values;
            }
            NodeTest::Text => {
                if !is_last {
                    return Vec::new();
                }
                let mut values = Vec::new();
                for node in context.iter().copied() {
                    let mut scope = vec![node];
                    if step.axis == Axis::Descendant {
                        node.descendants(&mut scope);
                    }
                    values.extend(scope.iter().map(|e| e.direct_text()).filter(|t| !t.is_empty()));
                }
                return values;
            }
            NodeTest::SelfNode => {
                if step.axis == Axis::Descendant {
                    let mut expanded = Vec::new();
                    for node in context.iter().copied() {
                        expanded.push(node);
                        node.descendants(&mut expanded);
                    }
                    context = expanded;
                }
                context = apply_predicates(context, &step.predicates);
            }
            test => {
                let mut next = Vec::new();
                for node in context.iter().copied() {
                    let candidates: Vec<&Element> = match step.axis {
                        Axis::Child => node.elements().collect(),
                        Axis::Descendant => {
                            let mut all = Vec::new();
                            node.descendants(&mut all);
                            all
                        }
                    };
                    let matched: Vec<&Element> = candidates
                        .into_iter()
                        .filter(|e| match test {
                            NodeTest::Name(n) => name_matches(&e.name, n),
                            _ => true,
                        })
                        .collect();
                    next.extend(apply_predicates(matched, &step.predicates));
                }
                context = next;
            }
        }

        if context.is_empty() {
            return Vec::new();
        }
    }

    context.iter().map(|e| e.string_value()).collect()
}

/// First XPath match in `body`, or `None` when the body or path is unusable
pub fn extract_xml(body: &str, path: &str) -> Option<String> {
    let document = parse_document(body)?;
    let steps = parse_xpath(path)?;
    evaluate(&document, &steps).into_iter().next()
}
