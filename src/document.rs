//! Lenient multi-document YAML parsing.
//!
//! [`parse_documents`] splits a file's text on document separators and
//! parses every segment on its own, so a scan error in one document never
//! stops the documents after it. Each [`Document`] keeps the byte range of
//! its segment (for slicing verbatim text later), the line of every parsed
//! node, and the errors and warnings found while parsing it.
//!
//! Parsing is deliberately forgiving: duplicate keys are last-write-wins
//! with a warning, non-string keys are stringified, and unknown tags are
//! reported but otherwise ignored.

use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// A parse error or warning, positioned in the owning file (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YamlIssue {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// One parsed document of a multi-document file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Position among the non-blank documents of the file, from 0.
    pub index: usize,
    /// Structured content; `None` when the document failed to parse.
    pub content: Option<Value>,
    /// Byte range of the document inside the source text.
    pub range: Range<usize>,
    /// Line (1-based) on which the document's text starts.
    pub start_line: usize,
    pub errors: Vec<YamlIssue>,
    pub warnings: Vec<YamlIssue>,
    node_lines: Vec<(String, usize)>,
}

impl Document {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Verbatim slice of `source` covered by this document.
    ///
    /// `source` must be the text the document was parsed from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }

    /// Line (1-based) of the node at a JSON pointer such as `/metadata/name`.
    pub fn line_of(&self, pointer: &str) -> Option<usize> {
        self.node_lines
            .iter()
            .find(|(p, _)| p == pointer)
            .map(|(_, line)| *line)
    }

    pub fn kind(&self) -> Option<&str> {
        self.content.as_ref()?.get("kind")?.as_str()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.content.as_ref()?.get("apiVersion")?.as_str()
    }
}

const BOM: char = '\u{feff}';

/// Lazily parse every document in `source`.
///
/// The returned iterator is finite and cannot be restarted; call this
/// again to parse the same text twice.
pub fn parse_documents(source: &str) -> Documents<'_> {
    // ranges stay byte offsets into `source`, so the BOM is skipped, not removed
    let cursor = if source.starts_with(BOM) { BOM.len_utf8() } else { 0 };
    Documents {
        source,
        cursor,
        line: 1,
        index: 0,
        finished: false,
    }
}

/// Iterator over the documents of one text, see [`parse_documents`].
pub struct Documents<'a> {
    source: &'a str,
    cursor: usize,
    line: usize,
    index: usize,
    finished: bool,
}

struct Segment {
    range: Range<usize>,
    start_line: usize,
}

impl<'a> Documents<'a> {
    /// Cut the next separator-delimited segment off the source.
    fn next_segment(&mut self) -> Option<Segment> {
        if self.finished {
            return None;
        }

        let start = self.cursor;
        let start_line = self.line;
        let mut content_end: Option<usize> = None;
        let mut pos = start;
        let mut line = start_line;

        for raw in self.source[start..].split_inclusive('\n') {
            let line_start = pos;
            pos += raw.len();
            let body = raw.trim_end_matches(['\n', '\r']);

            if is_separator(body) {
                let rest = body[3..].trim_start();
                if rest.is_empty() || rest.starts_with('#') {
                    self.cursor = pos;
                    self.line = line + 1;
                } else {
                    // `--- {inline: content}` keeps its content in the next document
                    self.cursor = line_start + 3;
                    self.line = line;
                }
                return Some(Segment {
                    range: start..content_end.unwrap_or(line_start),
                    start_line,
                });
            }

            if content_end.is_none() && is_document_end(body) {
                content_end = Some(line_start);
            }
            line += 1;
        }

        self.finished = true;
        Some(Segment {
            range: start..content_end.unwrap_or(self.source.len()),
            start_line,
        })
    }
}

impl<'a> Iterator for Documents<'a> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            let segment = self.next_segment()?;
            let text = &self.source[segment.range.clone()];
            if is_blank(text) {
                continue;
            }

            let document = parse_segment(text, segment, self.index);
            self.index += 1;
            return Some(document);
        }
    }
}

fn is_separator(line: &str) -> bool {
    line.starts_with("---") && (line.len() == 3 || line[3..].starts_with([' ', '\t']))
}

fn is_document_end(line: &str) -> bool {
    line.starts_with("...") && line[3..].trim().is_empty()
}

/// Blank segments hold nothing but whitespace, comments and directives.
fn is_blank(text: &str) -> bool {
    text.lines().all(|l| {
        let t = l.trim();
        t.is_empty() || t.starts_with('#') || t.starts_with('%')
    })
}

fn parse_segment(text: &str, segment: Segment, index: usize) -> Document {
    let line_offset = segment.start_line - 1;
    let mut builder = ValueBuilder::new(line_offset);
    let mut parser = Parser::new_from_str(text);

    let mut errors = Vec::new();
    if let Err(e) = parser.load(&mut builder, false) {
        errors.push(YamlIssue {
            message: e.info().to_string(),
            line: line_offset + e.marker().line().max(1),
            column: e.marker().col() + 1,
        });
    }

    let (content, warnings, node_lines) = builder.finish();
    Document {
        index,
        content: if errors.is_empty() { content } else { None },
        range: segment.range,
        start_line: segment.start_line,
        errors,
        warnings,
        node_lines,
    }
}

// ============ Event → Value ============

enum Frame {
    Seq {
        items: Vec<Value>,
        anchor: usize,
        pointer: Option<String>,
    },
    Map {
        map: Map<String, Value>,
        /// Pending key with the line/column it was read at.
        key: Option<(String, usize, usize)>,
        anchor: usize,
        pointer: Option<String>,
    },
}

/// Builds a `serde_json::Value` from parser events.
struct ValueBuilder {
    line_offset: usize,
    stack: Vec<Frame>,
    root: Option<Value>,
    anchors: HashMap<usize, Value>,
    warnings: Vec<YamlIssue>,
    node_lines: Vec<(String, usize)>,
}

impl ValueBuilder {
    fn new(line_offset: usize) -> Self {
        Self {
            line_offset,
            stack: Vec::new(),
            root: None,
            anchors: HashMap::new(),
            warnings: Vec::new(),
            node_lines: Vec::new(),
        }
    }

    fn finish(self) -> (Option<Value>, Vec<YamlIssue>, Vec<(String, usize)>) {
        (self.root, self.warnings, self.node_lines)
    }

    fn line(&self, mark: &Marker) -> usize {
        self.line_offset + mark.line().max(1)
    }

    fn warn(&mut self, message: String, line: usize, column: usize) {
        self.warnings.push(YamlIssue {
            message,
            line,
            column,
        });
    }

    /// JSON pointer of the node about to start, `None` when it is a mapping key.
    fn child_pointer(&self) -> Option<String> {
        match self.stack.last() {
            None => Some(String::new()),
            Some(Frame::Seq { items, pointer, .. }) => {
                pointer.as_ref().map(|p| format!("{}/{}", p, items.len()))
            }
            Some(Frame::Map {
                key: Some((k, _, _)),
                pointer,
                ..
            }) => pointer.as_ref().map(|p| format!("{}/{}", p, escape_pointer(k))),
            Some(Frame::Map { key: None, .. }) => None,
        }
    }

    fn record(&mut self, pointer: &Option<String>, mark: &Marker) {
        if let Some(p) = pointer {
            let line = self.line(mark);
            self.node_lines.push((p.clone(), line));
        }
    }

    fn push(&mut self, value: Value, mark: &Marker) {
        let line = self.line(mark);
        let mut duplicate = None;

        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Frame::Seq { items, .. }) => items.push(value),
            Some(Frame::Map { map, key, .. }) => match key.take() {
                None => *key = Some((key_string(value), line, mark.col() + 1)),
                Some((k, key_line, key_col)) => {
                    if map.contains_key(&k) {
                        duplicate = Some((k.clone(), key_line, key_col));
                    }
                    map.insert(k, value);
                }
            },
        }

        if let Some((k, key_line, key_col)) = duplicate {
            self.warn(format!("duplicate key '{}'", k), key_line, key_col);
        }
    }

    fn close(&mut self, mark: &Marker) {
        let (value, anchor) = match self.stack.pop() {
            Some(Frame::Seq { items, anchor, .. }) => (Value::Array(items), anchor),
            Some(Frame::Map { map, anchor, .. }) => (Value::Object(map), anchor),
            None => return,
        };
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        self.push(value, mark);
    }

    fn check_tag(&mut self, tag: Option<&Tag>, mark: &Marker) {
        if let Some(tag) = tag {
            if !is_core_tag(tag) {
                let line = self.line(mark);
                self.warn(
                    format!("unresolved tag {}{}", tag.handle, tag.suffix),
                    line,
                    mark.col() + 1,
                );
            }
        }
    }

    fn scalar(&mut self, raw: String, style: TScalarStyle, tag: Option<&Tag>, mark: &Marker) -> Value {
        self.check_tag(tag, mark);
        if let Some(tag) = tag.filter(|t| is_core_tag(t)) {
            match tag.suffix.as_str() {
                "str" => return Value::String(raw),
                "null" => return Value::Null,
                _ => return resolve_plain(&raw),
            }
        }
        if matches!(style, TScalarStyle::Plain) {
            resolve_plain(&raw)
        } else {
            Value::String(raw)
        }
    }
}

impl MarkedEventReceiver for ValueBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        match ev {
            Event::Scalar(raw, style, anchor, tag) => {
                let pointer = self.child_pointer();
                self.record(&pointer, &mark);
                let value = self.scalar(raw, style, tag.as_ref(), &mark);
                if anchor > 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.push(value, &mark);
            }
            Event::SequenceStart(anchor, tag) => {
                self.check_tag(tag.as_ref(), &mark);
                let pointer = self.child_pointer();
                self.record(&pointer, &mark);
                self.stack.push(Frame::Seq {
                    items: Vec::new(),
                    anchor,
                    pointer,
                });
            }
            Event::MappingStart(anchor, tag) => {
                self.check_tag(tag.as_ref(), &mark);
                let pointer = self.child_pointer();
                self.record(&pointer, &mark);
                self.stack.push(Frame::Map {
                    map: Map::new(),
                    key: None,
                    anchor,
                    pointer,
                });
            }
            Event::SequenceEnd | Event::MappingEnd => self.close(&mark),
            Event::Alias(id) => {
                let pointer = self.child_pointer();
                self.record(&pointer, &mark);
                let value = match self.anchors.get(&id) {
                    Some(v) => v.clone(),
                    None => {
                        let line = self.line(&mark);
                        self.warn("unknown alias".to_string(), line, mark.col() + 1);
                        Value::Null
                    }
                };
                self.push(value, &mark);
            }
            _ => {}
        }
    }
}

fn is_core_tag(tag: &Tag) -> bool {
    tag.handle == "tag:yaml.org,2002:" || tag.handle == "!!"
}

fn key_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Resolve an untagged plain scalar with the YAML 1.2 core schema.
fn resolve_plain(raw: &str) -> Value {
    match raw {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::Bool(true),
        "false" | "False" | "FALSE" => return Value::Bool(false),
        _ => {}
    }

    if let Some(n) = parse_int(raw) {
        return Value::Number(n.into());
    }

    let looks_numeric = raw
        .trim_start_matches(['+', '-'])
        .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if looks_numeric {
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }

    Value::String(raw.to_string())
}

fn parse_int(raw: &str) -> Option<i64> {
    if let Some(hex) = raw.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(oct) = raw.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8).ok();
    }
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_multi_document_ranges_slice_verbatim_text() {
        let src = "apiVersion: v1\nkind: ConfigMap\n---\napiVersion: v1\nkind: Secret\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text(src), "apiVersion: v1\nkind: ConfigMap\n");
        assert_eq!(docs[1].text(src), "apiVersion: v1\nkind: Secret\n");
        assert_eq!(docs[1].kind(), Some("Secret"));
        assert_eq!(docs[1].start_line, 4);
        assert_eq!(docs[1].index, 1);
    }

    #[test]
    fn test_malformed_document_does_not_stop_later_ones() {
        let src = "kind: A\napiVersion: v1\n---\na: b: c\n---\nkind: C\napiVersion: v1\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 3);
        assert!(!docs[0].has_errors());
        assert!(docs[1].has_errors());
        assert!(docs[1].content.is_none());
        assert_eq!(docs[1].errors[0].line, 4);
        assert_eq!(docs[2].kind(), Some("C"));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins_with_warning() {
        let src = "kind: A\nkind: B\n";
        let doc = parse_documents(src).next().unwrap();
        assert!(!doc.has_errors());
        assert_eq!(doc.kind(), Some("B"));
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].message.contains("duplicate key 'kind'"));
        assert_eq!(doc.warnings[0].line, 2);
    }

    #[test]
    fn test_node_lines_are_absolute() {
        let src = "a: 1\n---\nkind: Service\nmetadata:\n  name: web\n  labels:\n    - x\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        let doc = &docs[1];
        assert_eq!(doc.line_of("/kind"), Some(3));
        assert_eq!(doc.line_of("/metadata/name"), Some(5));
        assert_eq!(doc.line_of("/metadata/labels/0"), Some(7));
        assert_eq!(doc.line_of("/missing"), None);
    }

    #[test]
    fn test_empty_and_comment_only_text_has_no_documents() {
        assert_eq!(parse_documents("").count(), 0);
        assert_eq!(parse_documents("# just a comment\n\n").count(), 0);
        assert_eq!(parse_documents("---\n---\n").count(), 0);
    }

    #[test]
    fn test_leading_separator_and_directive_preamble() {
        let src = "%YAML 1.2\n---\nkind: A\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].index, 0);
        assert_eq!(docs[0].text(src), "kind: A\n");
        assert_eq!(docs[0].start_line, 3);
    }

    #[test]
    fn test_byte_order_mark_before_leading_separator() {
        let src = "\u{feff}---\napiVersion: v1\nkind: A\n---\nkind: B\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text(src), "apiVersion: v1\nkind: A\n");
        assert_eq!(docs[0].start_line, 2);
        assert_eq!(docs[0].kind(), Some("A"));
        assert_eq!(docs[1].kind(), Some("B"));
    }

    #[test]
    fn test_document_end_marker_truncates_content() {
        let src = "kind: A\n...\ngarbage that is ignored\n---\nkind: B\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text(src), "kind: A\n");
        assert_eq!(docs[1].kind(), Some("B"));
    }

    #[test]
    fn test_separator_with_trailing_comment() {
        let src = "kind: A\n--- # next\nkind: B\n";
        let docs: Vec<Document> = parse_documents(src).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text(src), "kind: B\n");
    }

    #[test]
    fn test_scalar_resolution() {
        let src = "i: 42\nneg: -7\nf: 1.5\nb: true\nn: ~\ne:\nq: \"42\"\ns: '1.0'\nv: v1\nt: !!str 12\n";
        let doc = parse_documents(src).next().unwrap();
        assert_eq!(
            doc.content.unwrap(),
            json!({
                "i": 42, "neg": -7, "f": 1.5, "b": true, "n": null, "e": null,
                "q": "42", "s": "1.0", "v": "v1", "t": "12"
            })
        );
    }

    #[test]
    fn test_anchors_aliases_and_unknown_tags() {
        let src = "base: &b\n  x: 1\ncopy: *b\nref: !Ref thing\n";
        let doc = parse_documents(src).next().unwrap();
        let content = doc.content.unwrap();
        assert_eq!(content["copy"], json!({"x": 1}));
        assert_eq!(content["ref"], "thing");
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].message.contains("unresolved tag"));
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let src = "1: one\ntrue: yes\n";
        let doc = parse_documents(src).next().unwrap();
        let content = doc.content.unwrap();
        assert_eq!(content["1"], "one");
        assert_eq!(content["true"], "yes");
    }

    #[test]
    fn test_scalar_document_parses_as_plain_value() {
        let doc = parse_documents("just a string\n").next().unwrap();
        assert_eq!(doc.content, Some(json!("just a string")));
        assert!(doc.kind().is_none());
    }
}
