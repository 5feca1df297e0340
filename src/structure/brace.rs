//! Declaration scanner for brace-delimited languages.
//!
//! Not a parser: comments and string literals are blanked, then braces,
//! parentheses and semicolons are tracked to find class, method, field and
//! local variable declarations. Good enough for Java-like sources, and the
//! rest of the crate only sees the `StructuralModel` trait.
//!
//! Keys:
//! - class: `pkg.Outer.Inner`
//! - method: `pkg.Outer#name(int,String)`
//! - attribute: `pkg.Outer#name`
//! - local variable: `pkg.Outer#name(int)$var`, `$var@2` for a redeclaration

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    Counterpart, Declaration, Relation, SourceSnapshot, StructuralModel, containment,
    normalize_code, similarity,
};
use crate::models::ElementKind;

const EXTENSIONS: &[&str] = &[
    "java", "cs", "kt", "kts", "scala", "groovy", "ts", "tsx", "js", "jsx",
];

/// File-scoped languages without a package declaration.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Words that start statements, never declarations.
const STATEMENT_KEYWORDS: &[&str] = &[
    "return", "throw", "if", "for", "while", "switch", "case", "yield", "break", "continue",
    "else", "do", "try", "catch", "finally", "assert", "new", "super", "this", "synchronized",
    "default", "goto", "import", "package", "await", "delete", "typeof",
];

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s@])(class|interface|enum|record|object|trait)\s+([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@[\w$.]+(?:\s*\([^)]*\))?\s*").expect("valid regex"));

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").expect("valid regex"));

static TYPE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w$.<>,?\[\]]+$").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Minimum body similarity for a renamed or moved declaration
    pub similarity_threshold: f64,
    /// Minimum share of lines for extract/inline detection
    pub containment_threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            containment_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BraceModel {
    config: ModelConfig,
}

impl BraceModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Score an orphaned old declaration as a counterpart of `target`.
    fn score(&self, old: &Declaration, target: &Declaration) -> Option<f64> {
        if old.kind == ElementKind::Class {
            let ratio = similarity(&old.members, &target.members);
            let same_name = old.name == target.name;
            return (same_name || ratio >= self.config.similarity_threshold)
                .then_some(if same_name { 0.5 + 0.5 * ratio } else { ratio });
        }

        let body_equal = !old.significant_body().is_empty() && old.body == target.body;
        if body_equal {
            return Some(1.0);
        }

        let ratio = similarity(&old.body, &target.body);
        let same_name = old.name == target.name;
        let same_container = old.container == target.container;
        let same_shape = old.signature_shape() == target.signature_shape();

        if same_name && (same_container || (old.kind == ElementKind::Variable && same_shape)) {
            Some(0.5 + 0.5 * ratio)
        } else if ratio >= self.config.similarity_threshold && !target.body.is_empty() {
            Some(ratio)
        } else {
            None
        }
    }

    /// Vanished old methods whose lines were absorbed into `target`.
    fn absorbed(
        &self,
        old: &SourceSnapshot<'_>,
        new_keys: &HashSet<&str>,
        previous: &Declaration,
        target: &Declaration,
    ) -> Vec<Declaration> {
        let before = previous.significant_body();
        let after = target.significant_body();
        let mut remaining: HashMap<&str, usize> = HashMap::new();
        for line in &after {
            *remaining.entry(*line).or_default() += 1;
        }
        for line in &before {
            if let Some(n) = remaining.get_mut(line) {
                *n = n.saturating_sub(1);
            }
        }
        let added: Vec<&str> = after
            .iter()
            .copied()
            .filter(|line| remaining.get(line).is_some_and(|n| *n > 0))
            .collect();
        if added.is_empty() {
            return Vec::new();
        }

        old.declarations
            .iter()
            .filter(|d| d.kind == ElementKind::Method && d.key != previous.key)
            .filter(|d| !new_keys.contains(d.key.as_str()))
            .filter(|d| {
                let body = d.significant_body();
                !body.is_empty() && containment(&body, &added) >= self.config.containment_threshold
            })
            .cloned()
            .collect()
    }
}

impl StructuralModel for BraceModel {
    fn supports(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext))
    }

    fn declarations(&self, path: &str, source: &str) -> Result<Vec<Declaration>, String> {
        Scanner::new(path, source).run()
    }

    fn counterparts(
        &self,
        old: &SourceSnapshot<'_>,
        new: &SourceSnapshot<'_>,
        successor: Option<&SourceSnapshot<'_>>,
        target: &Declaration,
    ) -> Vec<Counterpart> {
        let new_keys: HashSet<&str> = new.declarations.iter().map(|d| d.key.as_str()).collect();
        let same_file = old.path == new.path;
        // Keys that still exist in the old file after the commit. Those
        // declarations continue their own history; a copy elsewhere is new.
        let surviving: HashMap<&str, &Declaration> = match successor {
            Some(s) => s.declarations.iter().map(|d| (d.key.as_str(), d)).collect(),
            None => HashMap::new(),
        };
        let same_kind = old.declarations.iter().filter(|d| d.kind == target.kind);

        if let Some(exact) = old
            .declarations
            .iter()
            .filter(|d| same_file || !surviving.contains_key(d.key.as_str()))
            .find(|d| d.kind == target.kind && d.key == target.key)
        {
            let absorbed = if target.kind == ElementKind::Method && exact.body != target.body {
                self.absorbed(old, &new_keys, exact, target)
            } else {
                Vec::new()
            };
            return vec![Counterpart {
                declaration: exact.clone(),
                similarity: 1.0,
                relation: Relation::Correspondent,
                absorbed,
            }];
        }

        let mut found: Vec<Counterpart> = same_kind
            .filter(|d| !surviving.contains_key(d.key.as_str()))
            .filter_map(|d| {
                self.score(d, target).map(|similarity| Counterpart {
                    declaration: d.clone(),
                    similarity,
                    relation: Relation::Correspondent,
                    absorbed: Vec::new(),
                })
            })
            .collect();

        if found.is_empty() && target.kind == ElementKind::Method {
            let extracted = target.significant_body();
            if !extracted.is_empty() {
                found = old
                    .declarations
                    .iter()
                    .filter(|d| d.kind == ElementKind::Method)
                    .filter_map(|d| {
                        // The source must have given the lines up, otherwise
                        // the new method is a copy.
                        let now = surviving.get(d.key.as_str())?;
                        let kept = containment(&extracted, &now.significant_body());
                        if kept >= self.config.containment_threshold {
                            return None;
                        }
                        let ratio = containment(&extracted, &d.significant_body());
                        (ratio >= self.config.containment_threshold).then(|| Counterpart {
                            declaration: d.clone(),
                            similarity: ratio,
                            relation: Relation::ExtractedFrom,
                            absorbed: Vec::new(),
                        })
                    })
                    .collect();
            }
        }

        found.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        found
    }
}

enum ScopeKind {
    Class { key: String },
    Method { key: String, seen: HashMap<String, u32> },
    Block,
}

struct Scope {
    kind: ScopeKind,
    decl: Option<usize>,
    open: usize,
    /// Statement text interrupted by this block (lambda, anonymous class,
    /// array initializer), restored when the block closes.
    saved: Option<PendingHeader>,
}

#[derive(Default, Clone)]
struct PendingHeader {
    text: String,
    line: Option<u32>,
    offset: Option<usize>,
    parens: i32,
}

enum Opening {
    Class(String),
    Method { name: String, params: String },
    Block,
}

struct Scanner<'a> {
    path: &'a str,
    /// Source with comments blanked
    code: Vec<char>,
    /// Source with comments and literal contents blanked
    structural: Vec<char>,
    decls: Vec<Declaration>,
    scopes: Vec<Scope>,
    header: PendingHeader,
    package: String,
    line: u32,
}

impl<'a> Scanner<'a> {
    fn new(path: &'a str, source: &str) -> Self {
        let (code, structural) = mask(source);
        Self {
            path,
            code,
            structural,
            decls: Vec::new(),
            scopes: Vec::new(),
            header: PendingHeader::default(),
            package: String::new(),
            line: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Declaration>, String> {
        for i in 0..self.structural.len() {
            let c = self.structural[i];
            match c {
                '\n' => {
                    self.push_header(' ', i);
                    self.line += 1;
                }
                '{' => self.open(i),
                '}' => self.close(i)?,
                ';' if self.header.parens <= 0 => self.terminate(i),
                _ => {
                    if c == '(' {
                        self.header.parens += 1;
                    } else if c == ')' {
                        self.header.parens -= 1;
                    }
                    self.push_header(c, i);
                }
            }
        }

        if let Some(scope) = self.scopes.last() {
            let opened = self.line_of(scope.open);
            return Err(format!("unclosed '{{' opened on line {}", opened));
        }

        self.fill_members();
        Ok(self.decls)
    }

    fn line_of(&self, offset: usize) -> u32 {
        1 + self.structural[..offset].iter().filter(|c| **c == '\n').count() as u32
    }

    fn push_header(&mut self, c: char, offset: usize) {
        if c.is_whitespace() {
            if !self.header.text.is_empty() {
                self.header.text.push(' ');
            }
        } else {
            if self.header.text.is_empty() {
                self.header.line = Some(self.line);
                self.header.offset = Some(offset);
            }
            self.header.text.push(c);
        }
    }

    fn take_header(&mut self) -> PendingHeader {
        std::mem::take(&mut self.header)
    }

    fn in_block(&self) -> bool {
        matches!(
            self.scopes.last().map(|s| &s.kind),
            Some(ScopeKind::Block) | Some(ScopeKind::Method { .. })
        )
    }

    fn enclosing_class(&self) -> Option<&str> {
        self.scopes.iter().rev().find_map(|s| match &s.kind {
            ScopeKind::Class { key } => Some(key.as_str()),
            _ => None,
        })
    }

    /// Container of top-level functions: the package, else the file path
    /// without its extension, which keeps keys unique within a revision.
    fn module(&self) -> String {
        if !self.package.is_empty() {
            return self.package.clone();
        }
        Path::new(self.path)
            .with_extension("")
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Container of top-level classes. Script files have no package and two
    /// of them may declare the same class name, so they use the module.
    fn top_level(&self) -> String {
        let scripted = Path::new(self.path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext));
        if scripted { self.module() } else { self.package.clone() }
    }

    fn classify(&self, header: &str) -> Opening {
        if self.in_block() {
            return Opening::Block;
        }
        let is_anonymous =
            header.starts_with("new ") || header.contains(" new ") || header.contains("=new ");
        if !is_anonymous {
            let type_name = TYPE_DECL_RE
                .captures_iter(header)
                .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
                .find(|name| !matches!(*name, "class" | "interface" | "enum" | "record" | "object" | "trait"));
            if let Some(name) = type_name {
                return Opening::Class(name.to_string());
            }
            if let Some((name, params)) = method_head(header) {
                return Opening::Method { name, params };
            }
        }
        Opening::Block
    }

    fn open(&mut self, offset: usize) {
        let header = self.take_header();
        let text = normalize_code(&header.text);
        let start_line = header.line.unwrap_or(self.line);

        let (kind, decl) = match self.classify(&text) {
            Opening::Class(name) => {
                let container = match self.enclosing_class() {
                    Some(outer) => outer.to_string(),
                    None => self.top_level(),
                };
                let key = if container.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", container, name)
                };
                self.decls.push(Declaration {
                    kind: ElementKind::Class,
                    key: key.clone(),
                    name,
                    container,
                    signature: text,
                    body: Vec::new(),
                    members: Vec::new(),
                    start_line,
                    end_line: self.line,
                });
                (ScopeKind::Class { key }, Some(self.decls.len() - 1))
            }
            Opening::Method { name, params } => {
                let container = match self.enclosing_class() {
                    Some(class) => class.to_string(),
                    None => self.module(),
                };
                let key = format!("{}#{}({})", container, name, params);
                self.decls.push(Declaration {
                    kind: ElementKind::Method,
                    key: key.clone(),
                    name,
                    container,
                    signature: text,
                    body: Vec::new(),
                    members: Vec::new(),
                    start_line,
                    end_line: self.line,
                });
                (
                    ScopeKind::Method {
                        key,
                        seen: HashMap::new(),
                    },
                    Some(self.decls.len() - 1),
                )
            }
            Opening::Block => {
                let saved = continues_statement(&text, header.parens).then_some(header);
                self.scopes.push(Scope {
                    kind: ScopeKind::Block,
                    decl: None,
                    open: offset,
                    saved,
                });
                return;
            }
        };

        self.scopes.push(Scope {
            kind,
            decl,
            open: offset,
            saved: None,
        });
    }

    fn close(&mut self, offset: usize) -> Result<(), String> {
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| format!("unexpected '}}' on line {}", self.line))?;

        if let Some(idx) = scope.decl {
            let body = if matches!(scope.kind, ScopeKind::Method { .. }) {
                body_lines(&self.code[scope.open + 1..offset])
            } else {
                Vec::new()
            };
            let decl = &mut self.decls[idx];
            decl.end_line = self.line;
            decl.body = body;
        }

        match scope.saved {
            Some(mut saved) => {
                saved.text.push_str(" {}");
                self.header = saved;
            }
            None => self.header = PendingHeader::default(),
        }
        Ok(())
    }

    fn terminate(&mut self, offset: usize) {
        let header = self.take_header();
        let text = normalize_code(&header.text);
        if text.is_empty() {
            return;
        }
        let start_line = header.line.unwrap_or(self.line);
        let raw = header
            .offset
            .map(|from| self.code[from..offset].iter().collect::<String>())
            .unwrap_or_default();

        if self.scopes.is_empty() {
            if let Some(package) = text.strip_prefix("package ") {
                self.package = package.trim().to_string();
            }
            return;
        }

        let innermost_class = match self.scopes.last().map(|s| &s.kind) {
            Some(ScopeKind::Class { key }) => Some(key.clone()),
            _ => None,
        };

        if let Some(class) = innermost_class {
            if let Some((name, params)) = method_head(&text) {
                self.decls.push(Declaration {
                    kind: ElementKind::Method,
                    key: format!("{}#{}({})", class, name, params),
                    name,
                    container: class,
                    signature: text,
                    body: Vec::new(),
                    members: Vec::new(),
                    start_line,
                    end_line: self.line,
                });
            } else if let Some((name, signature, init)) = split_declaration(&raw, false) {
                self.decls.push(Declaration {
                    kind: ElementKind::Attribute,
                    key: format!("{}#{}", class, name),
                    name,
                    container: class,
                    signature,
                    body: init.into_iter().collect(),
                    members: Vec::new(),
                    start_line,
                    end_line: self.line,
                });
            }
            return;
        }

        let Some((name, signature, init)) = split_declaration(&raw, true) else {
            return;
        };
        // Statements inside class-level blocks (initializers) are not tracked.
        let method = self.scopes.iter_mut().rev().find_map(|s| match &mut s.kind {
            ScopeKind::Method { key, seen } => Some((key.clone(), seen)),
            _ => None,
        });
        let Some((method_key, seen)) = method else {
            return;
        };

        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        let key = if *count == 1 {
            format!("{}${}", method_key, name)
        } else {
            format!("{}${}@{}", method_key, name, count)
        };

        self.decls.push(Declaration {
            kind: ElementKind::Variable,
            key,
            name,
            container: method_key,
            signature,
            body: init.into_iter().collect(),
            members: Vec::new(),
            start_line,
            end_line: self.line,
        });
    }

    fn fill_members(&mut self) {
        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        for decl in &self.decls {
            let member = match decl.kind {
                ElementKind::Method => decl.key.rsplit_once('#').map(|(_, m)| m.to_string()),
                ElementKind::Attribute => Some(decl.name.clone()),
                _ => None,
            };
            if let Some(member) = member {
                members.entry(decl.container.clone()).or_default().push(member);
            }
        }
        for decl in self.decls.iter_mut().filter(|d| d.kind == ElementKind::Class) {
            if let Some(mut list) = members.remove(&decl.key) {
                list.sort();
                decl.members = list;
            }
        }
    }
}

/// Blank comments in one copy of the source, and comments plus literal
/// contents in another. Offsets and newlines are preserved.
fn mask(source: &str) -> (Vec<char>, Vec<char>) {
    let chars: Vec<char> = source.chars().collect();
    let mut code = chars.clone();
    let mut structural = chars.clone();
    let blank = |buf: &mut Vec<char>, i: usize| {
        if buf[i] != '\n' {
            buf[i] = ' ';
        }
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                blank(&mut code, i);
                blank(&mut structural, i);
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            let start = i;
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            let end = (i + 2).min(chars.len());
            for j in start..end {
                blank(&mut code, j);
                blank(&mut structural, j);
            }
            i = end;
        } else if matches!(c, '"' | '\'' | '`') {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\n' && c != '`' {
                    break;
                }
                if chars[i] == '\\' && i + 1 < chars.len() {
                    blank(&mut structural, i);
                    blank(&mut structural, i + 1);
                    i += 2;
                    continue;
                }
                blank(&mut structural, i);
                i += 1;
            }
            i += 1;
        } else {
            i += 1;
        }
    }

    (code, structural)
}

fn body_lines(chars: &[char]) -> Vec<String> {
    chars
        .iter()
        .collect::<String>()
        .lines()
        .map(normalize_code)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Whether a block opened after `header` is part of an unfinished statement
/// (lambda body, anonymous class, array initializer) rather than a statement
/// of its own.
fn continues_statement(header: &str, parens: i32) -> bool {
    parens > 0
        || header.ends_with('=')
        || header.ends_with("->")
        || header.ends_with("=>")
        || header.ends_with(',')
        || header.ends_with('(')
        || header.ends_with(']')
        || header.starts_with("new ")
        || header.contains("=new ")
        || header.contains(" new ")
        || header.contains("(new ")
        || header.starts_with("return ")
}

/// `(name, normalized parameter types)` when `header` declares a callable.
fn method_head(header: &str) -> Option<(String, String)> {
    let stripped = ANNOTATION_RE.replace_all(header, "");
    let stripped = stripped.trim();
    let first_word = stripped.split([' ', '(']).next().unwrap_or("");
    if STATEMENT_KEYWORDS.contains(&first_word) {
        return None;
    }

    let open = stripped.find('(')?;
    let before = &stripped[..open];
    if before.contains('=') || before.contains('.') {
        return None;
    }
    let name = before.trim_end().rsplit([' ', '<', '>']).next()?.to_string();
    if !IDENT_RE.is_match(&name) || STATEMENT_KEYWORDS.contains(&name.as_str()) {
        return None;
    }

    let mut depth = 0;
    let mut close = None;
    for (idx, c) in stripped[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let params = &stripped[open + 1..close?];
    Some((name, parameter_types(params)))
}

fn parameter_types(params: &str) -> String {
    split_top_level(params, ',')
        .into_iter()
        .map(|param| {
            let param = ANNOTATION_RE.replace_all(param, "");
            let param = param.trim().trim_start_matches("final ").trim();
            if let Some((_, ty)) = param.split_once(':') {
                return normalize_code(ty.split('=').next().unwrap_or(ty));
            }
            match param.rsplit_once(' ') {
                Some((ty, _name)) => normalize_code(ty),
                None => normalize_code(param),
            }
        })
        .filter(|ty| !ty.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '<' | '[' | '{' => depth += 1,
            ')' | '>' | ']' | '}' => depth -= 1,
            _ if c == separator && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `(name, signature, initializer)` of a field or local variable declaration.
/// `local` applies the stricter checks needed inside method bodies.
fn split_declaration(raw: &str, local: bool) -> Option<(String, String, Option<String>)> {
    let text = ANNOTATION_RE.replace_all(raw, "");
    let (left, init) = match find_assignment(&text) {
        Some(idx) => (&text[..idx], Some(normalize_code(&text[idx + 1..]))),
        None => (&text[..], None),
    };
    let left = split_top_level(left, ',').into_iter().next()?.trim();
    let normalized = normalize_code(left);

    let (name, type_tokens): (&str, Vec<&str>) = match left.split_once(':') {
        Some((names, ty)) => {
            let mut words: Vec<&str> = names.split_whitespace().collect();
            let name = words.pop()?;
            words.push(ty.trim());
            (name, words)
        }
        None => {
            let mut words: Vec<&str> = left.split_whitespace().collect();
            let name = words.pop()?;
            (name, words)
        }
    };
    let name = name.trim_end_matches("[]");

    if type_tokens.is_empty() || !IDENT_RE.is_match(name) {
        return None;
    }
    if STATEMENT_KEYWORDS.contains(&type_tokens[0]) || STATEMENT_KEYWORDS.contains(&name) {
        return None;
    }
    if local && !type_tokens.iter().all(|t| TYPE_TOKEN_RE.is_match(t)) {
        return None;
    }

    Some((name.to_string(), normalized, init.filter(|i| !i.is_empty())))
}

/// Offset of the first `=` that is an assignment (not `==`, `<=`, `=>`, ...).
fn find_assignment(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (idx, b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'<' | b'[' => depth += 1,
            b')' | b'>' | b']' => depth -= 1,
            b'=' if depth <= 0 => {
                let prev = idx.checked_sub(1).map(|p| bytes[p]);
                let next = bytes.get(idx + 1).copied();
                let compound = prev.is_some_and(|p| b"=!<>+-*/%&|^".contains(&p));
                if !compound && next != Some(b'=') && next != Some(b'>') {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package com.example;

import java.util.List;

/**
 * A class { with braces in docs }
 */
public class Account {
    private int balance = 0;
    private final String owner;

    public Account(String owner) {
        this.owner = owner;
    }

    @Override
    public String toString() {
        String label = "Account{" + owner + "}";
        return label;
    }

    public void deposit(int amount, List<String> tags) {
        if (amount > 0) {
            int next = balance + amount;
            balance = next;
        }
        for (int i = 0; i < tags.size(); i++) {
            log(tags.get(i));
        }
        Runnable r = () -> {
            int inner = 1;
        };
    }

    static class Ledger {
        void record() {}
    }

    abstract void log(String line);
}
"#;

    fn scan() -> Vec<Declaration> {
        BraceModel::default()
            .declarations("src/Account.java", SAMPLE)
            .unwrap()
    }

    fn find<'a>(decls: &'a [Declaration], key: &str) -> &'a Declaration {
        decls
            .iter()
            .find(|d| d.key == key)
            .unwrap_or_else(|| panic!("missing {key}: {:?}", decls.iter().map(|d| &d.key).collect::<Vec<_>>()))
    }

    #[test]
    fn finds_classes_methods_fields_and_locals() {
        let decls = scan();

        let class = find(&decls, "com.example.Account");
        assert_eq!(class.kind, ElementKind::Class);
        assert_eq!((class.start_line, class.end_line), (8, 40));

        let ctor = find(&decls, "com.example.Account#Account(String)");
        assert_eq!((ctor.start_line, ctor.end_line), (12, 14));

        let to_string = find(&decls, "com.example.Account#toString()");
        assert_eq!(to_string.start_line, 16, "annotation starts the declaration");
        assert_eq!(to_string.body, vec!["String label=\"Account{\"+owner+\"}\";", "return label;"]);

        let deposit = find(&decls, "com.example.Account#deposit(int,List<String>)");
        assert_eq!((deposit.start_line, deposit.end_line), (22, 33));

        let balance = find(&decls, "com.example.Account#balance");
        assert_eq!(balance.kind, ElementKind::Attribute);
        assert_eq!(balance.body, vec!["0"]);
        assert_eq!(find(&decls, "com.example.Account#owner").body, Vec::<String>::new());

        let next = find(&decls, "com.example.Account#deposit(int,List<String>)$next");
        assert_eq!((next.kind, next.start_line), (ElementKind::Variable, 24));
        find(&decls, "com.example.Account#deposit(int,List<String>)$r");
        find(&decls, "com.example.Account#deposit(int,List<String>)$inner");
        find(&decls, "com.example.Account#toString()$label");

        find(&decls, "com.example.Account.Ledger");
        find(&decls, "com.example.Account.Ledger#record()");
        let log = find(&decls, "com.example.Account#log(String)");
        assert!(log.body.is_empty());

        assert!(decls.iter().all(|d| !d.key.ends_with("$i")), "loop header is not a local");
        assert!(decls.iter().all(|d| d.name != "balance" || d.kind == ElementKind::Attribute));
    }

    #[test]
    fn class_members_are_sorted() {
        let decls = scan();
        let class = find(&decls, "com.example.Account");
        assert_eq!(
            class.members,
            vec![
                "Account(String)",
                "balance",
                "deposit(int,List<String>)",
                "log(String)",
                "owner",
                "toString()",
            ]
        );
    }

    #[test]
    fn unbalanced_braces_are_reported() {
        let model = BraceModel::default();
        assert!(model.declarations("A.java", "class A { void f() {").is_err());
        assert!(model.declarations("A.java", "class A { } }").is_err());
    }

    #[test]
    fn supported_extensions() {
        let model = BraceModel::default();
        assert!(model.supports("src/main/java/A.java"));
        assert!(model.supports("web/app.ts"));
        assert!(!model.supports("README.md"));
        assert!(!model.supports("Makefile"));
    }

    #[test]
    fn script_keys_are_qualified_by_path() {
        let model = BraceModel::default();
        let source = "function foo() {\n  return 1;\n}\n\nclass Widget {\n  draw() {\n    return 2;\n  }\n}\n";
        let left = model.declarations("a/index.js", source).unwrap();
        let right = model.declarations("b/index.js", source).unwrap();

        find(&left, "a/index#foo()");
        find(&left, "a/index.Widget");
        find(&left, "a/index.Widget#draw()");
        find(&right, "b/index#foo()");
        assert!(left.iter().all(|l| right.iter().all(|r| r.key != l.key)));

        let java = model.declarations("src/Util.java", "class Util {\n  void run() {}\n}\n").unwrap();
        find(&java, "Util");
        find(&java, "Util#run()");
    }

    fn snapshot<'a>(path: &'a str, source: &'a str, decls: &'a [Declaration]) -> SourceSnapshot<'a> {
        SourceSnapshot {
            path,
            source,
            declarations: decls,
        }
    }

    #[test]
    fn renamed_method_is_found_by_body() {
        let model = BraceModel::default();
        let old = "class A {\n  int foo() {\n    int x = 1;\n    return x + 1;\n  }\n}\n";
        let new = "class A {\n  int bar() {\n    int x = 1;\n    return x + 1;\n  }\n}\n";
        let old_decls = model.declarations("A.java", old).unwrap();
        let new_decls = model.declarations("A.java", new).unwrap();
        let target = new_decls.iter().find(|d| d.key == "A#bar()").unwrap();

        let found = model.counterparts(
            &snapshot("A.java", old, &old_decls),
            &snapshot("A.java", new, &new_decls),
            Some(&snapshot("A.java", new, &new_decls)),
            target,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].declaration.key, "A#foo()");
        assert_eq!(found[0].similarity, 1.0);
    }

    #[test]
    fn copied_body_is_not_an_extraction() {
        let model = BraceModel::default();
        let old = "class A {\n  void a() {\n    go();\n  }\n}\n";
        let new = "class A {\n  void a() {\n    go();\n  }\n  void b() {\n    go();\n  }\n}\n";
        let old_decls = model.declarations("A.java", old).unwrap();
        let new_decls = model.declarations("A.java", new).unwrap();
        let target = new_decls.iter().find(|d| d.key == "A#b()").unwrap();

        let found = model.counterparts(
            &snapshot("A.java", old, &old_decls),
            &snapshot("A.java", new, &new_decls),
            Some(&snapshot("A.java", new, &new_decls)),
            target,
        );
        // a() survives with its body intact, so b() is a new method.
        assert!(found.is_empty());
    }

    #[test]
    fn copied_method_is_not_a_move() {
        let model = BraceModel::default();
        let b_old = "package demo;\nclass B {\n  int total(int a, int b) {\n    return a + b;\n  }\n}\n";
        let b_new = "package demo;\nclass B {\n  int total(int a, int b) {\n    return a + b;\n  }\n  void other() {\n    go();\n  }\n}\n";
        let a_new = "package demo;\nclass A {\n  int total(int a, int b) {\n    return a + b;\n  }\n}\n";
        let b_old_decls = model.declarations("B.java", b_old).unwrap();
        let b_new_decls = model.declarations("B.java", b_new).unwrap();
        let a_new_decls = model.declarations("A.java", a_new).unwrap();
        let target = a_new_decls
            .iter()
            .find(|d| d.key == "demo.A#total(int,int)")
            .unwrap();

        let still_there = model.counterparts(
            &snapshot("B.java", b_old, &b_old_decls),
            &snapshot("A.java", a_new, &a_new_decls),
            Some(&snapshot("B.java", b_new, &b_new_decls)),
            target,
        );
        assert!(still_there.is_empty());

        let deleted = model.counterparts(
            &snapshot("B.java", b_old, &b_old_decls),
            &snapshot("A.java", a_new, &a_new_decls),
            None,
            target,
        );
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].declaration.key, "demo.B#total(int,int)");
    }

    #[test]
    fn inlined_method_is_absorbed() {
        let model = BraceModel::default();
        let old = "class A {\n  void run() {\n    start();\n    helper();\n  }\n  void helper() {\n    stepOne();\n    stepTwo();\n  }\n}\n";
        let new = "class A {\n  void run() {\n    start();\n    stepOne();\n    stepTwo();\n  }\n}\n";
        let old_decls = model.declarations("A.java", old).unwrap();
        let new_decls = model.declarations("A.java", new).unwrap();
        let target = new_decls.iter().find(|d| d.key == "A#run()").unwrap();

        let found = model.counterparts(
            &snapshot("A.java", old, &old_decls),
            &snapshot("A.java", new, &new_decls),
            Some(&snapshot("A.java", new, &new_decls)),
            target,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].declaration.key, "A#run()");
        let absorbed: Vec<_> = found[0].absorbed.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(absorbed, vec!["A#helper()"]);
    }
}
