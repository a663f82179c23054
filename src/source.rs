//! A lightweight scan of `.proto` source text.
//!
//! Descriptors produced by `protobuf-parse` carry no comments and resolve
//! option names into extension numbers, so the two things the lock needs in
//! their written form, leading comments and option statements, are recovered
//! here. The scan only tracks declarations; syntax errors are left for the
//! real parser to report.

use crate::canonical::ProtoOption;
use crate::hints::{Hint, hint};
use std::collections::{BTreeMap, BTreeSet};

//==============================================================================
// Tokens
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Identifiers, keywords and numeric literals.
    Word(String),
    /// A string literal with its quotes removed.
    Str(String),
    Symbol(char),
    /// One comment: the lines of a `//` run or a `/* */` block.
    Comment(Vec<String>),
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 0usize;
    // line on which the last non-comment token ended
    let mut code_line: Option<usize> = None;
    // line on which the last comment ended
    let mut comment_line: Option<usize> = None;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
            }
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            let start = i + 2;
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if code_line == Some(line) {
                // trailing comment of the previous statement
                continue;
            }
            match tokens.last_mut() {
                Some(Token::Comment(lines)) if comment_line.map(|l| l + 1) == Some(line) => {
                    lines.push(text)
                }
                _ => tokens.push(Token::Comment(vec![text])),
            }
            comment_line = Some(line);
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            let trailing = code_line == Some(line);
            let start = i + 2;
            i = start;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            let body: String = chars[start..i.min(chars.len())].iter().collect();
            i = (i + 2).min(chars.len());
            if !trailing {
                tokens.push(Token::Comment(body.lines().map(str::to_string).collect()));
                comment_line = Some(line);
            }
        } else if c == '"' || c == '\'' {
            let quote = c;
            let mut value = String::new();
            i += 1;
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    value.push(chars[i]);
                    i += 1;
                }
                value.push(chars[i]);
                i += 1;
            }
            i += 1;
            push_code(&mut tokens, Token::Str(value), line, comment_line);
            code_line = Some(line);
        } else if c.is_alphanumeric() || c == '_' || c == '.' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '+' | '-'))
            {
                // '+'/'-' only belong to a word inside exponents such as 1e-5
                if matches!(chars[i], '+' | '-') && !matches!(chars[i - 1], 'e' | 'E') {
                    break;
                }
                i += 1;
            }
            let word = Token::Word(chars[start..i].iter().collect());
            push_code(&mut tokens, word, line, comment_line);
            code_line = Some(line);
        } else {
            push_code(&mut tokens, Token::Symbol(c), line, comment_line);
            code_line = Some(line);
            i += 1;
        }
    }

    tokens
}

/// Pushes a non-comment token. A comment that ended before the previous line
/// is dropped: only a comment directly above a declaration leads it.
fn push_code(tokens: &mut Vec<Token>, token: Token, line: usize, comment_line: Option<usize>) {
    let detached = comment_line.is_some_and(|end| end + 1 < line);
    if detached && matches!(tokens.last(), Some(Token::Comment(_))) {
        tokens.pop();
    }
    tokens.push(token);
}

//==============================================================================
// Annotations
//==============================================================================

/// What the scan learned about one file, keyed by dotted declaration name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceAnnotations {
    /// Messages (dotted names) whose leading comment carries a skip hint.
    pub skipped_messages: BTreeSet<String>,
    /// Services whose leading comment carries a skip hint.
    pub skipped_services: BTreeSet<String>,
    /// `option name = value;` statements, per dotted message name.
    pub message_options: BTreeMap<String, Vec<ProtoOption>>,
    /// `[...]` options, per dotted message name and field name.
    pub field_options: BTreeMap<String, BTreeMap<String, Vec<ProtoOption>>>,
    /// `[...]` options, per dotted enum name and value name.
    pub enum_value_options: BTreeMap<String, BTreeMap<String, Vec<ProtoOption>>>,
}

impl SourceAnnotations {
    /// True if the message, or any message enclosing it, is skipped.
    pub fn is_message_skipped(&self, dotted_name: &str) -> bool {
        let mut prefix = String::new();
        for part in dotted_name.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(part);
            if self.skipped_messages.contains(&prefix) {
                return true;
            }
        }
        false
    }

    pub fn is_service_skipped(&self, name: &str) -> bool {
        self.skipped_services.contains(name)
    }

    pub fn message_options(&self, message: &str) -> Vec<ProtoOption> {
        self.message_options.get(message).cloned().unwrap_or_default()
    }

    pub fn field_options(&self, message: &str, field: &str) -> Vec<ProtoOption> {
        self.field_options
            .get(message)
            .and_then(|fields| fields.get(field))
            .cloned()
            .unwrap_or_default()
    }

    pub fn enum_value_options(&self, enum_name: &str, value: &str) -> Vec<ProtoOption> {
        self.enum_value_options
            .get(enum_name)
            .and_then(|values| values.get(value))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Message(String),
    Enum(String),
    /// oneof bodies: their fields belong to the enclosing message
    Oneof,
    /// service, rpc, extend and any other braced body
    Other,
}

struct Scanner {
    tokens: Vec<Token>,
    pos: usize,
    scopes: Vec<Scope>,
    annotations: SourceAnnotations,
}

/// Scans `.proto` source text for hints and options.
pub fn scan(source: &str) -> SourceAnnotations {
    let mut scanner = Scanner {
        tokens: tokenize(source),
        pos: 0,
        scopes: Vec::new(),
        annotations: SourceAnnotations::default(),
    };
    scanner.run();
    scanner.annotations
}

impl Scanner {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn next_word(&mut self) -> Option<String> {
        self.skip_comments();
        match self.next() {
            Some(Token::Word(word)) => Some(word),
            _ => None,
        }
    }

    fn skip_comments(&mut self) {
        while matches!(self.peek(), Some(Token::Comment(_))) {
            self.pos += 1;
        }
    }

    /// Dotted name of the innermost enclosing message.
    fn current_message(&self) -> Option<String> {
        let names: Vec<&str> = self
            .scopes
            .iter()
            .filter_map(|s| match s {
                Scope::Message(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        (!names.is_empty()).then(|| names.join("."))
    }

    fn in_message_body(&self) -> bool {
        matches!(self.scopes.last(), Some(Scope::Message(_)) | Some(Scope::Oneof))
    }

    fn run(&mut self) {
        let mut leading_comment: Option<Vec<String>> = None;

        while let Some(token) = self.next() {
            let comment = leading_comment.take();
            match token {
                Token::Comment(lines) => leading_comment = Some(lines),
                Token::Symbol('}') => {
                    self.scopes.pop();
                }
                Token::Symbol(_) | Token::Str(_) => {}
                Token::Word(word) => self.declaration(&word, comment),
            }
        }
    }

    fn declaration(&mut self, keyword: &str, comment: Option<Vec<String>>) {
        let skipped = comment.as_deref().and_then(hint) == Some(Hint::Skip);
        match keyword {
            "message" => {
                let Some(name) = self.next_word() else { return };
                let dotted = match self.current_message() {
                    Some(parent) => format!("{parent}.{name}"),
                    None => name.clone(),
                };
                if skipped {
                    self.annotations.skipped_messages.insert(dotted);
                }
                self.open_body(Scope::Message(name));
            }
            "service" => {
                let Some(name) = self.next_word() else { return };
                if skipped {
                    self.annotations.skipped_services.insert(name);
                }
                self.open_body(Scope::Other);
            }
            "enum" => {
                let Some(name) = self.next_word() else { return };
                let dotted = match self.current_message() {
                    Some(parent) => format!("{parent}.{name}"),
                    None => name,
                };
                self.open_body(Scope::Enum(dotted));
            }
            "oneof" => {
                self.next_word();
                self.open_body(Scope::Oneof);
            }
            "option" => {
                let statement = self.statement();
                if let Some(option) = parse_option(&statement) {
                    if matches!(self.scopes.last(), Some(Scope::Message(_))) {
                        if let Some(message) = self.current_message() {
                            self.annotations
                                .message_options
                                .entry(message)
                                .or_default()
                                .push(option);
                        }
                    }
                }
            }
            "syntax" | "edition" | "package" | "import" | "reserved" | "extensions" => {
                self.statement();
            }
            _ => {
                let mut statement = vec![Token::Word(keyword.to_string())];
                statement.extend(self.statement_or_body());
                self.member(&statement);
            }
        }
    }

    /// Consumes tokens up to and including the opening brace of a body.
    fn open_body(&mut self, scope: Scope) {
        while let Some(token) = self.next() {
            match token {
                Token::Symbol('{') => {
                    self.scopes.push(scope);
                    return;
                }
                Token::Symbol(';') => return,
                _ => {}
            }
        }
    }

    /// Consumes a `;`-terminated statement, keeping nested `[]`/`{}` intact.
    fn statement(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            match token {
                Token::Symbol('[') | Token::Symbol('{') | Token::Symbol('(') => depth += 1,
                Token::Symbol(']') | Token::Symbol('}') | Token::Symbol(')') => {
                    depth = depth.saturating_sub(1)
                }
                Token::Symbol(';') if depth == 0 => return tokens,
                Token::Comment(_) => continue,
                _ => {}
            }
            tokens.push(token);
        }
        tokens
    }

    /// Like [`Self::statement`], but a `{` at depth zero (an rpc or extend
    /// body, a group) opens a scope instead.
    fn statement_or_body(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Symbol('{') if depth == 0 => {
                    self.pos += 1;
                    self.scopes.push(Scope::Other);
                    return tokens;
                }
                Token::Symbol('}') if depth == 0 => return tokens,
                Token::Symbol('[') | Token::Symbol('{') | Token::Symbol('(') | Token::Symbol('<') => {
                    depth += 1
                }
                Token::Symbol(']') | Token::Symbol('}') | Token::Symbol(')') | Token::Symbol('>') => {
                    depth = depth.saturating_sub(1)
                }
                Token::Symbol(';') if depth == 0 => {
                    self.pos += 1;
                    return tokens;
                }
                Token::Comment(_) => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
            tokens.push(token);
        }
        tokens
    }

    /// Records the options of a field or enum value statement.
    fn member(&mut self, statement: &[Token]) {
        let Some(eq) = statement.iter().position(|t| t == &Token::Symbol('=')) else {
            return;
        };
        let Some(Token::Word(name)) = eq.checked_sub(1).and_then(|i| statement.get(i)) else {
            return;
        };
        let options = match statement.iter().position(|t| t == &Token::Symbol('[')) {
            Some(open) if open > eq => parse_option_list(&statement[open + 1..]),
            _ => Vec::new(),
        };
        if options.is_empty() {
            return;
        }

        if self.in_message_body() {
            if let Some(message) = self.current_message() {
                self.annotations
                    .field_options
                    .entry(message)
                    .or_default()
                    .insert(name.clone(), options);
            }
        } else if let Some(Scope::Enum(enum_name)) = self.scopes.last() {
            self.annotations
                .enum_value_options
                .entry(enum_name.clone())
                .or_default()
                .insert(name.clone(), options);
        }
    }
}

//==============================================================================
// Option values
//==============================================================================

/// Parses `name = value` from the tokens of an option statement.
fn parse_option(tokens: &[Token]) -> Option<ProtoOption> {
    let mut cursor = OptionCursor { tokens, pos: 0 };
    cursor.option(&['='])
}

/// Parses `a = 1, (b).c = {..}` up to the closing `]`.
fn parse_option_list(tokens: &[Token]) -> Vec<ProtoOption> {
    let mut cursor = OptionCursor { tokens, pos: 0 };
    let mut options = Vec::new();
    loop {
        match cursor.peek() {
            None | Some(Token::Symbol(']')) => break,
            Some(Token::Symbol(',')) => cursor.pos += 1,
            _ => match cursor.option(&['=']) {
                Some(option) => options.push(option),
                None => break,
            },
        }
    }
    options
}

struct OptionCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl OptionCursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Reads an option name, which may be parenthesised and dotted such as
    /// `(ext.persisted).enabled`.
    fn name(&mut self, separators: &[char]) -> String {
        let mut name = String::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Symbol(c) if separators.contains(c) => break,
                Token::Symbol(c @ ('(' | ')')) => name.push(*c),
                Token::Symbol('[') => name.push('['),
                Token::Symbol(']') if name.contains('[') => name.push(']'),
                Token::Word(word) => name.push_str(word),
                _ => break,
            }
            self.pos += 1;
        }
        name
    }

    fn option(&mut self, separators: &[char]) -> Option<ProtoOption> {
        let name = self.name(separators);
        if name.is_empty() {
            return None;
        }
        // `{` starts an aggregate value, only assignment separators are consumed
        if matches!(self.peek(), Some(Token::Symbol(':' | '='))) {
            self.pos += 1;
        }
        let mut option = ProtoOption {
            name,
            ..Default::default()
        };
        self.value(&mut option);
        Some(option)
    }

    fn value(&mut self, option: &mut ProtoOption) {
        match self.peek().cloned() {
            Some(Token::Symbol('{')) => {
                self.pos += 1;
                option.aggregated = self.aggregate();
            }
            Some(Token::Symbol('[')) => {
                self.pos += 1;
                let mut items = Vec::new();
                while let Some(token) = self.peek().cloned() {
                    self.pos += 1;
                    match token {
                        Token::Symbol(']') => break,
                        Token::Symbol(',') => {}
                        Token::Word(w) | Token::Str(w) => items.push(w),
                        Token::Symbol(c) => items.push(c.to_string()),
                        Token::Comment(_) => {}
                    }
                }
                option.value = format!("[{}]", items.join(", "));
            }
            Some(Token::Symbol('-')) => {
                self.pos += 1;
                if let Some(Token::Word(word)) = self.peek().cloned() {
                    self.pos += 1;
                    option.value = format!("-{word}");
                }
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                option.value = s;
                // adjacent string literals concatenate
                while let Some(Token::Str(more)) = self.peek().cloned() {
                    self.pos += 1;
                    option.value.push_str(&more);
                }
            }
            Some(Token::Word(word)) => {
                self.pos += 1;
                option.value = word;
            }
            _ => {}
        }
    }

    /// Reads `key: value` entries up to the closing `}`.
    fn aggregate(&mut self) -> Vec<ProtoOption> {
        let mut entries = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(Token::Symbol('}')) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Symbol(',')) | Some(Token::Symbol(';')) => self.pos += 1,
                _ => match self.option(&[':', '{', ',', '}']) {
                    Some(entry) => entries.push(entry),
                    None => self.pos += 1,
                },
            }
        }
        entries
    }
}
