//! Tokenizer for `.http` recipe text.
//!
//! The scanner is a small state machine: every [`State`] consumes some input,
//! may emit tokens, and names the state that runs next. Input is read one
//! character at a time with a single character of push-back.
//!
//! ```text
//! ### <name>
//! <VERB> <URL>
//!
//! > {% <script> %}
//! > <file>
//! ```

use std::fmt;
use std::str::Chars;

const SPACE_CHARS: &[char] = &[' ', '\t', '\r', '\n'];
const LINE_ENDS: &[char] = &['\r', '\n'];

pub const REQUEST_SEPARATOR: &str = "###";
pub const RESPONSE_HANDLER_START: &str = ">";
pub const SCRIPT_START: &str = "{%";
pub const SCRIPT_END: &str = "%}";

/// Verbs recognised at the start of a request line.
pub const KNOWN_VERBS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "TRACE", "CONNECT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Error,
    RequestSeparator,
    Verb,
    Url,
    ResponseHandler,
    EmbeddedScript,
    ScriptFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Error => write!(f, "error: {}", self.value),
            kind => write!(f, "{:?} {:?}", kind, self.value),
        }
    }
}

/// Scanner states. `None` from [`State::run`] halts the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Skips whitespace between requests.
    Ignore,
    /// Reads the leading word of a line and dispatches on it.
    DetectRequest,
    /// Rest of a `###` line is the request name.
    RequestSeparator,
    /// The word following a verb.
    RequestUrl,
    /// Embedded `{% %}` block or handler file path following `>`.
    Script,
}

impl State {
    pub fn run(self, scanner: &mut Scanner<'_>) -> Option<State> {
        match self {
            State::Ignore => scanner.lex_ignore(),
            State::DetectRequest => scanner.lex_detect_request(),
            State::RequestSeparator => scanner.lex_request_separator(),
            State::RequestUrl => scanner.lex_request_url(),
            State::Script => scanner.lex_script(),
        }
    }
}

pub struct Scanner<'a> {
    input: Chars<'a>,
    pushback: Option<char>,
    value: String,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.chars(),
            pushback: None,
            value: String::new(),
            tokens: Vec::new(),
        }
    }

    /// Runs the state machine to completion.
    pub fn scan(mut self) -> Vec<Token> {
        let mut state = Some(State::Ignore);
        while let Some(current) = state {
            state = current.run(&mut self);
        }
        tracing::debug!(tokens = self.tokens.len(), "recipe scanned");
        self.tokens
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn read(&mut self) -> Option<char> {
        self.pushback.take().or_else(|| self.input.next())
    }

    fn unread(&mut self, ch: char) {
        debug_assert!(self.pushback.is_none(), "only one character of push-back");
        self.pushback = Some(ch);
    }

    fn peek(&mut self) -> Option<char> {
        let ch = self.read()?;
        self.unread(ch);
        Some(ch)
    }

    fn accept(&mut self, pred: impl Fn(char) -> bool) -> bool {
        match self.read() {
            Some(ch) if pred(ch) => {
                self.value.push(ch);
                true
            }
            Some(ch) => {
                self.unread(ch);
                false
            }
            None => false,
        }
    }

    fn accept_white_spaces(&mut self) {
        while self.accept(|ch| SPACE_CHARS.contains(&ch)) {}
    }

    fn ignore_white_spaces(&mut self) {
        self.accept_white_spaces();
        self.value.clear();
    }

    fn accept_word(&mut self) {
        while self.accept(|ch| !SPACE_CHARS.contains(&ch)) {}
    }

    fn accept_line(&mut self) {
        while self.accept(|ch| !LINE_ENDS.contains(&ch)) {}
    }

    fn take_value(&mut self) -> String {
        std::mem::take(&mut self.value)
    }

    fn emit(&mut self, kind: TokenKind, value: impl Into<String>) {
        self.tokens.push(Token::new(kind, value));
    }

    fn lex_ignore(&mut self) -> Option<State> {
        self.ignore_white_spaces();
        self.peek()?;
        Some(State::DetectRequest)
    }

    fn lex_detect_request(&mut self) -> Option<State> {
        self.accept_word();
        let word = self.take_value();
        match word.as_str() {
            REQUEST_SEPARATOR => Some(State::RequestSeparator),
            RESPONSE_HANDLER_START => {
                self.emit(TokenKind::ResponseHandler, "");
                Some(State::Script)
            }
            verb if KNOWN_VERBS.contains(&verb) => {
                self.emit(TokenKind::Verb, verb);
                Some(State::RequestUrl)
            }
            _ => {
                self.emit(TokenKind::Error, word);
                None
            }
        }
    }

    fn lex_request_separator(&mut self) -> Option<State> {
        self.accept_line();
        let line = self.take_value();
        let name = line.trim();
        if !name.is_empty() {
            self.emit(TokenKind::RequestSeparator, name);
        }
        Some(State::Ignore)
    }

    fn lex_request_url(&mut self) -> Option<State> {
        self.ignore_white_spaces();
        self.accept_word();
        let url = self.take_value();
        if !url.is_empty() {
            self.emit(TokenKind::Url, url);
        }
        Some(State::Ignore)
    }

    fn lex_script(&mut self) -> Option<State> {
        self.ignore_white_spaces();
        self.accept_word();
        if !self.value.starts_with(SCRIPT_START) {
            let file = self.take_value();
            self.emit(TokenKind::ScriptFile, file);
            return Some(State::Ignore);
        }
        loop {
            if self.value.ends_with(SCRIPT_END) {
                let script = self.take_value();
                self.emit(TokenKind::EmbeddedScript, script);
                return Some(State::Ignore);
            }
            if self.peek().is_none() {
                // unterminated block
                self.value.clear();
                return None;
            }
            self.accept_white_spaces();
            self.accept_word();
        }
    }
}

pub fn scan(source: &str) -> Vec<Token> {
    Scanner::new(source).scan()
}
