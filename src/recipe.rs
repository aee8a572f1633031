use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ParseError;
use crate::scanner::{self, Token, TokenKind, SCRIPT_END, SCRIPT_START};

/// Script attached to a request with `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseHandler {
    /// Source between `{%` and `%}`, markers removed.
    Embedded(String),
    /// Path to an external script, not yet loaded.
    File(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Step {
    name: String,
    method: String,
    url: String,
    response_handler: Option<ResponseHandler>,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn response_handler(&self) -> Option<&ResponseHandler> {
        self.response_handler.as_ref()
    }
}

/// Ordered, validated list of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipe {
    steps: Vec<Step>,
}

impl Recipe {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = scanner::scan(source);
        let steps = make_recipe(&tokens)?;
        Ok(Self { steps })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Default)]
enum HandlerSlot {
    #[default]
    Absent,
    /// `>` seen, script still expected.
    Open,
    Ready(ResponseHandler),
}

#[derive(Debug, Default)]
struct Draft {
    name: String,
    method: String,
    url: String,
    handler: HandlerSlot,
}

impl Draft {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn valid(&self) -> bool {
        !self.method.is_empty() || !self.url.is_empty()
    }

    fn finish(self) -> Result<Step, ParseError> {
        let response_handler = match self.handler {
            HandlerSlot::Absent => None,
            HandlerSlot::Open => return Err(ParseError::EmptyHandler),
            HandlerSlot::Ready(handler) => Some(handler),
        };
        Ok(Step {
            name: self.name,
            method: self.method,
            url: self.url,
            response_handler,
        })
    }
}

/// Folds a token stream into steps.
///
/// Any error token rejects the whole input before steps are assembled.
/// Sequencing rules: one verb and one url per request, the url after the verb,
/// a handler only after a request line, script content only after `>`.
pub fn make_recipe(tokens: &[Token]) -> Result<Vec<Step>, ParseError> {
    if let Some(bad) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
        return Err(ParseError::Lexical(bad.value.clone()));
    }

    let mut steps = Vec::new();
    let mut current = Draft::default();
    for token in tokens {
        match token.kind {
            TokenKind::RequestSeparator => {
                let done = std::mem::replace(&mut current, Draft::named(&token.value));
                if done.valid() {
                    steps.push(done.finish()?);
                }
            }
            TokenKind::Verb => {
                if !current.method.is_empty() {
                    return Err(ParseError::MissingSeparator("verb"));
                }
                current.method = token.value.clone();
            }
            TokenKind::Url => {
                if current.method.is_empty() {
                    return Err(ParseError::MissingMethod);
                }
                if !current.url.is_empty() {
                    return Err(ParseError::MissingSeparator("url"));
                }
                current.url = token.value.clone();
            }
            TokenKind::ResponseHandler => {
                if !current.valid() {
                    return Err(ParseError::HandlerWithoutRequest);
                }
                current.handler = HandlerSlot::Open;
            }
            TokenKind::ScriptFile => {
                if matches!(current.handler, HandlerSlot::Absent) {
                    return Err(ParseError::MissingHandlerContext);
                }
                if token.value.is_empty() {
                    return Err(ParseError::EmptyHandler);
                }
                current.handler =
                    HandlerSlot::Ready(ResponseHandler::File(PathBuf::from(&token.value)));
            }
            TokenKind::EmbeddedScript => {
                if matches!(current.handler, HandlerSlot::Absent) {
                    return Err(ParseError::MissingHandlerContext);
                }
                let body = token
                    .value
                    .strip_prefix(SCRIPT_START)
                    .and_then(|rest| rest.strip_suffix(SCRIPT_END))
                    .ok_or(ParseError::InvalidScript)?;
                current.handler = HandlerSlot::Ready(ResponseHandler::Embedded(body.to_string()));
            }
            TokenKind::Error => return Err(ParseError::UnexpectedToken(token.clone())),
        }
    }
    if current.valid() {
        steps.push(current.finish()?);
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, value: &str) -> Token {
        Token::new(kind, value)
    }

    #[test]
    fn single_request() {
        let recipe = Recipe::parse("### call example.com\nGET example.com").unwrap();
        assert_eq!(
            recipe.steps(),
            &[Step {
                name: "call example.com".into(),
                method: "GET".into(),
                url: "example.com".into(),
                response_handler: None,
            }]
        );
    }

    #[test]
    fn several_requests_keep_file_order() {
        let recipe = Recipe::parse(
            "### first\nGET http://h/a\n\n### second\nPUT http://h/b\n\n\n### third\nDELETE http://h/c\n",
        )
        .unwrap();
        let summary: Vec<_> = recipe
            .steps()
            .iter()
            .map(|s| (s.name(), s.method(), s.url()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("first", "GET", "http://h/a"),
                ("second", "PUT", "http://h/b"),
                ("third", "DELETE", "http://h/c"),
            ]
        );
    }

    #[test]
    fn request_without_separator() {
        let recipe = Recipe::parse("GET http://h/a").unwrap();
        assert_eq!(recipe.len(), 1);
        assert_eq!(recipe.steps()[0].name(), "");
    }

    #[test]
    fn blank_separator_does_not_split_requests() {
        let recipe = Recipe::parse("### \nGET http://h/a\n").unwrap();
        assert_eq!(recipe.len(), 1);
        assert_eq!(recipe.steps()[0].method(), "GET");
    }

    #[test]
    fn empty_recipe() {
        assert!(Recipe::parse("").unwrap().is_empty());
        assert!(Recipe::parse("### only a name\n").unwrap().is_empty());
    }

    #[test]
    fn embedded_handler_is_unwrapped_verbatim() {
        let recipe =
            Recipe::parse("### x\nGET http://h/\n\n> {%\nclient.log('hi');\n%}\n").unwrap();
        assert_eq!(
            recipe.steps()[0].response_handler(),
            Some(&ResponseHandler::Embedded("\nclient.log('hi');\n".into()))
        );
    }

    #[test]
    fn file_handler_keeps_path() {
        let recipe = Recipe::parse("GET http://h/\n> checks/status.js\n").unwrap();
        assert_eq!(
            recipe.steps()[0].response_handler(),
            Some(&ResponseHandler::File(PathBuf::from("checks/status.js")))
        );
    }

    #[test]
    fn lexical_error_is_reported_first() {
        let err = Recipe::parse("GET http://h/\nGET http://h/\nBLAH x").unwrap_err();
        assert!(matches!(err, ParseError::Lexical(ref word) if word == "BLAH"));
    }

    #[test]
    fn two_verbs_need_a_separator() {
        let err = Recipe::parse("GET http://h/a\nGET http://h/b\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator("verb")));
    }

    #[test]
    fn url_before_verb() {
        let err = make_recipe(&[tok(TokenKind::Url, "http://h/")]).unwrap_err();
        assert!(matches!(err, ParseError::MissingMethod));
    }

    #[test]
    fn two_urls_need_a_separator() {
        let tokens = [
            tok(TokenKind::Verb, "GET"),
            tok(TokenKind::Url, "http://h/a"),
            tok(TokenKind::Url, "http://h/b"),
        ];
        let err = make_recipe(&tokens).unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator("url")));
    }

    #[test]
    fn handler_before_request() {
        let err = Recipe::parse("### x\n> {% client.log(1) %}\nGET http://h/\n").unwrap_err();
        assert!(matches!(err, ParseError::HandlerWithoutRequest));
    }

    #[test]
    fn script_without_handler_context() {
        let tokens = [
            tok(TokenKind::Verb, "GET"),
            tok(TokenKind::Url, "http://h/"),
            tok(TokenKind::EmbeddedScript, "{% x %}"),
        ];
        let err = make_recipe(&tokens).unwrap_err();
        assert!(matches!(err, ParseError::MissingHandlerContext));

        let tokens = [
            tok(TokenKind::Verb, "GET"),
            tok(TokenKind::ScriptFile, "a.js"),
        ];
        let err = make_recipe(&tokens).unwrap_err();
        assert!(matches!(err, ParseError::MissingHandlerContext));
    }

    #[test]
    fn handler_context_ends_at_separator() {
        let tokens = [
            tok(TokenKind::Verb, "GET"),
            tok(TokenKind::Url, "http://h/a"),
            tok(TokenKind::ResponseHandler, ""),
            tok(TokenKind::ScriptFile, "a.js"),
            tok(TokenKind::RequestSeparator, "next"),
            tok(TokenKind::ScriptFile, "b.js"),
        ];
        let err = make_recipe(&tokens).unwrap_err();
        assert!(matches!(err, ParseError::MissingHandlerContext));
    }

    #[test]
    fn malformed_embedded_script() {
        let tokens = [
            tok(TokenKind::Verb, "GET"),
            tok(TokenKind::ResponseHandler, ""),
            tok(TokenKind::EmbeddedScript, "{% no end"),
        ];
        let err = make_recipe(&tokens).unwrap_err();
        assert!(matches!(err, ParseError::InvalidScript));
    }

    #[test]
    fn collapsed_script_markers_are_rejected() {
        let err = Recipe::parse("GET http://h/a\n> {%}\n### next\nGET http://h/b\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidScript));
    }

    #[test]
    fn empty_script_block_is_allowed() {
        let recipe = Recipe::parse("GET http://h/a\n> {%%}\n").unwrap();
        assert_eq!(
            recipe.steps()[0].response_handler(),
            Some(&ResponseHandler::Embedded(String::new()))
        );
    }

    #[test]
    fn unterminated_script_is_rejected() {
        let err = Recipe::parse("GET http://h/\n> {% client.log(1)\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyHandler));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Recipe::from_file("does/not/exist.http").unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
