//! Tokenizer and open-tag bookkeeping for the chat markup dialect.

/// Longest character entity we recognise (`&thetasym;` fits comfortably).
const MAX_ENTITY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// `<b>`, `<a href="...">`
    OpenTag,
    /// `</b>`
    CloseTag,
    /// Self-closing or nameless tag; never changes nesting.
    InertTag,
    /// `&amp;`, `&#39;`
    Entity,
    /// A single character.
    Char,
    /// An unterminated `<` and everything after it.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Length in characters.
    pub len: usize,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: &'a str) -> Self {
        Self {
            kind,
            text,
            len: text.chars().count(),
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Char && self.text.chars().all(char::is_whitespace)
    }

    pub fn tag_name(&self) -> &'a str {
        tag_name(self.text)
    }
}

/// Split formatted text into tags, entities and single characters.
pub(crate) fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        let (kind, end) = match ch {
            '<' => match rest.find('>') {
                Some(close) => (classify_tag(&rest[..=close]), close + 1),
                None => (TokenKind::Text, rest.len()),
            },
            '&' => match entity_end(rest) {
                Some(end) => (TokenKind::Entity, end),
                None => (TokenKind::Char, ch.len_utf8()),
            },
            _ => (TokenKind::Char, ch.len_utf8()),
        };
        tokens.push(Token::new(kind, &rest[..end]));
        rest = &rest[end..];
    }

    tokens
}

fn entity_end(rest: &str) -> Option<usize> {
    let body = rest.as_bytes().get(1..)?;
    let name_len = body
        .iter()
        .take(MAX_ENTITY_LEN)
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'#')
        .count();
    if name_len == 0 || body.get(name_len) != Some(&b';') {
        return None;
    }
    Some(name_len + 2)
}

fn classify_tag(text: &str) -> TokenKind {
    let name = tag_name(text);
    if name.is_empty() || name.eq_ignore_ascii_case("br") || text.ends_with("/>") {
        TokenKind::InertTag
    } else if text.starts_with("</") {
        TokenKind::CloseTag
    } else {
        TokenKind::OpenTag
    }
}

fn tag_name(text: &str) -> &str {
    let inner = text.strip_prefix('<').unwrap_or(text);
    let inner = inner.strip_prefix('/').unwrap_or(inner).trim_start();
    let end = inner
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(inner.len());
    &inner[..end]
}

#[derive(Debug, Clone, Copy)]
struct OpenTag<'a> {
    name: &'a str,
    raw: &'a str,
}

impl OpenTag<'_> {
    fn reopen_len(&self) -> usize {
        self.raw.chars().count()
    }

    fn close_len(&self) -> usize {
        close_len(self.name)
    }
}

fn close_len(name: &str) -> usize {
    name.chars().count() + 3
}

/// Tags opened but not yet closed, outermost first.
#[derive(Debug, Clone, Default)]
pub(crate) struct TagStack<'a> {
    frames: Vec<OpenTag<'a>>,
    reopen_len: usize,
    closing_len: usize,
}

impl<'a> TagStack<'a> {
    /// Apply a token's effect on nesting.
    pub fn apply(&mut self, token: &Token<'a>) {
        match token.kind {
            TokenKind::OpenTag => {
                let frame = OpenTag {
                    name: token.tag_name(),
                    raw: token.text,
                };
                self.reopen_len += frame.reopen_len();
                self.closing_len += frame.close_len();
                self.frames.push(frame);
            }
            TokenKind::CloseTag => {
                if let Some(idx) = self.position_of(token.tag_name()) {
                    for frame in self.frames.drain(idx..) {
                        self.reopen_len -= frame.reopen_len();
                        self.closing_len -= frame.close_len();
                    }
                }
            }
            _ => {}
        }
    }

    /// Characters needed to close everything once `token` is admitted.
    pub fn closing_len_after(&self, token: &Token<'a>) -> usize {
        match token.kind {
            TokenKind::OpenTag => self.closing_len + close_len(token.tag_name()),
            TokenKind::CloseTag => match self.position_of(token.tag_name()) {
                Some(idx) => self.frames[..idx].iter().map(OpenTag::close_len).sum(),
                None => self.closing_len,
            },
            _ => self.closing_len,
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.name.eq_ignore_ascii_case(name))
    }

    pub fn reopen_len(&self) -> usize {
        self.reopen_len
    }

    pub fn closing_len(&self) -> usize {
        self.closing_len
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn write_reopen(&self, out: &mut String) {
        for frame in &self.frames {
            out.push_str(frame.raw);
        }
    }

    pub fn write_closing(&self, out: &mut String) {
        for frame in self.frames.iter().rev() {
            out.push_str("</");
            out.push_str(&frame.name.to_ascii_lowercase());
            out.push('>');
        }
    }
}
