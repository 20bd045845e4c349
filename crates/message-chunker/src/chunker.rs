use std::collections::VecDeque;

use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::markup::{tokenize, TagStack, Token, TokenKind};
use crate::splitter::split_plain;

/// Main chunker interface for splitting replies
#[derive(Debug, Clone)]
pub struct MessageChunker {
    config: ChunkerConfig,
}

impl MessageChunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.config.max_chunk_chars
    }

    /// Split unformatted text.
    #[must_use]
    pub fn split_plain(&self, text: &str) -> Vec<String> {
        split_plain(text, self.limit())
    }

    /// Split formatted text so that every chunk is well-formed on its own.
    ///
    /// Tags still open at a cut are closed at the end of the chunk and reopened
    /// at the start of the next one. When no markup-preserving cut exists (a
    /// single token that cannot fit even at the head of a chunk) the whole input
    /// goes through the plain splitter instead.
    #[must_use]
    pub fn split_markup(&self, text: &str) -> Vec<String> {
        match self.try_split_markup(text) {
            Some(parts) => parts,
            None => {
                log::debug!(
                    "Markup-safe split impossible at limit {}, falling back to plain split",
                    self.limit()
                );
                split_plain(text, self.limit())
            }
        }
    }

    fn try_split_markup(&self, text: &str) -> Option<Vec<String>> {
        let limit = self.limit();
        let mut pending: VecDeque<Token<'_>> = tokenize(text).into();
        let mut parts = Vec::new();
        let mut chunk = PendingChunk::new(TagStack::default());

        while let Some(token) = pending.pop_front() {
            if chunk.prospective_len(&token) <= limit {
                let preferred = self.is_preferred_boundary(&token);
                chunk.admit(token, preferred);
                continue;
            }

            if chunk.tokens.is_empty() {
                return None;
            }

            let (emitted, leftover, next_start) = chunk.cut();
            parts.push(emitted);
            pending.push_front(token);
            for carried in leftover.into_iter().rev() {
                pending.push_front(carried);
            }
            chunk = PendingChunk::new(next_start);
        }

        if !chunk.tokens.is_empty() {
            parts.push(chunk.render_all());
        }

        Some(parts)
    }

    fn is_preferred_boundary(&self, token: &Token<'_>) -> bool {
        match token.kind {
            TokenKind::Char => token.is_whitespace(),
            TokenKind::CloseTag => self.config.is_boundary_tag(token.tag_name()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Boundary<'a> {
    /// Number of tokens kept when cutting here.
    count: usize,
    stack: TagStack<'a>,
}

/// Tokens accumulated for the chunk currently being built.
struct PendingChunk<'a> {
    /// Tags reopened at the head of this chunk.
    start: TagStack<'a>,
    /// Tags open after the last admitted token.
    stack: TagStack<'a>,
    tokens: Vec<Token<'a>>,
    body_len: usize,
    last_boundary: Option<Boundary<'a>>,
}

impl<'a> PendingChunk<'a> {
    fn new(start: TagStack<'a>) -> Self {
        Self {
            stack: start.clone(),
            start,
            tokens: Vec::new(),
            body_len: 0,
            last_boundary: None,
        }
    }

    fn prospective_len(&self, token: &Token<'a>) -> usize {
        self.start.reopen_len() + self.body_len + token.len + self.stack.closing_len_after(token)
    }

    fn admit(&mut self, token: Token<'a>, preferred: bool) {
        self.stack.apply(&token);
        self.body_len += token.len;
        self.tokens.push(token);
        if preferred {
            self.last_boundary = Some(Boundary {
                count: self.tokens.len(),
                stack: self.stack.clone(),
            });
        }
    }

    /// Emit up to the nearest preferred boundary, or everything when there is none.
    ///
    /// Every admitted prefix fit the limit when it was admitted, so the nearest
    /// boundary always yields a chunk within the limit.
    fn cut(mut self) -> (String, Vec<Token<'a>>, TagStack<'a>) {
        match self.last_boundary.take() {
            Some(boundary) => {
                let leftover = self.tokens.split_off(boundary.count);
                let emitted = render(&self.start, &self.tokens, &boundary.stack);
                (emitted, leftover, boundary.stack)
            }
            None => {
                let emitted = render(&self.start, &self.tokens, &self.stack);
                (emitted, Vec::new(), self.stack)
            }
        }
    }

    fn render_all(&self) -> String {
        render(&self.start, &self.tokens, &self.stack)
    }
}

fn render(start: &TagStack<'_>, tokens: &[Token<'_>], end: &TagStack<'_>) -> String {
    let body: usize = tokens.iter().map(|token| token.text.len()).sum();
    let mut out = String::with_capacity(body + 64);
    start.write_reopen(&mut out);
    for token in tokens {
        out.push_str(token.text);
    }
    if !end.is_empty() {
        end.write_closing(&mut out);
    }
    out
}
