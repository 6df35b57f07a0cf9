use crate::compiler::tokens::{Span, Token};
use crate::utils::{memchr, memstr};

/// Tokenizes liquid templates.
///
/// The tokenizer never fails: an opening marker without a matching closing
/// marker is template data, and comment regions are skipped here so the
/// parser never sees them.
pub struct Tokenizer<'s> {
    rest: &'s str,
    current_line: u32,
    current_col: u32,
    current_offset: u32,
    trim_leading_whitespace: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Whitespace {
    Default,
    Remove,
}

impl Whitespace {
    fn from_flag(remove: bool) -> Whitespace {
        if remove {
            Whitespace::Remove
        } else {
            Whitespace::Default
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BlockKind {
    Output,
    Tag,
}

impl BlockKind {
    fn end_marker(self) -> &'static [u8] {
        match self {
            BlockKind::Output => b"}}",
            BlockKind::Tag => b"%}",
        }
    }
}

/// A complete block found in the source, offsets relative to the search.
#[derive(Copy, Clone, Debug)]
struct Block {
    kind: BlockKind,
    start: usize,
    end: usize,
    ws_start: Whitespace,
    ws_end: Whitespace,
}

/// Finds the next `{{ … }}` or `{% … %}` block that is actually closed.
fn find_block(s: &str) -> Option<Block> {
    let bytes = s.as_bytes();
    let mut offset = 0;
    loop {
        let start = offset + some!(memchr(&bytes[offset..], b'{'));
        let kind = match bytes.get(start + 1) {
            Some(b'{') => BlockKind::Output,
            Some(b'%') => BlockKind::Tag,
            _ => {
                offset = start + 1;
                continue;
            }
        };
        if let Some(idx) = memstr(&bytes[start + 2..], kind.end_marker()) {
            let inner = &s[start + 2..start + 2 + idx];
            return Some(Block {
                kind,
                start,
                end: start + 2 + idx + 2,
                ws_start: Whitespace::from_flag(inner.starts_with('-')),
                ws_end: Whitespace::from_flag(inner.ends_with('-')),
            });
        }
        offset = start + 1;
    }
}

/// Returns the inner text of a block without whitespace control markers.
fn block_body(raw: &str) -> &str {
    let inner = &raw[2..raw.len() - 2];
    let inner = inner.strip_prefix('-').unwrap_or(inner);
    inner.strip_suffix('-').unwrap_or(inner).trim()
}

/// Finds the `{% endcomment %}` tag that closes a comment.
///
/// Returns the offset right behind the closing tag and its trailing
/// whitespace mode.
fn find_comment_end(s: &str) -> Option<(usize, Whitespace)> {
    let mut offset = 0;
    while let Some(block) = find_block(&s[offset..]) {
        let start = offset + block.start;
        let end = offset + block.end;
        if block.kind == BlockKind::Tag && block_body(&s[start..end]) == "endcomment" {
            return Some((end, block.ws_end));
        }
        offset = start + 1;
    }
    None
}

impl<'s> Tokenizer<'s> {
    /// Creates a new tokenizer.
    pub fn new(input: &'s str) -> Tokenizer<'s> {
        Tokenizer {
            rest: input,
            current_line: 1,
            current_col: 0,
            current_offset: 0,
            trim_leading_whitespace: false,
        }
    }

    /// Produces the next token from the tokenizer.
    pub fn next_token(&mut self) -> Option<(Token<'s>, Span)> {
        loop {
            if self.trim_leading_whitespace {
                self.trim_leading_whitespace = false;
                self.skip_whitespace();
            }
            if self.rest.is_empty() {
                return None;
            }
            let old_loc = self.loc();
            match find_block(self.rest) {
                Some(block) if block.start == 0 => {
                    if let Some(rv) = self.eat_block(block) {
                        return Some(rv);
                    }
                }
                Some(block) => {
                    let mut lead = self.advance(block.start);
                    if block.ws_start == Whitespace::Remove {
                        lead = lead.trim_end();
                    }
                    if !lead.is_empty() {
                        return Some((Token::TemplateData(lead), self.span(old_loc)));
                    }
                }
                None => {
                    let lead = self.advance(self.rest.len());
                    return Some((Token::TemplateData(lead), self.span(old_loc)));
                }
            }
        }
    }

    fn advance(&mut self, bytes: usize) -> &'s str {
        let (skipped, new_rest) = self.rest.split_at(bytes);
        for c in skipped.chars() {
            match c {
                '\n' => {
                    self.current_line += 1;
                    self.current_col = 0;
                }
                _ => self.current_col += 1,
            }
        }
        self.current_offset += bytes as u32;
        self.rest = new_rest;
        skipped
    }

    #[inline]
    fn loc(&self) -> (u32, u32, u32) {
        (self.current_line, self.current_col, self.current_offset)
    }

    #[inline]
    fn span(&self, (start_line, start_col, start_offset): (u32, u32, u32)) -> Span {
        Span {
            start_line,
            start_col,
            start_offset,
            end_line: self.current_line,
            end_col: self.current_col,
            end_offset: self.current_offset,
        }
    }

    fn skip_whitespace(&mut self) {
        let skipped = self
            .rest
            .chars()
            .map_while(|c| c.is_whitespace().then(|| c.len_utf8()))
            .sum();
        if skipped > 0 {
            self.advance(skipped);
        }
    }

    fn handle_tail_ws(&mut self, ws: Whitespace) {
        self.trim_leading_whitespace = ws == Whitespace::Remove;
    }

    /// Consumes the block at the start of the input.
    ///
    /// Comments produce no token and make this return `None`.
    fn eat_block(&mut self, block: Block) -> Option<(Token<'s>, Span)> {
        let old_loc = self.loc();
        if block.kind == BlockKind::Tag && block_body(&self.rest[..block.end]) == "comment" {
            if let Some((end, ws)) = find_comment_end(&self.rest[block.end..]) {
                self.advance(block.end + end);
                self.handle_tail_ws(ws);
                return None;
            }
        }
        let raw = self.advance(block.end);
        self.handle_tail_ws(block.ws_end);
        let body = block_body(raw);
        let token = match block.kind {
            BlockKind::Output => Token::Output(body),
            BlockKind::Tag => Token::Tag { body, raw },
        };
        Some((token, self.span(old_loc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use similar_asserts::assert_eq;

    fn tokenize(input: &str) -> impl Iterator<Item = (Token<'_>, Span)> {
        let mut tokenizer = Tokenizer::new(input);
        std::iter::from_fn(move || tokenizer.next_token())
    }

    fn tokens(input: &str) -> Vec<Token<'_>> {
        tokenize(input).map(|(token, _)| token).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("Hello {{ name }}!{% if x %}"),
            vec![
                Token::TemplateData("Hello "),
                Token::Output("name"),
                Token::TemplateData("!"),
                Token::Tag {
                    body: "if x",
                    raw: "{% if x %}"
                },
            ]
        );
    }

    #[test]
    fn test_whitespace_control() {
        assert_eq!(
            tokens("a  {%- if x -%}\n  b {{- y -}} c"),
            vec![
                Token::TemplateData("a"),
                Token::Tag {
                    body: "if x",
                    raw: "{%- if x -%}"
                },
                Token::TemplateData("b"),
                Token::Output("y"),
                Token::TemplateData("c"),
            ]
        );
    }

    #[test]
    fn test_trim_does_not_leak_past_blocks() {
        assert_eq!(
            tokens("{{ a -}}{{ b }}  c"),
            vec![
                Token::Output("a"),
                Token::Output("b"),
                Token::TemplateData("  c"),
            ]
        );
    }

    #[test]
    fn test_unclosed_markers_are_text() {
        assert_eq!(tokens("a {{ b"), vec![Token::TemplateData("a {{ b")]);
        assert_eq!(
            tokens("{% x {{ y }}"),
            vec![Token::TemplateData("{% x "), Token::Output("y")]
        );
        assert_eq!(tokens("{ {x} }"), vec![Token::TemplateData("{ {x} }")]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokens("a{% comment %}hidden {{ x }}\n{% endcomment %}b"),
            vec![Token::TemplateData("a"), Token::TemplateData("b")]
        );
        assert_eq!(
            tokens("a {%- comment -%} x {%- endcomment -%} b"),
            vec![Token::TemplateData("a"), Token::TemplateData("b")]
        );
        assert_eq!(
            tokens("{% comment %}x"),
            vec![
                Token::Tag {
                    body: "comment",
                    raw: "{% comment %}"
                },
                Token::TemplateData("x"),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let spans: Vec<Span> = tokenize("a\n{{ b }}").map(|(_, span)| span).collect();
        insta::assert_snapshot!(format!("{:?}", spans), @"[ @ 1:0-2:0,  @ 2:0-2:7]");
    }
}
