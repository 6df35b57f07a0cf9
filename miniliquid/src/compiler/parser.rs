use std::borrow::Cow;

use crate::compiler::ast::{self, Spanned};
use crate::compiler::lexer::Tokenizer;
use crate::compiler::tokens::{Span, Token};
use crate::condition::{CompareOp, Condition};
use crate::expression::Expression;
use crate::utils::{memchr, split_arguments, split_top_level_word, split_word, strip_quotes};

/// Blocks (`if`, `unless`, `for`, `case`) nested deeper than this are
/// dropped together with their contents.
const MAX_NESTING: usize = 150;

/// Tags that start with one of these are control tags.  Control tags that
/// do not have the expected shape are dropped rather than passed through.
const CONTROL_PREFIXES: [&str; 9] = [
    "if", "unless", "elsif", "else", "endif", "endunless", "for", "endfor", "assign",
];

/// The meaning of a tag as far as the parser is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind<'a> {
    If(&'a str),
    Unless(&'a str),
    Elsif(&'a str),
    Else,
    End(&'a str),
    For { target: &'a str, iter: &'a str },
    Assign { target: &'a str, expr: &'a str },
    Case(&'a str),
    When(&'a str),
    EndCase,
    Include(&'a str),
    Malformed,
    Raw,
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_')
}

fn classify(body: &str) -> TagKind<'_> {
    let (word, rest) = split_word(body);
    match word {
        "case" if !rest.is_empty() => return TagKind::Case(rest),
        "when" if !rest.is_empty() => return TagKind::When(rest),
        "endcase" if rest.is_empty() => return TagKind::EndCase,
        "include" if !rest.is_empty() => return TagKind::Include(rest),
        _ => {}
    }

    if !CONTROL_PREFIXES.iter().any(|prefix| body.starts_with(prefix)) {
        return TagKind::Raw;
    }

    match word {
        "if" if !rest.is_empty() => TagKind::If(rest),
        "unless" if !rest.is_empty() => TagKind::Unless(rest),
        "elsif" if !rest.is_empty() => TagKind::Elsif(rest),
        _ if body == "else" => TagKind::Else,
        _ if matches!(body, "endif" | "endunless" | "endfor") => TagKind::End(body),
        "for" => {
            let (target, rest) = split_word(rest);
            match split_word(rest) {
                ("in", iter) if is_word(target) && !iter.is_empty() => {
                    TagKind::For { target, iter }
                }
                _ => TagKind::Malformed,
            }
        }
        "assign" => match rest.split_once('=') {
            Some((target, expr)) if is_word(target.trim()) && !expr.trim().is_empty() => {
                TagKind::Assign {
                    target: target.trim(),
                    expr: expr.trim(),
                }
            }
            _ => TagKind::Malformed,
        },
        _ => TagKind::Malformed,
    }
}

/// Matches a single `key=value` include parameter at the start of `s`.
///
/// Returns the key, the value with one layer of quotes removed and the
/// number of bytes consumed.
fn match_include_param(s: &str) -> Option<(&str, &str, usize)> {
    let key_len = s
        .bytes()
        .take_while(|&c| c.is_ascii_alphanumeric() || c == b'_')
        .count();
    if key_len == 0 {
        return None;
    }
    let rest = some!(s[key_len..].trim_start().strip_prefix('=')).trim_start();
    let bare_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let value_len = match rest.as_bytes().first() {
        Some(&quote @ (b'"' | b'\'')) => match memchr(&rest.as_bytes()[1..], quote) {
            Some(idx) => idx + 2,
            None => bare_len,
        },
        Some(_) => bare_len,
        None => return None,
    };
    let value = rest[..value_len].trim();
    Some((&s[..key_len], strip_quotes(value), s.len() - rest.len() + value_len))
}

fn parse_include(args: &str) -> ast::Include<'_> {
    let (name, mut rest) = split_word(args);
    let name = name.strip_prefix(['"', '\'']).unwrap_or(name);
    let name = name.strip_suffix(['"', '\'']).unwrap_or(name);

    let mut params = Vec::new();
    while !rest.is_empty() {
        match match_include_param(rest) {
            Some((key, value, consumed)) => {
                params.push((key, value));
                rest = &rest[consumed..];
            }
            None => {
                let skip = rest.chars().next().map_or(1, char::len_utf8);
                rest = &rest[skip..];
            }
        }
    }
    ast::Include { name, params }
}

/// Builds the condition of a lowered `when`: any of the listed values.
fn when_condition(temp: &str, values: &str) -> Condition {
    Condition::any(
        split_arguments(values)
            .into_iter()
            .flat_map(|value| split_top_level_word(value, "or"))
            .map(|value| {
                Condition::compare(CompareOp::Eq, Expression::var(temp), Expression::parse(value))
            })
            .collect(),
    )
}

struct TokenStream<'a> {
    tokenizer: Tokenizer<'a>,
    current: Option<(Token<'a>, Span)>,
    last_span: Span,
}

impl<'a> TokenStream<'a> {
    /// Tokenize a template
    pub fn new(source: &'a str) -> TokenStream<'a> {
        let mut tokenizer = Tokenizer::new(source);
        let current = tokenizer.next_token();
        TokenStream {
            tokenizer,
            current,
            last_span: Span::default(),
        }
    }

    /// Advance the stream.
    pub fn next(&mut self) -> Option<(Token<'a>, Span)> {
        let rv = self.current.take();
        self.current = self.tokenizer.next_token();
        if let Some((_, span)) = rv {
            self.last_span = span;
        }
        rv
    }

    /// Look at the current token
    pub fn current(&self) -> Option<(Token<'a>, Span)> {
        self.current
    }

    /// Expands the span
    #[inline(always)]
    pub fn expand_span(&self, mut span: Span) -> Span {
        span.end_line = self.last_span.end_line;
        span.end_col = self.last_span.end_col;
        span.end_offset = self.last_span.end_offset;
        span
    }

    /// Returns the current span.
    #[inline(always)]
    pub fn current_span(&self) -> Span {
        match self.current {
            Some((_, span)) => span,
            None => self.last_span,
        }
    }
}

struct Parser<'a> {
    stream: TokenStream<'a>,
    case_counter: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            stream: TokenStream::new(source),
            case_counter: 0,
            depth: 0,
        }
    }

    /// Consumes the next token and classifies it if it is a tag.
    fn next_tag(&mut self) -> Option<(TagKind<'a>, Span)> {
        match self.stream.next() {
            Some((Token::Tag { body, .. }, span)) => Some((classify(body), span)),
            _ => None,
        }
    }

    fn parse_if_cond(&mut self, cond: &'a str, negated: bool) -> ast::IfCond<'a> {
        let mut branches = Vec::new();
        let mut else_body = Vec::new();
        let (mut cond, mut negated) = (cond, negated);
        loop {
            let body = self.subparse(&|tag| {
                matches!(tag, TagKind::End(_) | TagKind::Else | TagKind::Elsif(_))
            });
            branches.push(ast::CondBranch {
                cond: Condition::parse(cond),
                negated,
                body,
            });
            match self.next_tag() {
                Some((TagKind::Elsif(next), _)) => {
                    cond = next;
                    negated = false;
                }
                Some((TagKind::Else, _)) => {
                    else_body = self.subparse(&|tag| matches!(tag, TagKind::End(_)));
                    self.stream.next();
                    break;
                }
                _ => break,
            }
        }
        ast::IfCond {
            branches,
            else_body,
        }
    }

    fn parse_for_stmt(&mut self, target: &'a str, iter: &'a str) -> ast::ForLoop<'a> {
        let body = self.subparse(&|tag| matches!(tag, TagKind::End(_) | TagKind::Else));
        let else_body = match self.next_tag() {
            Some((TagKind::Else, _)) => {
                let rv = self.subparse(&|tag| matches!(tag, TagKind::End(_)));
                self.stream.next();
                rv
            }
            _ => Vec::new(),
        };
        ast::ForLoop {
            target,
            iter: Expression::parse(iter),
            body,
            else_body,
        }
    }

    /// Lowers a `case` block into an assignment and an `if`/`elsif` chain.
    fn parse_case(&mut self, expr: &'a str, span: Span, rv: &mut Vec<ast::Stmt<'a>>) {
        self.case_counter += 1;
        let temp = format!("__case_{}", self.case_counter);
        rv.push(ast::Stmt::Assign(Spanned::new(
            ast::Assign {
                target: Cow::Owned(temp.clone()),
                expr: Expression::parse(expr),
            },
            span,
        )));

        let branch_end =
            |tag: &TagKind| matches!(tag, TagKind::When(_) | TagKind::Else | TagKind::EndCase);
        rv.extend(self.subparse(&branch_end));

        let mut branches = Vec::new();
        let mut else_body = Vec::new();
        let mut chain_span = None;
        loop {
            match self.next_tag() {
                Some((TagKind::When(values), span)) => {
                    chain_span.get_or_insert(span);
                    let cond = when_condition(&temp, values);
                    let body = self.subparse(&branch_end);
                    branches.push(ast::CondBranch {
                        cond,
                        negated: false,
                        body,
                    });
                }
                Some((TagKind::Else, _)) => {
                    else_body = self.subparse(&|tag| matches!(tag, TagKind::EndCase));
                }
                _ => break,
            }
        }

        match chain_span {
            Some(span) => rv.push(ast::Stmt::IfCond(Spanned::new(
                ast::IfCond {
                    branches,
                    else_body,
                },
                self.stream.expand_span(span),
            ))),
            None => rv.extend(else_body),
        }
    }

    /// Skips a block that is nested too deeply, including its body.
    ///
    /// The opening tag is already consumed.  Openers and closers are only
    /// counted, nothing is parsed, so this does not recurse.
    fn skip_block(&mut self, raw: &str) {
        tracing::warn!(
            tag = raw,
            limit = MAX_NESTING,
            "dropping block nested too deeply"
        );
        let mut level = 1;
        while let Some((token, _)) = self.stream.next() {
            if let Token::Tag { body, .. } = token {
                match classify(body) {
                    TagKind::If(_) | TagKind::Unless(_) | TagKind::For { .. } | TagKind::Case(_) => {
                        level += 1
                    }
                    TagKind::End(_) | TagKind::EndCase => {
                        level -= 1;
                        if level == 0 {
                            return;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn parse_tag(
        &mut self,
        tag: TagKind<'a>,
        raw: &'a str,
        span: Span,
        rv: &mut Vec<ast::Stmt<'a>>,
    ) {
        match tag {
            TagKind::Raw | TagKind::When(_) | TagKind::EndCase => {
                rv.push(ast::Stmt::RawTag(Spanned::new(ast::RawTag { raw }, span)));
            }
            TagKind::Include(args) => {
                rv.push(ast::Stmt::Include(Spanned::new(parse_include(args), span)));
            }
            TagKind::If(_) | TagKind::Unless(_) | TagKind::For { .. } | TagKind::Case(_)
                if self.depth >= MAX_NESTING =>
            {
                self.skip_block(raw);
            }
            TagKind::If(cond) | TagKind::Unless(cond) => {
                let negated = matches!(tag, TagKind::Unless(_));
                self.depth += 1;
                let node = self.parse_if_cond(cond, negated);
                self.depth -= 1;
                rv.push(ast::Stmt::IfCond(Spanned::new(
                    node,
                    self.stream.expand_span(span),
                )));
            }
            TagKind::For { target, iter } => {
                self.depth += 1;
                let node = self.parse_for_stmt(target, iter);
                self.depth -= 1;
                rv.push(ast::Stmt::ForLoop(Spanned::new(
                    node,
                    self.stream.expand_span(span),
                )));
            }
            TagKind::Assign { target, expr } => {
                rv.push(ast::Stmt::Assign(Spanned::new(
                    ast::Assign {
                        target: Cow::Borrowed(target),
                        expr: Expression::parse(expr),
                    },
                    span,
                )));
            }
            TagKind::Case(expr) => {
                self.depth += 1;
                self.parse_case(expr, span, rv);
                self.depth -= 1;
            }
            TagKind::Elsif(_) | TagKind::Else | TagKind::End(_) => {
                tracing::trace!(tag = raw, "dropping unmatched tag");
            }
            TagKind::Malformed => {
                tracing::trace!(tag = raw, "dropping malformed control tag");
            }
        }
    }

    fn subparse(&mut self, end_check: &dyn Fn(&TagKind) -> bool) -> Vec<ast::Stmt<'a>> {
        let mut rv = Vec::new();
        while let Some((token, span)) = self.stream.current() {
            match token {
                Token::TemplateData(raw) => {
                    self.stream.next();
                    rv.push(ast::Stmt::EmitRaw(Spanned::new(ast::EmitRaw { raw }, span)));
                }
                Token::Output(source) => {
                    self.stream.next();
                    rv.push(ast::Stmt::EmitExpr(Spanned::new(
                        ast::EmitExpr {
                            expr: Expression::parse(source),
                        },
                        span,
                    )));
                }
                Token::Tag { body, raw } => {
                    let tag = classify(body);
                    if end_check(&tag) {
                        return rv;
                    }
                    self.stream.next();
                    self.parse_tag(tag, raw, span, &mut rv);
                }
            }
        }
        rv
    }

    pub fn parse(&mut self) -> ast::Stmt<'a> {
        let span = self.stream.current_span();
        let children = self.subparse(&|_| false);
        ast::Stmt::Template(Spanned::new(
            ast::Template { children },
            self.stream.expand_span(span),
        ))
    }
}

/// Parses a template.
///
/// Parsing never fails.  Tags the engine does not know are kept as
/// [`RawTag`](ast::RawTag) nodes, malformed control tags and closers without
/// an open block are dropped and blocks still open at the end of the input
/// are closed implicitly.
pub fn parse(source: &str) -> ast::Stmt<'_> {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fmt::Write;

    use similar_asserts::assert_eq;

    fn outline_into(stmts: &[ast::Stmt<'_>], depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        for stmt in stmts {
            match stmt {
                ast::Stmt::Template(t) => outline_into(&t.children, depth, out),
                ast::Stmt::EmitRaw(s) => writeln!(out, "{indent}raw {:?}", s.raw).unwrap(),
                ast::Stmt::EmitExpr(s) => writeln!(out, "{indent}out {:?}", s.expr).unwrap(),
                ast::Stmt::RawTag(s) => writeln!(out, "{indent}tag {}", s.raw).unwrap(),
                ast::Stmt::IfCond(s) => {
                    for (idx, branch) in s.branches.iter().enumerate() {
                        let kw = match (idx, branch.negated) {
                            (0, true) => "unless",
                            (0, false) => "if",
                            _ => "elsif",
                        };
                        writeln!(out, "{indent}{kw} {:?}", branch.cond).unwrap();
                        outline_into(&branch.body, depth + 1, out);
                    }
                    if !s.else_body.is_empty() {
                        writeln!(out, "{indent}else").unwrap();
                        outline_into(&s.else_body, depth + 1, out);
                    }
                }
                ast::Stmt::ForLoop(s) => {
                    writeln!(out, "{indent}for {} in {:?}", s.target, s.iter).unwrap();
                    outline_into(&s.body, depth + 1, out);
                    if !s.else_body.is_empty() {
                        writeln!(out, "{indent}else").unwrap();
                        outline_into(&s.else_body, depth + 1, out);
                    }
                }
                ast::Stmt::Assign(s) => {
                    writeln!(out, "{indent}assign {} = {:?}", s.target, s.expr).unwrap()
                }
                ast::Stmt::Include(s) => {
                    writeln!(out, "{indent}include {} {:?}", s.name, s.params).unwrap()
                }
            }
        }
    }

    fn outline(source: &str) -> String {
        let mut rv = String::new();
        outline_into(std::slice::from_ref(&parse(source)), 0, &mut rv);
        rv
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("if x"), TagKind::If("x"));
        assert_eq!(classify("if"), TagKind::Malformed);
        assert_eq!(classify("iffy"), TagKind::Malformed);
        assert_eq!(classify("else"), TagKind::Else);
        assert_eq!(classify("endunless"), TagKind::End("endunless"));
        assert_eq!(
            classify("for item in site.posts"),
            TagKind::For {
                target: "item",
                iter: "site.posts"
            }
        );
        assert_eq!(classify("for %}"), TagKind::Malformed);
        assert_eq!(
            classify("assign x = y | upcase"),
            TagKind::Assign {
                target: "x",
                expr: "y | upcase"
            }
        );
        assert_eq!(classify("assign x"), TagKind::Malformed);
        assert_eq!(classify("case"), TagKind::Raw);
        assert_eq!(classify("seo title=false"), TagKind::Raw);
        assert_eq!(classify("include"), TagKind::Raw);
    }

    #[test]
    fn test_include_params() {
        let include = parse_include(r#""card.html" title="A b" n=3 alt='x y' q=""#);
        assert_eq!(include.name, "card.html");
        assert_eq!(
            include.params,
            vec![("title", "A b"), ("n", "3"), ("alt", "x y"), ("q", "")]
        );

        let include = parse_include("footer a-b=1 junk c = d");
        assert_eq!(include.name, "footer");
        assert_eq!(include.params, vec![("b", "1"), ("c", "d")]);
    }

    #[test]
    fn test_if_chain() {
        assert_eq!(
            outline("{% if a %}A{% elsif b %}B{% else %}C{% endif %}!"),
            "if a\n  raw \"A\"\nelsif b\n  raw \"B\"\nelse\n  raw \"C\"\nraw \"!\"\n"
        );
    }

    #[test]
    fn test_leniency() {
        assert_eq!(
            outline("{% endfor %}{% if a %}{% for x in y %}{{ x }}{% endif %}after"),
            "if a\n  for x in y\n    out x\n  raw \"after\"\n"
        );
        assert_eq!(
            outline("{% unless a %}open"),
            "unless a\n  raw \"open\"\n"
        );
        assert_eq!(outline("{% for %}x{% assign y %}"), "raw \"x\"\n");
    }

    #[test]
    fn test_raw_tags() {
        assert_eq!(
            outline("{%  seo  title=false -%} {% when x %}{% endcase %}"),
            "tag {%  seo  title=false -%}\ntag {% when x %}\ntag {% endcase %}\n"
        );
    }

    #[test]
    fn test_for_else() {
        assert_eq!(
            outline("{% for p in posts %}{{ p }}{% else %}none{% endfor %}"),
            "for p in posts\n  out p\nelse\n  raw \"none\"\n"
        );
    }

    #[test]
    fn test_case_lowering() {
        assert_eq!(
            outline(
                "{% case s %}lead{% when 'open' %}A{% when 'closed', 'archived' %}B\
                 {% else %}C{% endcase %}"
            ),
            "assign __case_1 = s\n\
             raw \"lead\"\n\
             if __case_1 == \"open\"\n  raw \"A\"\n\
             elsif __case_1 == \"closed\" or __case_1 == \"archived\"\n  raw \"B\"\n\
             else\n  raw \"C\"\n"
        );
    }

    #[test]
    fn test_nested_case_counters() {
        assert_eq!(
            outline(
                "{% case a %}{% when 1 %}{% case b %}{% when 2 or 3 %}x{% endcase %}\
                 {% endcase %}{% case c %}{% endcase %}"
            ),
            "assign __case_1 = a\n\
             if __case_1 == 1\n\
             \x20 assign __case_2 = b\n\
             \x20 if __case_2 == 2 or __case_2 == 3\n\
             \x20   raw \"x\"\n\
             assign __case_3 = c\n"
        );
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!(
            "{}x{}after",
            "{% if a %}".repeat(200),
            "{% endif %}".repeat(200)
        );
        let rv = outline(&source);
        assert_eq!(
            rv.lines().filter(|line| line.trim_start() == "if a").count(),
            MAX_NESTING
        );
        assert!(!rv.contains("raw \"x\""));
        assert!(rv.ends_with("\nraw \"after\"\n"));
    }
}
