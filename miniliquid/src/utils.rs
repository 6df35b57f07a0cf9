use std::collections::BTreeMap;
use std::fmt;

pub fn memchr(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|&x| x == needle)
}

pub fn memstr(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits off the first whitespace separated word.
pub fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

/// Tracks string literals and parentheses while walking over an expression.
///
/// A quote is closed by the same quote character unless it is preceded by
/// a backslash.  Unbalanced closing parentheses are ignored.
#[derive(Default)]
struct Scanner {
    quote: Option<char>,
    depth: usize,
    prev: Option<char>,
}

impl Scanner {
    /// Feeds the next character, returns `true` if it is at the top level.
    fn feed(&mut self, c: char) -> bool {
        let top_level = match self.quote {
            Some(quote) => {
                if c == quote && self.prev != Some('\\') {
                    self.quote = None;
                }
                false
            }
            None => match c {
                '"' | '\'' => {
                    self.quote = Some(c);
                    false
                }
                '(' => {
                    self.depth += 1;
                    false
                }
                ')' => {
                    self.depth = self.depth.saturating_sub(1);
                    false
                }
                _ => self.depth == 0,
            },
        };
        self.prev = Some(c);
        top_level
    }
}

fn top_level_indices(s: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut scanner = Scanner::default();
    s.char_indices().filter(move |&(_, c)| scanner.feed(c))
}

/// Splits on a separator that is outside of quotes and parentheses.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut rv = Vec::new();
    let mut last = 0;
    for (idx, c) in top_level_indices(s) {
        if c == sep {
            rv.push(&s[last..idx]);
            last = idx + sep.len_utf8();
        }
    }
    rv.push(&s[last..]);
    rv
}

/// Splits filter arguments on top level commas.
///
/// Arguments are trimmed.  Empty arguments in between are kept, only a
/// trailing empty argument is dropped.
pub fn split_arguments(s: &str) -> Vec<&str> {
    let mut rv: Vec<&str> = split_top_level(s, ',').into_iter().map(str::trim).collect();
    if rv.last().map_or(false, |x| x.is_empty()) {
        rv.pop();
    }
    rv
}

/// Finds the first top level occurrence of an operator.
pub fn find_top_level(s: &str, needle: &str) -> Option<usize> {
    top_level_indices(s)
        .map(|(idx, _)| idx)
        .find(|&idx| s[idx..].starts_with(needle))
}

/// Finds the first top level occurrence of a keyword surrounded by whitespace.
pub fn find_top_level_word(s: &str, word: &str) -> Option<usize> {
    top_level_indices(s).map(|(idx, _)| idx).find(|&idx| {
        s[idx..].starts_with(word)
            && s[..idx].ends_with(char::is_whitespace)
            && s[idx + word.len()..].starts_with(char::is_whitespace)
    })
}

/// Splits on every top level occurrence of a keyword surrounded by whitespace.
pub fn split_top_level_word<'s>(mut s: &'s str, word: &str) -> Vec<&'s str> {
    let mut rv = Vec::new();
    while let Some(idx) = find_top_level_word(s, word) {
        rv.push(&s[..idx]);
        s = &s[idx + word.len()..];
    }
    rv.push(s);
    rv
}

/// Removes one layer of matching-style quotes (`"…"` or `'…'`).
pub fn strip_quotes(s: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    if s.starts_with(is_quote) && s.ends_with(is_quote) {
        s.get(1..s.len().saturating_sub(1)).unwrap_or("")
    } else {
        s
    }
}

pub struct BTreeMapKeysDebug<'a, K: fmt::Debug, V>(pub &'a BTreeMap<K, V>);

impl<'a, K: fmt::Debug, V> fmt::Debug for BTreeMapKeysDebug<'a, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|x| x.0)).finish()
    }
}
