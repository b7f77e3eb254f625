//! Sentence segmentation
//!
//! Rule-based splitting for extracted document text. A sentence ends at
//! `.`, `!` or `?` (plus any closing quotes or brackets) followed by
//! whitespace, unless the period belongs to a known abbreviation or an
//! initial, or the next word starts lowercase. A blank line always ends a
//! sentence, which keeps headings apart from the paragraph below them.

use std::collections::HashSet;

/// Abbreviations that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "cf", "al", "fig",
    "figs", "eq", "approx", "dept", "est", "u.s", "u.k", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// Splits text into trimmed, non-empty sentences.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    abbreviations: HashSet<String>,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self {
            abbreviations: ABBREVIATIONS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Add abbreviations (case-insensitive, without the trailing period).
    pub fn with_abbreviations<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.abbreviations
            .extend(extra.into_iter().map(|a| a.as_ref().trim_end_matches('.').to_lowercase()));
        self
    }

    /// Iterate over the sentences of `text`. The iterator is single-pass.
    pub fn split<'a>(&'a self, text: &'a str) -> Sentences<'a> {
        Sentences {
            splitter: self,
            text,
            pos: 0,
        }
    }

    /// Returns (end of sentence, where the next one starts), as byte offsets.
    fn find_boundary(&self, text: &str) -> (usize, usize) {
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '\n' => {
                    let rest = text[i + 1..].trim_start_matches([' ', '\t', '\r']);
                    if rest.starts_with('\n') {
                        let resume = text.len() - rest.len() + 1;
                        return (i, resume);
                    }
                }
                '.' | '!' | '?' => {
                    let mut end = i + c.len_utf8();
                    while let Some(&(j, next)) = chars.peek() {
                        if !is_terminator(next) && !is_closer(next) {
                            break;
                        }
                        end = j + next.len_utf8();
                        chars.next();
                    }

                    let following = &text[end..];
                    match following.chars().next() {
                        None => return (end, end),
                        Some(n) if n.is_whitespace() => {
                            if c == '.' && self.is_abbreviation(&text[..i]) {
                                continue;
                            }
                            if starts_lowercase(following) {
                                continue;
                            }
                            return (end, end);
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }
        }

        (text.len(), text.len())
    }

    /// Whether the word right before a period is an abbreviation or initial.
    fn is_abbreviation(&self, before: &str) -> bool {
        let word = before
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_start_matches(|c: char| !c.is_alphanumeric());
        if word.is_empty() {
            return false;
        }

        let mut chars = word.chars();
        if let (Some(only), None) = (chars.next(), chars.next()) {
            if only.is_alphabetic() {
                return true;
            }
        }
        self.abbreviations.contains(&word.to_lowercase())
    }
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-pass iterator over sentences.
pub struct Sentences<'a> {
    splitter: &'a SentenceSplitter,
    text: &'a str,
    pos: usize,
}

impl Iterator for Sentences<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let (end, resume) = self.splitter.find_boundary(rest);
            let sentence = collapse_whitespace(&rest[..end]);
            self.pos += resume.max(1).min(rest.len());
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
        None
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

fn starts_lowercase(text: &str) -> bool {
    text.trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
