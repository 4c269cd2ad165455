//! Character offset reconciliation.
//!
//! Corpora disagree on coordinates: BRAT and PubTator give document-level
//! character offsets, BioC may give passage-local ones, CoNLL gives only
//! token positions. Everything here converts into document-level character
//! offsets (Unicode scalar values, not bytes) so that slicing the document
//! text at an entity's offsets reproduces the entity's surface text.
//!
//! ```text
//!   passages:   "Title"  ' '  "Patients received aspirin daily."
//!   cursor:     [0, 5)        [6, 38)
//!   tokens:                   Patients received aspirin daily .
//!   token idx:                0        1        2       3     4
//!   token 2 → sentence [18, 25) → document [24, 31)
//! ```

use crate::schema::Span;

/// Number of characters (not bytes) in `text`.
#[inline]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Char ↔ byte lookup for one text.
///
/// Pre-computes a boundary table once so each conversion is a lookup rather
/// than a rescan. ASCII text needs no table at all.
#[derive(Clone, Debug)]
pub struct CharIndex<'a> {
    text: &'a str,
    /// Byte offset of every char boundary, including the final one.
    /// Empty for ASCII text, where chars and bytes coincide.
    boundaries: Vec<usize>,
    char_len: usize,
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        if text.is_ascii() {
            return Self {
                text,
                boundaries: Vec::new(),
                char_len: text.len(),
            };
        }

        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        let char_len = boundaries.len();
        boundaries.push(text.len());
        Self {
            text,
            boundaries,
            char_len,
        }
    }

    /// The indexed text.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length of the text in characters.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Byte offset of a char offset, or `None` past the end.
    pub fn byte_offset(&self, char_idx: usize) -> Option<usize> {
        if char_idx > self.char_len {
            return None;
        }
        if self.boundaries.is_empty() {
            Some(char_idx)
        } else {
            self.boundaries.get(char_idx).copied()
        }
    }

    /// Char offset of a byte offset that falls on a char boundary.
    pub fn char_offset(&self, byte_idx: usize) -> Option<usize> {
        if self.boundaries.is_empty() {
            return (byte_idx <= self.text.len()).then_some(byte_idx);
        }
        self.boundaries.binary_search(&byte_idx).ok()
    }

    /// Text covered by a char span; `None` if out of bounds or inverted.
    pub fn slice(&self, span: Span) -> Option<&'a str> {
        if !span.is_ordered() {
            return None;
        }
        let start = self.byte_offset(span.start)?;
        let end = self.byte_offset(span.end)?;
        self.text.get(start..end)
    }

    /// Joins the text of several spans with single spaces, the comparison
    /// form used for discontinuous mentions.
    pub fn slice_joined(&self, spans: &[Span]) -> Option<String> {
        let parts = spans
            .iter()
            .map(|span| self.slice(*span))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join(" "))
    }

    /// First occurrence of `needle` starting at or after char `from`.
    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let from_byte = self.byte_offset(from)?;
        let found = self.text[from_byte..].find(needle)?;
        self.char_offset(from_byte + found)
    }

    /// Char offsets of every occurrence of `needle` (overlapping matches
    /// included).
    pub fn find_all(&self, needle: &str) -> Vec<usize> {
        let mut found = Vec::new();
        let mut from = 0;
        while let Some(pos) = self.find(needle, from) {
            found.push(pos);
            from = pos + 1;
        }
        found
    }
}

/// Running cursor that lays passages out one after another.
///
/// Each pushed passage occupies `[cursor, cursor + len)`; the cursor then
/// advances past the passage plus a separator (one character by default,
/// the space or newline that joins title and abstract).
#[derive(Clone, Debug)]
pub struct PassageCursor {
    cursor: usize,
    separator_len: usize,
}

impl Default for PassageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PassageCursor {
    pub fn new() -> Self {
        Self::with_separator_len(1)
    }

    pub fn with_separator_len(separator_len: usize) -> Self {
        Self {
            cursor: 0,
            separator_len,
        }
    }

    /// Places a passage and returns its span.
    pub fn push(&mut self, text: &str) -> Span {
        let start = self.cursor;
        let end = start + char_len(text);
        self.cursor = end + self.separator_len;
        Span::new(start, end)
    }

    /// Where the next passage will start.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

/// Splits the surface text of a discontinuous mention into one chunk per
/// span.
///
/// Annotation tools store a single string for a mention made of several
/// ranges. Each range contributes `end - start` characters; spaces between
/// chunks are skipped. Contiguous mentions keep their text unchanged.
pub fn split_discontinuous_text(text: &str, spans: &[Span]) -> Vec<String> {
    if spans.len() <= 1 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::with_capacity(spans.len());
    let mut i = 0;
    for span in spans {
        let end = (i + span.len()).min(chars.len());
        chunks.push(chars[i.min(end)..end].iter().collect());
        i = end;
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
    }
    chunks
}

/// Token index → character span table for one sentence.
///
/// Built once by scanning the tokens left to right through the sentence
/// text, so repeated substrings resolve to the occurrence at the token's
/// position rather than the first occurrence in the sentence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenOffsets {
    spans: Vec<Option<Span>>,
}

impl TokenOffsets {
    /// Aligns `tokens` against `text`.
    ///
    /// Tokens that do not occur in the remaining text (normalized
    /// punctuation like `-LRB-`, for instance) are left unresolved and do not
    /// move the scan position.
    pub fn align<S: AsRef<str>>(text: &str, tokens: &[S]) -> Self {
        let index = CharIndex::new(text);
        let mut cursor = 0;
        let spans = tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                let start = index.find(token, cursor)?;
                let end = start + char_len(token);
                cursor = end;
                Some(Span::new(start, end))
            })
            .collect();
        Self { spans }
    }

    /// Joins tokens with single spaces and returns the sentence text with an
    /// exact table.
    pub fn joined<S: AsRef<str>>(tokens: &[S]) -> (String, Self) {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(tokens.len());
        let mut cursor = 0;
        for (idx, token) in tokens.iter().enumerate() {
            if idx > 0 {
                text.push(' ');
                cursor += 1;
            }
            let token = token.as_ref();
            text.push_str(token);
            let end = cursor + char_len(token);
            spans.push(Some(Span::new(cursor, end)));
            cursor = end;
        }
        (text, Self { spans })
    }

    /// Span of a single token.
    pub fn get(&self, token_idx: usize) -> Option<Span> {
        self.spans.get(token_idx).copied().flatten()
    }

    /// Char span covering tokens `first..=last`.
    pub fn span(&self, first: usize, last: usize) -> Option<Span> {
        if first > last {
            return None;
        }
        let start = self.get(first)?.start;
        let end = self.get(last)?.end;
        Some(Span::new(start, end))
    }

    /// Number of tokens in the table.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of tokens that could not be aligned.
    pub fn unresolved(&self) -> usize {
        self.spans.iter().filter(|span| span.is_none()).count()
    }
}

/// Finds mention surface strings in a text when no reliable span is known.
///
/// Each located span is marked consumed, so two mentions with the same
/// surface text land on two different occurrences. This is best effort: it
/// can still pick the wrong occurrence when the hint is missing.
#[derive(Clone, Debug)]
pub struct MentionLocator<'a> {
    index: CharIndex<'a>,
    consumed: Vec<Span>,
}

impl<'a> MentionLocator<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            index: CharIndex::new(text),
            consumed: Vec::new(),
        }
    }

    /// Marks a span resolved by other means, so searches skip it.
    pub fn consume(&mut self, span: Span) {
        self.consumed.push(span);
    }

    /// Locates `surface`, preferring the first unconsumed occurrence at or
    /// after `hint`, then the first unconsumed occurrence anywhere.
    pub fn locate(&mut self, surface: &str, hint: Option<usize>) -> Option<Span> {
        let len = char_len(surface);
        let candidates: Vec<Span> = self
            .index
            .find_all(surface)
            .into_iter()
            .map(|start| Span::new(start, start + len))
            .filter(|span| !self.consumed.contains(span))
            .collect();

        let chosen = hint
            .and_then(|hint| candidates.iter().find(|span| span.start >= hint))
            .or_else(|| candidates.first())
            .copied()?;

        self.consumed.push(chosen);
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_index_slices_multibyte_text() {
        let text = "The café costs €50";
        let index = CharIndex::new(text);
        assert_eq!(index.len(), 18);
        assert_eq!(index.slice(Span::new(4, 8)), Some("café"));
        assert_eq!(index.slice(Span::new(15, 18)), Some("€50"));
        assert_eq!(index.slice(Span::new(15, 19)), None);
        assert_eq!(index.find("€", 0), Some(15));
    }

    #[test]
    fn char_index_ascii_is_identity() {
        let index = CharIndex::new("abc def");
        assert_eq!(index.byte_offset(4), Some(4));
        assert_eq!(index.char_offset(4), Some(4));
        assert_eq!(index.find_all("d"), vec![4]);
    }

    #[test]
    fn cursor_accounts_for_separator() {
        let mut cursor = PassageCursor::new();
        assert_eq!(cursor.push("Title"), Span::new(0, 5));
        assert_eq!(cursor.push("Abstract."), Span::new(6, 15));
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn cursor_handles_empty_passage() {
        let mut cursor = PassageCursor::new();
        assert_eq!(cursor.push(""), Span::new(0, 0));
        assert_eq!(cursor.push("x"), Span::new(1, 2));
    }

    #[test]
    fn token_index_resolves_to_document_offsets() {
        let sentence = "Patients received aspirin daily.";
        let tokens = ["Patients", "received", "aspirin", "daily", "."];

        let mut cursor = PassageCursor::new();
        let _title = cursor.push("");
        let passage = cursor.push(sentence);

        let table = TokenOffsets::align(sentence, &tokens);
        let span = table.span(2, 2).unwrap().shifted(passage.start);
        assert_eq!(span, Span::new(19, 26));

        let document = format!("{} {}", "", sentence);
        assert_eq!(CharIndex::new(&document).slice(span), Some("aspirin"));
    }

    #[test]
    fn align_uses_token_position_for_repeated_words() {
        let sentence = "IL-2 and IL-2R bind IL-2";
        let tokens = ["IL-2", "and", "IL-2R", "bind", "IL-2"];
        let table = TokenOffsets::align(sentence, &tokens);
        assert_eq!(table.get(4), Some(Span::new(20, 24)));
        assert_eq!(table.unresolved(), 0);
    }

    #[test]
    fn align_leaves_normalized_tokens_unresolved() {
        let table = TokenOffsets::align("f(x) = 1", &["f", "-LRB-", "x", ")"]);
        assert_eq!(table.get(1), None);
        assert_eq!(table.get(2), Some(Span::new(2, 3)));
        assert_eq!(table.span(0, 2), Some(Span::new(0, 3)));
        assert_eq!(table.span(1, 2), None);
        assert_eq!(table.unresolved(), 1);
    }

    #[test]
    fn joined_table_matches_text() {
        let (text, table) = TokenOffsets::joined(&["BRCA1", "mutations"]);
        assert_eq!(text, "BRCA1 mutations");
        assert_eq!(table.span(0, 1), Some(Span::new(0, 15)));
    }

    #[test]
    fn discontinuous_text_is_split_per_span() {
        let chunks =
            split_discontinuous_text("left ventricle", &[Span::new(0, 4), Span::new(20, 29)]);
        assert_eq!(chunks, vec!["left", "ventricle"]);

        let single = split_discontinuous_text("breast cancer", &[Span::new(3, 16)]);
        assert_eq!(single, vec!["breast cancer"]);
    }

    #[test]
    fn locator_skips_consumed_occurrences() {
        let mut locator = MentionLocator::new("TNF binds TNF receptor and TNF");
        assert_eq!(locator.locate("TNF", None), Some(Span::new(0, 3)));
        assert_eq!(locator.locate("TNF", None), Some(Span::new(10, 13)));
        assert_eq!(locator.locate("TNF", Some(5)), Some(Span::new(27, 30)));
        assert_eq!(locator.locate("TNF", None), None);
    }

    #[test]
    fn locator_prefers_hint() {
        let mut locator = MentionLocator::new("p53 and p53");
        assert_eq!(locator.locate("p53", Some(4)), Some(Span::new(8, 11)));
        assert_eq!(locator.locate("p53", Some(4)), Some(Span::new(0, 3)));
    }
}
