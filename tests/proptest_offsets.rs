use bigbio::offsets::{CharIndex, PassageCursor, TokenOffsets};
use bigbio::schema::{KbDocument, Passage};
use proptest::prelude::*;

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn joined_tokens_slice_back(tokens in proptest_helpers::arb_words(12)) {
        let (text, table) = TokenOffsets::joined(&tokens);
        let index = CharIndex::new(&text);

        prop_assert_eq!(table.len(), tokens.len());
        for (idx, token) in tokens.iter().enumerate() {
            let span = table.get(idx).expect("joined tokens always resolve");
            prop_assert_eq!(index.slice(span), Some(token.as_str()));
        }
    }

    #[test]
    fn aligned_tokens_are_ordered_and_exact(
        tokens in proptest_helpers::arb_words(12),
        gaps in prop::collection::vec(1usize..4, 12),
    ) {
        let mut text = String::new();
        for (idx, token) in tokens.iter().enumerate() {
            text.push_str(&" ".repeat(gaps[idx]));
            text.push_str(token);
        }
        let table = TokenOffsets::align(&text, &tokens);
        let index = CharIndex::new(&text);

        prop_assert_eq!(table.unresolved(), 0);
        let mut previous_end = 0;
        for (idx, token) in tokens.iter().enumerate() {
            let span = table.get(idx).expect("every token occurs in the text");
            prop_assert!(span.start >= previous_end);
            prop_assert_eq!(index.slice(span), Some(token.as_str()));
            previous_end = span.end;
        }
    }

    #[test]
    fn cursor_layout_reconstructs_passages(
        passages in prop::collection::vec("[a-zé ]{0,12}", 1..6)
    ) {
        let mut cursor = PassageCursor::new();
        let mut doc = KbDocument::new("0", "doc");
        let mut previous_end = None;
        for (idx, text) in passages.iter().enumerate() {
            let span = cursor.push(text);
            if let Some(end) = previous_end {
                prop_assert!(span.start > end);
            }
            previous_end = Some(span.end);
            doc.passages.push(Passage::new(format!("p{idx}"), "sentence", text.clone(), span));
        }

        let full = doc.text();
        let index = CharIndex::new(&full);
        for passage in &doc.passages {
            prop_assert_eq!(index.slice(passage.offsets[0]), Some(passage.text[0].as_str()));
        }
    }
}
