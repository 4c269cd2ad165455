//! Static interval index for overlap queries.

use crate::schema::Span;

/// Spans sorted by start with a running maximum of their ends.
///
/// A query binary-searches the last span starting before the query end and
/// walks left until the running maximum shows no earlier span can reach the
/// query start.
#[derive(Clone, Debug, Default)]
pub struct IntervalIndex {
    spans: Vec<(Span, usize)>,
    max_end: Vec<usize>,
}

impl IntervalIndex {
    /// Builds an index over `(span, payload)` pairs.
    pub fn new(mut spans: Vec<(Span, usize)>) -> Self {
        spans.sort_unstable();
        let mut max_end = Vec::with_capacity(spans.len());
        let mut running = 0;
        for (span, _) in &spans {
            running = running.max(span.end);
            max_end.push(running);
        }
        Self { spans, max_end }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Payloads of every span sharing at least one character with `query`,
    /// in ascending payload order without duplicates.
    pub fn overlapping(&self, query: Span) -> Vec<usize> {
        if query.is_empty() {
            return Vec::new();
        }
        let upper = self.spans.partition_point(|(span, _)| span.start < query.end);

        let mut found = Vec::new();
        for idx in (0..upper).rev() {
            if self.max_end[idx] <= query.start {
                break;
            }
            let (span, payload) = self.spans[idx];
            if span.end > query.start && !span.is_empty() {
                found.push(payload);
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(spans: &[(Span, usize)], query: Span) -> Vec<usize> {
        let mut found: Vec<usize> = spans
            .iter()
            .filter(|(span, _)| span.overlaps(&query))
            .map(|(_, payload)| *payload)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    #[test]
    fn matches_brute_force() {
        let spans = vec![
            (Span::new(0, 4), 0),
            (Span::new(2, 30), 1),
            (Span::new(5, 6), 2),
            (Span::new(10, 12), 3),
            (Span::new(11, 11), 4),
            (Span::new(25, 40), 5),
            (Span::new(10, 12), 6),
        ];
        let index = IntervalIndex::new(spans.clone());
        for start in 0..42 {
            for end in start..43 {
                let query = Span::new(start, end);
                assert_eq!(
                    index.overlapping(query),
                    brute_force(&spans, query),
                    "query {query:?}"
                );
            }
        }
    }

    #[test]
    fn touching_spans_do_not_overlap() {
        let index = IntervalIndex::new(vec![(Span::new(0, 5), 0), (Span::new(5, 9), 1)]);
        assert_eq!(index.overlapping(Span::new(5, 6)), vec![1]);
        assert_eq!(index.overlapping(Span::new(4, 5)), vec![0]);
        assert!(index.overlapping(Span::new(9, 12)).is_empty());
    }
}
