//! Synthetic identifiers for projected records.
//!
//! The generator is a plain owned counter: callers create one per split load
//! and pass it down explicitly, so ids are unique within everything produced
//! from that generator and nothing is shared between loads.

/// Incrementing id source.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    /// Creates a generator starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator starting at `start`.
    pub fn starting_at(start: u64) -> Self {
        Self { next: start }
    }

    /// Returns the next id as a string and advances the counter.
    pub fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }

    /// The value the next id will carry.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increment() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id(), "0");
        assert_eq!(ids.next_id(), "1");
        assert_eq!(ids.peek(), 2);
    }

    #[test]
    fn generators_are_independent() {
        let mut a = IdGenerator::starting_at(10);
        let mut b = IdGenerator::new();
        assert_eq!(a.next_id(), "10");
        assert_eq!(b.next_id(), "0");
        assert_eq!(a.next_id(), "11");
    }
}
