/// Monotonic counter handing out block numbers.
///
/// A number is only consumed through [`Sequence::advance`], so a caller can peek at the
/// next one, attempt a write, and leave the sequence untouched if that write fails.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    next: u32,
}

impl Sequence {
    pub fn starting_at(first: u32) -> Self {
        Sequence { next: first }
    }

    pub fn peek(&self) -> u32 {
        self.next
    }

    pub fn advance(&mut self) -> u32 {
        let current = self.next;
        self.next += 1;
        current
    }
}
