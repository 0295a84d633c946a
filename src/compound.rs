//! Merges inclusion iterators and subtracts exclusion iterators.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::iterator::RecurrenceIterator;
use crate::values::DateValue;

pub type BoxedIterator = Box<dyn RecurrenceIterator + Send>;

/// The union of the inclusions minus the union of the exclusions.
///
/// Inclusions are merged through a min-heap keyed on each one's next
/// instant. An instant produced by several inclusions is emitted once, and an
/// instant equal to the next value of any exclusion is dropped.
#[derive(Debug)]
pub struct CompoundIterator {
    inclusions: Vec<BoxedIterator>,
    exclusions: Vec<BoxedIterator>,
    heap: BinaryHeap<Reverse<(DateValue, usize)>>,
    last: Option<DateValue>,
    pending: Option<DateValue>,
}

impl CompoundIterator {
    pub fn new(inclusions: Vec<BoxedIterator>, exclusions: Vec<BoxedIterator>) -> Self {
        let mut compound = CompoundIterator {
            inclusions,
            exclusions,
            heap: BinaryHeap::new(),
            last: None,
            pending: None,
        };
        compound.rebuild_heap();
        compound
    }

    pub fn inclusion_count(&self) -> usize {
        self.inclusions.len()
    }

    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }

    fn rebuild_heap(&mut self) {
        self.heap = self
            .inclusions
            .iter_mut()
            .enumerate()
            .filter_map(|(i, iter)| iter.peek().map(|value| Reverse((value, i))))
            .collect();
    }

    fn pop_inclusion(&mut self) -> Option<DateValue> {
        let Reverse((value, i)) = self.heap.pop()?;
        let iter = &mut self.inclusions[i];
        iter.next();
        if let Some(next) = iter.peek() {
            self.heap.push(Reverse((next, i)));
        }
        Some(value)
    }

    fn is_excluded(&mut self, value: DateValue) -> bool {
        self.exclusions.iter_mut().any(|exclusion| {
            exclusion.advance_to(value);
            exclusion.peek() == Some(value)
        })
    }

    fn produce(&mut self) -> Option<DateValue> {
        loop {
            let value = self.pop_inclusion()?;
            if self.last.map_or(false, |last| value <= last) {
                continue;
            }
            self.last = Some(value);

            if !self.is_excluded(value) {
                return Some(value);
            }
        }
    }
}

impl Iterator for CompoundIterator {
    type Item = DateValue;

    fn next(&mut self) -> Option<DateValue> {
        match self.pending.take() {
            Some(value) => Some(value),
            None => self.produce(),
        }
    }
}

impl RecurrenceIterator for CompoundIterator {
    fn peek(&mut self) -> Option<DateValue> {
        if self.pending.is_none() {
            self.pending = self.produce();
        }
        self.pending
    }

    fn advance_to(&mut self, date: DateValue) {
        if let Some(pending) = self.pending {
            if pending >= date {
                return;
            }
            self.pending = None;
        }

        for iter in self.inclusions.iter_mut().chain(self.exclusions.iter_mut()) {
            iter.advance_to(date);
        }
        self.rebuild_heap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use crate::iterator::RDateIterator;

    fn dates(text: &str) -> BoxedIterator {
        Box::new(RDateIterator::from_str(text).unwrap())
    }

    fn render(iter: CompoundIterator) -> String {
        iter.map(|d| d.to_string()).collect::<Vec<_>>().join(",")
    }

    #[test]
    fn merges_and_deduplicates() {
        let iter = CompoundIterator::new(
            vec![dates("20060418,20070101"), dates("20060422,20060418,20060412")],
            vec![],
        );
        assert_eq!(render(iter), "20060412,20060418,20060422,20070101");
    }

    #[test]
    fn exclusions_win() {
        let iter = CompoundIterator::new(
            vec![dates("20060411,20060412,20060413")],
            vec![dates("20060412"), dates("20060413,20060501")],
        );
        assert_eq!(render(iter), "20060411");
    }

    #[test]
    fn peek_then_advance() {
        let mut iter = CompoundIterator::new(
            vec![dates("20060411,20060412,20060420"), dates("20060415")],
            vec![dates("20060415")],
        );
        assert_eq!(iter.peek(), Some(DateValue::date(2006, 4, 11)));
        iter.advance_to(DateValue::date(2006, 4, 11));
        assert_eq!(iter.peek(), Some(DateValue::date(2006, 4, 11)));
        iter.advance_to(DateValue::date(2006, 4, 13));
        assert_eq!(render(iter), "20060420");
    }

    #[test]
    fn empty() {
        let mut iter = CompoundIterator::new(vec![], vec![dates("20060101")]);
        assert!(!iter.has_next());
        assert_eq!(iter.next(), None);
    }
}
