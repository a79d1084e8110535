use model::records::{
    CatalogRecord,
    batch::{Batch, BatchEntry},
};

/// Groups validated records into fixed-size, numbered batches.
///
/// Batch numbers start at `first_number` and grow by one per sealed batch.
/// A resumed run starts at its resume offset and never sees the skipped
/// prefix, so its first batch carries the number it had in the original run.
#[derive(Debug)]
pub struct Batcher<T> {
    batch_size: usize,
    next_number: u64,
    entries: Vec<BatchEntry<T>>,
}

impl<T: CatalogRecord> Batcher<T> {
    pub fn new(batch_size: usize) -> Self {
        Self::starting_at(batch_size, 0)
    }

    pub fn starting_at(batch_size: usize, first_number: u64) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            next_number: first_number,
            entries: Vec::with_capacity(batch_size),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number the next sealed batch will carry.
    pub fn next_number(&self) -> u64 {
        self.next_number
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Appends a record, sealing and returning the batch once it is full.
    pub fn push(&mut self, position: u64, record: T) -> Option<Batch<T>> {
        self.entries.push(BatchEntry { position, record });
        if self.entries.len() >= self.batch_size {
            self.seal()
        } else {
            None
        }
    }

    /// Seals whatever is left, if anything.
    pub fn finish(&mut self) -> Option<Batch<T>> {
        self.seal()
    }

    fn seal(&mut self) -> Option<Batch<T>> {
        if self.entries.is_empty() {
            return None;
        }

        let entries = std::mem::replace(&mut self.entries, Vec::with_capacity(self.batch_size));
        let batch = Batch::new(self.next_number, entries);
        self.next_number += 1;
        Some(batch)
    }
}
