//! Fixed-size batching of input records

use std::num::NonZeroUsize;

/// An ordered, non-empty group of raw records submitted in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    records: Vec<String>,
}

impl Batch {
    /// Zero-based position of this batch in the input.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for batches produced by [`Batcher`].
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn into_records(self) -> Vec<String> {
        self.records
    }
}

/// Groups a stream of lines into [`Batch`]es of `limit` records.
///
/// Every batch holds exactly `limit` records except the last one, which holds
/// the remainder when the line count is not a multiple of `limit`. Batches
/// are emitted in input order and are never empty.
///
/// The source yields `Result`s so read errors can surface mid-stream. After an
/// error the batcher is fused: records buffered for the unfinished batch are
/// dropped and no further batches are produced.
///
/// # Example
/// ```
/// use couchdb_bulk_loader::etl::Batcher;
/// use std::num::NonZeroUsize;
///
/// let lines = (0..5).map(|i| Ok::<_, std::io::Error>(i.to_string()));
/// let sizes: Vec<usize> = Batcher::new(lines, NonZeroUsize::new(2).unwrap())
///     .map(|batch| batch.unwrap().len())
///     .collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
pub struct Batcher<I> {
    lines: I,
    limit: NonZeroUsize,
    next_index: usize,
    done: bool,
}

impl<I> Batcher<I> {
    pub fn new(lines: I, limit: NonZeroUsize) -> Self {
        Self {
            lines,
            limit,
            next_index: 0,
            done: false,
        }
    }
}

impl<I, E> Iterator for Batcher<I>
where
    I: Iterator<Item = Result<String, E>>,
{
    type Item = Result<Batch, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let limit = self.limit.get();
        let mut records = Vec::with_capacity(limit.min(1024));

        while records.len() < limit {
            match self.lines.next() {
                Some(Ok(line)) => records.push(line),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if records.is_empty() {
            return None;
        }

        let batch = Batch {
            index: self.next_index,
            records,
        };
        self.next_index += 1;
        Some(Ok(batch))
    }
}
