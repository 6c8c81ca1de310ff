//! Result aggregation for a batch.
//!
//! The aggregator owns a slot per submitted job, indexed by submission
//! order. Results arrive in completion order from concurrent workers;
//! `finalize` hands back a [`ResultSet`] in submission order regardless.

use std::sync::Mutex;

use crate::core::{JobResult, ResultSet};
use crate::{Error, Result};

/// Thread-safe, slot-indexed collector of job results.
pub struct ResultAggregator {
    slots: Mutex<Vec<Option<JobResult>>>,
}

impl ResultAggregator {
    /// Create an aggregator expecting exactly `expected` results.
    pub fn new(expected: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; expected]),
        }
    }

    pub fn expected(&self) -> usize {
        self.slots.lock().expect("aggregator lock poisoned").len()
    }

    /// Record the terminal result for submission slot `index`.
    ///
    /// # Errors
    ///
    /// Fails if the slot is out of range or already filled; both indicate
    /// a bug in the worker pool and are fatal to the batch.
    pub fn record(&self, index: usize, result: JobResult) -> Result<()> {
        let mut slots = self.slots.lock().expect("aggregator lock poisoned");
        let expected = slots.len();
        match slots.get_mut(index) {
            None => Err(Error::SlotOutOfRange { index, expected }),
            Some(slot) if slot.is_some() => Err(Error::DuplicateResult { index }),
            Some(slot) => {
                *slot = Some(result);
                Ok(())
            }
        }
    }

    /// Number of results recorded so far.
    pub fn recorded(&self) -> usize {
        self.slots
            .lock()
            .expect("aggregator lock poisoned")
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots
            .lock()
            .expect("aggregator lock poisoned")
            .iter()
            .all(|s| s.is_some())
    }

    /// Consume the aggregator, producing the submission-ordered result set.
    ///
    /// # Errors
    ///
    /// Fails if any slot is still empty; the worker pool guarantees
    /// completeness before calling this.
    pub fn finalize(self) -> Result<ResultSet> {
        let slots = self.slots.into_inner().expect("aggregator lock poisoned");
        let expected = slots.len();
        let missing = slots.iter().filter(|s| s.is_none()).count();
        if missing > 0 {
            return Err(Error::IncompleteBatch { missing, expected });
        }
        let results = slots.into_iter().flatten().collect();
        Ok(ResultSet::from_ordered(results))
    }
}
