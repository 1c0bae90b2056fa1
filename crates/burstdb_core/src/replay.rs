//! Burst replay.
//!
//! Rebuilds the root from an unordered set of possibly overlapping bursts by
//! applying the unique strictly increasing sequence of transactions that
//! continues from the id the root already reflects.

use crate::burst::{BurstReader, BurstRef};
use crate::error::{CoreError, CoreResult};
use crate::operation::Transaction;
use crate::order::sort_bursts;
use crate::types::{BurstRange, OperationId};
use tracing::debug;

/// Result of [`apply_bursts`].
///
/// Replay mutates the root in place without rollback, so `last` is
/// meaningful even when `error` is set.
#[derive(Debug)]
#[must_use]
pub struct ReplayOutcome {
    /// Highest id reflected in the root after replay.
    pub last: OperationId,
    /// Number of transactions applied.
    pub applied: u64,
    /// Number of bursts opened.
    pub opened: usize,
    /// First error encountered, if any.
    pub error: Option<CoreError>,
}

impl ReplayOutcome {
    /// Returns true if replay finished without error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts the outcome into the last applied id or the error.
    ///
    /// # Errors
    ///
    /// Returns the error recorded during replay.
    pub fn into_result(self) -> CoreResult<OperationId> {
        match self.error {
            None => Ok(self.last),
            Some(e) => Err(e),
        }
    }
}

/// An open burst and its buffered, not yet applied transaction.
struct OpenBurst<R> {
    range: BurstRange,
    reader: Box<dyn BurstReader<R>>,
    pending: Option<Transaction<R>>,
}

impl<R> OpenBurst<R> {
    /// Reads forward past every id `<= last`. Returns false once the reader
    /// is exhausted.
    fn advance(&mut self, last: OperationId) -> CoreResult<bool> {
        loop {
            if let Some(tx) = &self.pending {
                if tx.id > last {
                    return Ok(true);
                }
            }
            match self.reader.next()? {
                Some(tx) => self.pending = Some(tx),
                None => {
                    self.pending = None;
                    return Ok(false);
                }
            }
        }
    }
}

/// Applies bursts to `root`, continuing from `last`.
///
/// `last` is the highest id already reflected in the root
/// ([`OperationId::ZERO`] to replay from the start). Bursts may overlap, be
/// irrelevant, or leave gaps; replay stops at the highest id reachable
/// without a gap, which is not an error.
///
/// Readers are closed as soon as they are exhausted. Any reader still open
/// when replay ends (normally or on error) is closed before returning; a
/// close failure is reported only if no earlier error occurred.
pub fn apply_bursts<R>(root: &mut R, last: OperationId, bursts: Vec<BurstRef<R>>) -> ReplayOutcome {
    let mut candidates = bursts;
    sort_bursts(&mut candidates);

    let mut outcome = ReplayOutcome {
        last,
        applied: 0,
        opened: 0,
        error: None,
    };
    let mut open = Vec::new();

    if let Err(e) = replay(root, &mut candidates, &mut open, &mut outcome) {
        outcome.error = Some(e);
    }

    for mut burst in open {
        if let Err(e) = burst.reader.close() {
            debug!(range = %burst.range, error = %e, "failed to close burst reader");
            if outcome.error.is_none() {
                outcome.error = Some(e);
            }
        }
    }

    debug!(
        from = %last,
        to = %outcome.last,
        applied = outcome.applied,
        opened = outcome.opened,
        failed = outcome.error.is_some(),
        "replayed bursts"
    );
    outcome
}

fn replay<R>(
    root: &mut R,
    candidates: &mut Vec<BurstRef<R>>,
    open: &mut Vec<OpenBurst<R>>,
    outcome: &mut ReplayOutcome,
) -> CoreResult<()> {
    loop {
        let mut i = 0;
        while i < open.len() {
            if open[i].advance(outcome.last)? {
                i += 1;
            } else {
                let mut done = open.swap_remove(i);
                debug!(range = %done.range, "burst exhausted");
                done.reader.close()?;
            }
        }

        let next = outcome.last.next();
        let ready = open.iter_mut().find_map(|burst| {
            if burst.pending.as_ref().is_some_and(|tx| tx.id == next) {
                burst.pending.take()
            } else {
                None
            }
        });
        if let Some(tx) = ready {
            tx.operation.apply(root)?;
            outcome.last = tx.id;
            outcome.applied += 1;
            continue;
        }

        if !open_next(candidates, open, next, outcome)? {
            return Ok(());
        }
    }
}

/// Opens the first candidate able to supply `next`, dropping irrelevant
/// candidates along the way. Returns false if no candidate covers `next`.
fn open_next<R>(
    candidates: &mut Vec<BurstRef<R>>,
    open: &mut Vec<OpenBurst<R>>,
    next: OperationId,
    outcome: &mut ReplayOutcome,
) -> CoreResult<bool> {
    let mut i = 0;
    while i < candidates.len() {
        let range = candidates[i].range();
        if range.last < next {
            candidates.remove(i);
            continue;
        }
        if range.first <= next {
            let burst = candidates.remove(i);
            let reader = burst.open()?;
            debug!(%range, %next, "opened burst");
            open.push(OpenBurst {
                range,
                reader,
                pending: None,
            });
            outcome.opened += 1;
            return Ok(true);
        }
        i += 1;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{event_log, Counter, ScriptedBurst};

    fn replay_from(last: u64, bursts: Vec<BurstRef<Counter>>) -> (Counter, ReplayOutcome) {
        let mut root = Counter::default();
        let outcome = apply_bursts(&mut root, OperationId::new(last), bursts);
        (root, outcome)
    }

    #[test]
    fn empty_input_is_noop() {
        let (root, outcome) = replay_from(0, Vec::new());
        assert_eq!(outcome.last, OperationId::ZERO);
        assert_eq!(outcome.applied, 0);
        assert!(outcome.is_ok());
        assert_eq!(root.value, 0);
    }

    #[test]
    fn contiguous_bursts_apply_in_order() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::with_amounts("b", &[(3, 100), (4, 1000)], &log),
            ScriptedBurst::with_amounts("a", &[(1, 1), (2, 10)], &log),
        ];
        let (root, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.into_result().unwrap(), OperationId::new(4));
        assert_eq!(root.value, 1111);
    }

    #[test]
    fn exhausted_reader_closes_before_next_open() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("a", &[1, 2], &log),
            ScriptedBurst::new("b", &[3, 4], &log),
        ];
        let (_, outcome) = replay_from(0, bursts);
        assert!(outcome.is_ok());
        assert_eq!(
            *log.lock(),
            vec!["open a", "close a", "open b", "close b"]
        );
    }

    #[test]
    fn overlapping_bursts_apply_each_id_once() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("a", &[1, 2, 3], &log),
            ScriptedBurst::new("b", &[2, 3, 4, 5], &log),
        ];
        let (root, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.last, OperationId::new(5));
        assert_eq!(outcome.applied, 5);
        assert_eq!(root.value, 5);
    }

    #[test]
    fn identical_ranges_open_only_one() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::with_amounts("x", &[(1, 1), (2, 1)], &log),
            ScriptedBurst::with_amounts("y", &[(1, 50), (2, 50)], &log),
        ];
        let (root, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.last, OperationId::new(2));
        assert_eq!(outcome.opened, 1);
        assert_eq!(root.value, 2);
        assert_eq!(*log.lock(), vec!["open x", "close x"]);
    }

    #[test]
    fn duplicate_bursts_replay_like_either_one() {
        let entries = [(2, 10), (3, 100), (4, 1000)];
        let log = event_log();
        let layouts = vec![
            vec![ScriptedBurst::with_amounts("x", &entries, &log)],
            vec![ScriptedBurst::with_amounts("y", &entries, &log)],
            vec![
                ScriptedBurst::with_amounts("x", &entries, &log),
                ScriptedBurst::with_amounts("y", &entries, &log),
            ],
        ];

        for bursts in layouts {
            let mut root = Counter { value: 1 };
            let outcome = apply_bursts(&mut root, OperationId::new(1), bursts);
            assert_eq!(outcome.into_result().unwrap(), OperationId::new(4));
            assert_eq!(root.value, 1111);
        }
    }

    #[test]
    fn widest_burst_is_opened_first() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("narrow", &[1, 2], &log),
            ScriptedBurst::new("wide", &[1, 2, 3, 4], &log),
        ];
        let (_, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.last, OperationId::new(4));
        assert_eq!(outcome.opened, 1);
        assert_eq!(log.lock()[0], "open wide");
    }

    #[test]
    fn gap_stops_replay_without_error() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("a", &[1, 2], &log),
            ScriptedBurst::new("c", &[4, 5], &log),
        ];
        let (root, outcome) = replay_from(0, bursts);
        assert!(outcome.is_ok());
        assert_eq!(outcome.last, OperationId::new(2));
        assert_eq!(root.value, 2);
        assert!(!log.lock().contains(&"open c".to_string()));
    }

    #[test]
    fn gaps_inside_a_burst_are_filled_by_another() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("sparse", &[1, 5, 6], &log),
            ScriptedBurst::new("fill", &[2, 3, 4], &log),
        ];
        let (root, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.last, OperationId::new(6));
        assert_eq!(outcome.opened, 2);
        assert_eq!(root.value, 6);
        assert_eq!(
            *log.lock(),
            vec!["open sparse", "open fill", "close fill", "close sparse"]
        );
    }

    #[test]
    fn resumes_after_last() {
        let log = event_log();
        let bursts = vec![ScriptedBurst::new("a", &[1, 2, 3, 4, 5], &log)];
        let (root, outcome) = replay_from(3, bursts);
        assert_eq!(outcome.last, OperationId::new(5));
        assert_eq!(outcome.applied, 2);
        assert_eq!(root.value, 2);
    }

    #[test]
    fn irrelevant_bursts_are_never_opened() {
        let log = event_log();
        let bursts = vec![
            ScriptedBurst::new("old", &[1, 2, 3], &log),
            ScriptedBurst::new("older", &[1], &log),
        ];
        let (root, outcome) = replay_from(10, bursts);
        assert_eq!(outcome.last, OperationId::new(10));
        assert_eq!(outcome.opened, 0);
        assert_eq!(root.value, 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn reader_error_keeps_partial_progress_and_closes() {
        let log = event_log();
        let bursts = vec![ScriptedBurst::failing("bad", &[1, 2, 3, 4], 3, &log)];
        let (root, outcome) = replay_from(0, bursts);
        assert_eq!(outcome.last, OperationId::new(2));
        assert_eq!(root.value, 2);
        assert!(matches!(outcome.error, Some(CoreError::InvalidFormat { .. })));
        assert_eq!(*log.lock(), vec!["open bad", "close bad"]);
    }

    #[test]
    fn replay_is_idempotent_from_its_own_result() {
        let log = event_log();
        let bursts = || {
            vec![
                ScriptedBurst::new("a", &[1, 2, 3], &log),
                ScriptedBurst::new("b", &[3, 4], &log),
            ]
        };
        let mut root = Counter::default();
        let first = apply_bursts(&mut root, OperationId::ZERO, bursts());
        let second = apply_bursts(&mut root, first.last, bursts());
        assert_eq!(second.last, first.last);
        assert_eq!(second.applied, 0);
        assert_eq!(root.value, 4);
    }
}
