//! Shared fixtures for unit tests in this crate.

use crate::burst::{BurstHandle, BurstReader, BurstRef};
use crate::error::{CoreError, CoreResult};
use crate::operation::{Transaction, Writer};
use crate::registry::OperationRegistry;
use crate::types::{BurstRange, OperationId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counter {
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Add(pub i64);

impl Writer<Counter> for Add {
    const KIND: &'static str = "add";
    type Output = i64;

    fn write(&self, root: &mut Counter) -> CoreResult<i64> {
        root.value += self.0;
        Ok(root.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fail;

impl Writer<Counter> for Fail {
    const KIND: &'static str = "fail";
    type Output = ();

    fn write(&self, _root: &mut Counter) -> CoreResult<()> {
        Err(CoreError::operation_failed("refused"))
    }
}

pub fn counter_registry() -> OperationRegistry<Counter> {
    OperationRegistry::new()
        .with::<Add>()
        .and_then(OperationRegistry::with::<Fail>)
        .unwrap()
}

/// Events recorded by [`ScriptedBurst`] readers.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// An in-memory burst of `Add` transactions that records opens and closes.
pub struct ScriptedBurst {
    name: &'static str,
    entries: Vec<(u64, i64)>,
    log: EventLog,
    fail_at: Option<u64>,
}

impl ScriptedBurst {
    pub fn new(name: &'static str, ids: &[u64], log: &EventLog) -> BurstRef<Counter> {
        Self::with_amounts(name, &ids.iter().map(|id| (*id, 1)).collect::<Vec<_>>(), log)
    }

    pub fn with_amounts(
        name: &'static str,
        entries: &[(u64, i64)],
        log: &EventLog,
    ) -> BurstRef<Counter> {
        Arc::new(Self {
            name,
            entries: entries.to_vec(),
            log: Arc::clone(log),
            fail_at: None,
        })
    }

    /// A burst whose reader fails when it reaches `id`.
    pub fn failing(name: &'static str, ids: &[u64], fail_at: u64, log: &EventLog) -> BurstRef<Counter> {
        Arc::new(Self {
            name,
            entries: ids.iter().map(|id| (*id, 1)).collect(),
            log: Arc::clone(log),
            fail_at: Some(fail_at),
        })
    }
}

impl BurstHandle<Counter> for ScriptedBurst {
    fn range(&self) -> BurstRange {
        let first = self.entries.first().map_or(0, |e| e.0);
        let last = self.entries.last().map_or(0, |e| e.0);
        BurstRange::new(first, last)
    }

    fn open(&self) -> CoreResult<Box<dyn BurstReader<Counter>>> {
        self.log.lock().push(format!("open {}", self.name));
        Ok(Box::new(ScriptedReader {
            name: self.name,
            entries: self.entries.clone().into_iter(),
            log: Arc::clone(&self.log),
            fail_at: self.fail_at,
        }))
    }
}

struct ScriptedReader {
    name: &'static str,
    entries: std::vec::IntoIter<(u64, i64)>,
    log: EventLog,
    fail_at: Option<u64>,
}

impl BurstReader<Counter> for ScriptedReader {
    fn next(&mut self) -> CoreResult<Option<Transaction<Counter>>> {
        match self.entries.next() {
            Some((id, _)) if Some(id) == self.fail_at => {
                Err(CoreError::invalid_format(format!("{} broken at {id}", self.name)))
            }
            Some((id, amount)) => Ok(Some(Transaction::from_writer(
                OperationId::new(id),
                Add(amount),
            ))),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> CoreResult<()> {
        self.log.lock().push(format!("close {}", self.name));
        Ok(())
    }
}

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}
