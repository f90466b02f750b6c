//! src/pipeline/collector.rs
//!
//! Collectors draining exactly N items from a stage's output conduit.
//!
//! - `RecordCollector`: gathers the generated records into one slot per id.
//!   Returning from it is the barrier between stage one and stage two.
//! - `ResultCollector`: gathers result tokens in arrival order.
//!
//! Both block on each item (for at most `timeout` when one is given), never
//! read an N+1-th item, and fail if the conduit disconnects or an identifier
//! shows up twice.

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;

use crate::pipeline::handler::ResultToken;
use crate::record::UserRecord;

/// Blocks for the next item of a stage, mapping channel failures to errors
/// that say how far the stage got.
fn recv_next<T>(
    source: &Receiver<T>,
    timeout: Option<Duration>,
    stage: &str,
    received: usize,
    expected: usize,
) -> Result<T> {
    let Some(timeout) = timeout else {
        return source.recv().map_err(|_| {
            anyhow!(
                "{} conduit disconnected with {} of {} items received \
                - workers may have crashed",
                stage,
                received,
                expected
            )
        });
    };

    source.recv_timeout(timeout).map_err(|e| match e {
        RecvTimeoutError::Timeout => anyhow!(
            "{} stage timed out after {:?} with {} of {} items received \
            - possible deadlock or stalled worker",
            stage,
            timeout,
            received,
            expected
        ),
        RecvTimeoutError::Disconnected => anyhow!(
            "{} conduit disconnected with {} of {} items received \
            - workers may have crashed",
            stage,
            received,
            expected
        ),
    })
}

/// Gathers exactly `expected` generated records.
///
/// Each record is stored in the slot for its identifier, so no two records
/// ever share a slot and the complete set comes back ordered by id.
#[derive(Debug)]
pub struct RecordCollector {
    slots: Vec<Option<UserRecord>>,
    received: usize,
}

impl RecordCollector {
    pub fn new(expected: usize) -> Self {
        Self {
            slots: vec![None; expected],
            received: 0,
        }
    }

    pub fn expected(&self) -> usize {
        self.slots.len()
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// Places one record into its slot.
    ///
    /// Identifiers outside `1..=expected` and identifiers already seen are
    /// rejected.
    pub fn accept(&mut self, record: UserRecord) -> Result<()> {
        let id = record.id();
        if id == 0 || id > self.slots.len() {
            bail!(
                "Record id {} outside expected range 1..={}",
                id,
                self.slots.len()
            );
        }

        let slot = &mut self.slots[id - 1];
        if slot.is_some() {
            bail!("Record id {} generated more than once", id);
        }
        *slot = Some(record);
        self.received += 1;
        Ok(())
    }

    /// Drains `expected` records from `source` and returns them ordered by id.
    pub fn collect_from(
        mut self,
        source: &Receiver<UserRecord>,
        timeout: Option<Duration>,
    ) -> Result<Vec<UserRecord>> {
        while !self.is_complete() {
            let record = recv_next(
                source,
                timeout,
                "Generation",
                self.received,
                self.expected(),
            )?;
            self.accept(record)?;
        }
        self.into_records()
    }

    /// Returns the full record set. Fails unless every slot is filled.
    pub fn into_records(self) -> Result<Vec<UserRecord>> {
        let expected = self.slots.len();
        let received = self.received;
        self.slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("Only {} of {} records collected", received, expected))
    }
}

/// Gathers exactly `expected` result tokens in arrival order.
#[derive(Debug)]
pub struct ResultCollector {
    expected: usize,
    seen: Vec<bool>,
    tokens: Vec<ResultToken>,
}

impl ResultCollector {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            seen: vec![false; expected],
            tokens: Vec::with_capacity(expected),
        }
    }

    pub fn received(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_complete(&self) -> bool {
        self.tokens.len() == self.expected
    }

    /// Records one token. A second token for the same record means it was
    /// consumed twice and is rejected.
    pub fn accept(&mut self, token: ResultToken) -> Result<()> {
        let id = token.id;
        if id == 0 || id > self.expected {
            bail!(
                "Result token for id {} outside expected range 1..={}",
                id,
                self.expected
            );
        }
        if std::mem::replace(&mut self.seen[id - 1], true) {
            bail!("Record {} produced more than one result token", id);
        }
        self.tokens.push(token);
        Ok(())
    }

    /// Drains `expected` tokens from `source`.
    pub fn collect_from(
        mut self,
        source: &Receiver<ResultToken>,
        timeout: Option<Duration>,
    ) -> Result<Vec<ResultToken>> {
        while !self.is_complete() {
            let token = recv_next(source, timeout, "Processing", self.received(), self.expected)?;
            self.accept(token)?;
        }
        Ok(self.tokens)
    }
}

#[cfg(test)]
mod collector_test {
    use super::*;
    use crate::pipeline::handler::Outcome;
    use crossbeam_channel::bounded;
    use std::thread;

    fn token(id: usize) -> ResultToken {
        ResultToken {
            id,
            worker: 0,
            outcome: Outcome::Success(format!("ok {}", id)),
        }
    }

    #[test]
    fn test_records_come_back_ordered_by_id() -> Result<()> {
        let (tx, rx) = bounded(4);
        for id in [3, 1, 4, 2] {
            tx.send(UserRecord::identity(id))?;
        }

        let records = RecordCollector::new(4).collect_from(&rx, Some(Duration::from_secs(1)))?;
        let ids: Vec<usize> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_record_collector_stops_at_expected_count() -> Result<()> {
        let (tx, rx) = bounded(3);
        for id in [2, 1, 99] {
            tx.send(UserRecord::identity(id))?;
        }

        let records = RecordCollector::new(2).collect_from(&rx, Some(Duration::from_secs(1)))?;
        assert_eq!(records.len(), 2);
        // The extra item was never read.
        assert_eq!(rx.try_recv()?.id(), 99);
        Ok(())
    }

    #[test]
    fn test_duplicate_record_is_rejected() {
        let mut collector = RecordCollector::new(3);
        collector.accept(UserRecord::identity(2)).unwrap();
        let err = collector.accept(UserRecord::identity(2)).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_out_of_range_record_is_rejected() {
        let mut collector = RecordCollector::new(3);
        assert!(collector.accept(UserRecord::identity(0)).is_err());
        assert!(collector.accept(UserRecord::identity(4)).is_err());
    }

    #[test]
    fn test_incomplete_record_set_is_an_error() {
        let mut collector = RecordCollector::new(2);
        collector.accept(UserRecord::identity(1)).unwrap();
        assert!(!collector.is_complete());
        assert!(collector.into_records().is_err());
    }

    #[test]
    fn test_collector_times_out_instead_of_hanging() {
        let (tx, rx) = bounded(2);
        tx.send(UserRecord::identity(1)).unwrap();

        let err = RecordCollector::new(2)
            .collect_from(&rx, Some(Duration::from_millis(20)))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("timed out"), "{}", message);
        assert!(message.contains("1 of 2"), "{}", message);
    }

    #[test]
    fn test_collector_without_deadline_waits_for_slow_items() -> Result<()> {
        let (tx, rx) = bounded(2);
        let producer = thread::spawn(move || {
            for id in [1, 2] {
                thread::sleep(Duration::from_millis(50));
                tx.send(token(id)).unwrap();
            }
        });

        let tokens = ResultCollector::new(2).collect_from(&rx, None)?;
        producer.join().unwrap();
        assert_eq!(tokens.len(), 2);
        Ok(())
    }

    #[test]
    fn test_collector_without_deadline_reports_disconnect() {
        let (tx, rx) = bounded(2);
        tx.send(UserRecord::identity(1)).unwrap();
        drop(tx);

        let err = RecordCollector::new(2).collect_from(&rx, None).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }

    #[test]
    fn test_collector_reports_disconnect() {
        let (tx, rx) = bounded(2);
        tx.send(token(1)).unwrap();
        drop(tx);

        let err = ResultCollector::new(2)
            .collect_from(&rx, Some(Duration::from_secs(1)))
            .unwrap_err();
        assert!(err.to_string().contains("disconnected"));
    }

    #[test]
    fn test_result_tokens_keep_arrival_order() -> Result<()> {
        let (tx, rx) = bounded(3);
        let producer = thread::spawn(move || {
            for id in [2, 3, 1] {
                tx.send(token(id)).unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        });

        let tokens = ResultCollector::new(3).collect_from(&rx, Some(Duration::from_secs(1)))?;
        producer.join().unwrap();
        let ids: Vec<usize> = tokens.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        Ok(())
    }

    #[test]
    fn test_duplicate_token_is_rejected() {
        let mut collector = ResultCollector::new(2);
        collector.accept(token(1)).unwrap();
        let err = collector.accept(token(1)).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }
}
