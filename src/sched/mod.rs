//! Workload scheduler
//!
//! Turns stream definitions into a finite, lazily produced, time-ordered
//! sequence of emission events. Pacing follows the intended grid
//! (`start + k/rate`) and re-anchors to `now + interval` when the consumer
//! falls more than one interval behind, so a slow backend neither triggers
//! a catch-up burst nor accumulates unbounded lag.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{StreamSpec, WorkloadSpec};
use crate::gen::{Payload, PayloadSource};
use crate::Result;

/// One emitted unit, immutable once created
#[derive(Debug, Clone)]
pub struct Record {
    /// Global sequence number, monotonic across the whole run
    pub seq: u64,
    /// Index of the stream definition that produced this record
    pub stream: usize,
    /// Payload content, shared across a regeneration window
    pub payload: Arc<Payload>,
    /// Creation timestamp
    pub created_at: Instant,
}

/// A scheduled point in time at which one record must be sent
#[derive(Debug, Clone)]
pub struct EmissionEvent {
    /// Target send timestamp
    pub target: Instant,
    /// The record to send
    pub record: Record,
}

/// Target timestamp for the next event of a stream.
///
/// A pure function of the run anchor, the stream interval, how many events
/// the stream has emitted, and the current time: the nominal grid slot is
/// `start + emitted * interval`; if `now` is more than one interval past
/// that slot the target is reset to `now + interval` instead of replaying
/// the backlog.
pub fn next_target(start: Instant, interval: Duration, emitted: u64, now: Instant) -> Instant {
    let on_grid = start + interval.mul_f64(emitted as f64);
    if now.saturating_duration_since(on_grid) > interval {
        now + interval
    } else {
        on_grid
    }
}

/// Pacing state for a single stream definition
#[derive(Debug)]
pub struct StreamSchedule {
    index: usize,
    interval: Duration,
    total: u64,
    emitted: u64,
    source: PayloadSource,
}

impl StreamSchedule {
    /// Build the schedule for one stream definition
    pub fn new(index: usize, spec: &StreamSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            index,
            interval: spec.interval(),
            total: spec.total_events(),
            emitted: 0,
            source: PayloadSource::new(spec.kind, spec.size)?,
        })
    }

    /// Total number of events this stream will produce
    pub fn total_events(&self) -> u64 {
        self.total
    }

    /// Nominal grid slot of the next event, or None when exhausted.
    ///
    /// Merging orders streams by this undrifted value so the merge is
    /// deterministic regardless of consumer timing.
    fn nominal_next(&self, start: Instant) -> Option<Instant> {
        if self.emitted < self.total {
            Some(start + self.interval.mul_f64(self.emitted as f64))
        } else {
            None
        }
    }
}

/// All stream schedules of a workload merged into one globally time-ordered
/// event sequence. Finite; one run = one traversal.
#[derive(Debug)]
pub struct MergedSchedule {
    start: Instant,
    streams: Vec<StreamSchedule>,
    next_seq: u64,
}

impl MergedSchedule {
    /// Build the merged schedule for a validated workload, anchored at `start`
    pub fn new(spec: &WorkloadSpec, start: Instant) -> Result<Self> {
        let streams = spec
            .streams
            .iter()
            .enumerate()
            .map(|(i, s)| StreamSchedule::new(i, s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            start,
            streams,
            next_seq: 0,
        })
    }

    /// Run anchor this schedule was built with
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Total number of events across all streams
    pub fn total_events(&self) -> u64 {
        self.streams.iter().map(|s| s.total_events()).sum()
    }

    /// Number of events already handed out
    pub fn emitted(&self) -> u64 {
        self.next_seq
    }

    /// Produce the next emission event, or None when all streams are
    /// exhausted. Ties on the nominal grid break by stream declaration
    /// order, then per-stream sequence.
    pub fn next_event(&mut self, now: Instant) -> Option<EmissionEvent> {
        let start = self.start;
        let (chosen, _) = self
            .streams
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.nominal_next(start).map(|t| (i, t)))
            .min_by_key(|&(i, t)| (t, i))?;

        let stream = &mut self.streams[chosen];
        let target = next_target(start, stream.interval, stream.emitted, now);
        let payload = stream.source.payload_for(stream.emitted);

        let record = Record {
            seq: self.next_seq,
            stream: stream.index,
            payload,
            created_at: now,
        };

        stream.emitted += 1;
        self.next_seq += 1;

        Some(EmissionEvent { target, record })
    }
}
