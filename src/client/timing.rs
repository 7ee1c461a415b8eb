//! Request timing: model and tool segments on a shared monotonic clock.

use chrono::{DateTime, Utc};
use std::time::Instant;

use crate::types::{FailureTiming, SegmentKind, TimeSegment, TimingSummary};

/// Marker returned by [`TimingRecorder::begin`].
#[derive(Debug, Clone, Copy)]
pub struct SegmentStart {
    at: DateTime<Utc>,
    instant: Instant,
}

/// Collects time segments for one request.
///
/// Wall-clock timestamps are derived from the request start plus monotonic
/// offsets, so `end_time - start_time` always equals `duration_ms`.
#[derive(Debug)]
pub struct TimingRecorder {
    start_time: DateTime<Utc>,
    started: Instant,
    segments: Vec<TimeSegment>,
    first_response_ms: Option<u64>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            started: Instant::now(),
            segments: Vec::new(),
            first_response_ms: None,
        }
    }

    pub fn begin(&self) -> SegmentStart {
        let instant = Instant::now();
        SegmentStart {
            at: self.timestamp_at(instant),
            instant,
        }
    }

    /// Close a segment. The first `Model` segment also sets the first-response time.
    pub fn finish(&mut self, kind: SegmentKind, name: impl Into<String>, start: SegmentStart) -> &TimeSegment {
        let duration_ms = millis(start.instant.elapsed());
        if kind == SegmentKind::Model && self.first_response_ms.is_none() {
            self.first_response_ms = Some(duration_ms);
        }
        self.segments.push(TimeSegment {
            kind,
            name: name.into(),
            start_time: start.at,
            end_time: start.at + chrono::Duration::milliseconds(duration_ms as i64),
            duration_ms,
        });
        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &[TimeSegment] {
        &self.segments
    }

    fn total_for(&self, kind: SegmentKind) -> u64 {
        self.segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.duration_ms)
            .sum()
    }

    fn timestamp_at(&self, instant: Instant) -> DateTime<Utc> {
        let offset = millis(instant.saturating_duration_since(self.started));
        self.start_time + chrono::Duration::milliseconds(offset as i64)
    }

    /// Summary of a completed request.
    pub fn summary(self, iterations: u32) -> TimingSummary {
        let duration_ms = millis(self.started.elapsed());
        TimingSummary {
            start_time: self.start_time,
            end_time: self.start_time + chrono::Duration::milliseconds(duration_ms as i64),
            duration_ms,
            model_time_ms: self.total_for(SegmentKind::Model),
            tools_time_ms: self.total_for(SegmentKind::Tool),
            first_response_time_ms: self.first_response_ms.unwrap_or(0),
            iterations,
            time_segments: self.segments,
        }
    }

    /// Timing up to now, for a request that failed.
    pub fn failure(&self) -> FailureTiming {
        let duration_ms = millis(self.started.elapsed());
        FailureTiming {
            start_time: self.start_time,
            end_time: self.start_time + chrono::Duration::milliseconds(duration_ms as i64),
            duration_ms,
        }
    }
}

impl Default for TimingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
