//! Conversion between beats and seconds across BPM changes and stops.
//!
//! A chart position given in beats maps to seconds by integrating over every BPM segment up to
//! that beat: each segment contributes `(beats in segment) * 60 / bpm`. Stops then add their
//! duration to every position after them. A single flat `beat * 60 / bpm` is only correct for
//! charts without any tempo change.

use std::cmp::Ordering;

use super::fin_f64::FinF64;

/// A BPM change resolved to the absolute time it happens at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmChange {
    /// Beat position of the change.
    pub beat: f64,
    /// Absolute time of the change in seconds.
    pub time: f64,
    /// The tempo from this point on.
    pub bpm: FinF64,
}

/// How a pause interacts with notes placed on its own beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopKind {
    /// The pause happens after notes on the same beat (`#STOPS`).
    Stop,
    /// The pause happens before notes on the same beat (`#DELAYS`).
    Delay,
}

/// A pause of the beat clock for a fixed amount of seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    /// Beat position of the pause.
    pub beat: f64,
    /// Length of the pause in seconds.
    pub duration: f64,
    /// Whether notes on `beat` are played before or after it.
    pub kind: StopKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    beat: f64,
    /// Time of `beat` without any stop applied.
    base_time: f64,
    bpm: FinF64,
}

impl Segment {
    fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm.as_f64()
    }
}

/// The tempo timeline of a chart.
///
/// Beat `0` is always at time `0`. Positions before the first tempo point are extrapolated with
/// the first tempo.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    /// Never empty, sorted by beat.
    segments: Vec<Segment>,
    /// Sorted by beat.
    stops: Vec<Stop>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::constant(FinF64::DEFAULT_BPM)
    }
}

impl TempoMap {
    /// Creates a map which never changes its tempo.
    #[must_use]
    pub fn constant(bpm: FinF64) -> Self {
        Self {
            segments: vec![Segment {
                beat: 0.0,
                base_time: 0.0,
                bpm,
            }],
            stops: Vec::new(),
        }
    }

    /// Creates a map from `(beat, bpm)` points, as `#BPMS` and section-based charts declare them.
    ///
    /// Points with a non-positive BPM are skipped. Of several points on the same beat the last one wins.
    /// Returns `None` if no usable point is left.
    #[must_use]
    pub fn from_beats(points: impl IntoIterator<Item = (f64, FinF64)>) -> Option<Self> {
        let points = normalize_points(points);
        let &(first_beat, first_bpm) = points.first()?;

        let mut segments = Vec::with_capacity(points.len() + 1);
        segments.push(if first_beat > 0.0 {
            Segment {
                beat: 0.0,
                base_time: 0.0,
                bpm: first_bpm,
            }
        } else {
            Segment {
                beat: first_beat,
                base_time: first_beat * 60.0 / first_bpm.as_f64(),
                bpm: first_bpm,
            }
        });
        for &(beat, bpm) in &points {
            let Some(prev) = segments.last().copied() else {
                break;
            };
            if beat <= prev.beat || bpm == prev.bpm {
                continue;
            }
            segments.push(Segment {
                beat,
                base_time: prev.base_time + (beat - prev.beat) * prev.seconds_per_beat(),
                bpm,
            });
        }
        Some(Self {
            segments,
            stops: Vec::new(),
        })
    }

    /// Creates a map from `(seconds, bpm)` points, as FNF v2 `timeChanges` and osu! timing points declare them.
    ///
    /// The beat of each point is derived by integrating the tempo from time `0`.
    /// Returns `None` if no point has a positive BPM.
    #[must_use]
    pub fn from_time_points(points: impl IntoIterator<Item = (f64, FinF64)>) -> Option<Self> {
        let points = normalize_points(points);
        let &(first_time, first_bpm) = points.first()?;

        let mut segments = Vec::with_capacity(points.len());
        segments.push(Segment {
            beat: first_time * first_bpm.as_f64() / 60.0,
            base_time: first_time,
            bpm: first_bpm,
        });
        for &(time, bpm) in &points[1..] {
            let Some(prev) = segments.last().copied() else {
                break;
            };
            if bpm == prev.bpm {
                continue;
            }
            segments.push(Segment {
                beat: prev.beat + (time - prev.base_time) / prev.seconds_per_beat(),
                base_time: time,
                bpm,
            });
        }
        Some(Self {
            segments,
            stops: Vec::new(),
        })
    }

    /// Adds pauses to the map. Non-positive or non-finite durations are skipped.
    #[must_use]
    pub fn with_stops(mut self, stops: impl IntoIterator<Item = Stop>) -> Self {
        self.stops.extend(
            stops
                .into_iter()
                .filter(|stop| stop.beat.is_finite() && stop.duration.is_finite())
                .filter(|stop| stop.duration > 0.0),
        );
        self.stops.sort_by(|a, b| a.beat.total_cmp(&b.beat));
        self
    }

    /// The tempo at beat `0`.
    #[must_use]
    pub fn initial_bpm(&self) -> f64 {
        self.bpm_at_beat(0.0)
    }

    /// Every tempo segment start, with its absolute time.
    pub fn bpm_changes(&self) -> impl Iterator<Item = BpmChange> + '_ {
        self.segments.iter().map(|segment| BpmChange {
            beat: segment.beat,
            time: self.beat_to_seconds(segment.beat),
            bpm: segment.bpm,
        })
    }

    /// The pauses of the map, sorted by beat.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// The tempo in effect at `beat`.
    #[must_use]
    pub fn bpm_at_beat(&self, beat: f64) -> f64 {
        self.segment_at_beat(beat).bpm.as_f64()
    }

    /// The tempo in effect at `time` seconds.
    #[must_use]
    pub fn bpm_at_time(&self, time: f64) -> f64 {
        self.bpm_at_beat(self.seconds_to_beat(time))
    }

    /// The length of a sixteenth note in seconds at `time`.
    #[must_use]
    pub fn sixteenth_at(&self, time: f64) -> f64 {
        15.0 / self.bpm_at_time(time)
    }

    /// Converts a beat position into absolute seconds.
    #[must_use]
    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        self.base_time_at(beat) + self.stop_offset(beat)
    }

    /// Converts absolute seconds into a beat position. Times inside a pause map to the beat of the pause.
    #[must_use]
    pub fn seconds_to_beat(&self, time: f64) -> f64 {
        let mut elapsed = 0.0;
        for stop in &self.stops {
            let start = self.base_time_at(stop.beat) + elapsed;
            if time < start {
                break;
            }
            if time < start + stop.duration {
                return stop.beat;
            }
            elapsed += stop.duration;
        }
        let base_time = time - elapsed;
        let index = self
            .segments
            .partition_point(|segment| segment.base_time <= base_time);
        let segment = &self.segments[index.saturating_sub(1)];
        segment.beat + (base_time - segment.base_time) / segment.seconds_per_beat()
    }

    fn segment_at_beat(&self, beat: f64) -> &Segment {
        let index = self.segments.partition_point(|segment| segment.beat <= beat);
        &self.segments[index.saturating_sub(1)]
    }

    fn base_time_at(&self, beat: f64) -> f64 {
        let segment = self.segment_at_beat(beat);
        segment.base_time + (beat - segment.beat) * segment.seconds_per_beat()
    }

    fn stop_offset(&self, beat: f64) -> f64 {
        self.stops
            .iter()
            .take_while(|stop| stop.beat <= beat)
            .filter(|stop| stop.beat < beat || stop.kind == StopKind::Delay)
            .map(|stop| stop.duration)
            .sum()
    }
}

fn normalize_points(points: impl IntoIterator<Item = (f64, FinF64)>) -> Vec<(f64, FinF64)> {
    let mut points: Vec<_> = points
        .into_iter()
        .filter(|(position, bpm)| position.is_finite() && bpm.as_f64() > 0.0)
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    // the later of two points on the same position wins
    points.dedup_by(|later, earlier| {
        if later.0.total_cmp(&earlier.0) == Ordering::Equal {
            *earlier = *later;
            true
        } else {
            false
        }
    });
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bpm(value: f64) -> FinF64 {
        FinF64::positive(value).expect("positive bpm")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn constant_tempo() {
        let map = TempoMap::constant(bpm(120.0));
        assert!(close(map.beat_to_seconds(4.0), 2.0));
        assert!(close(map.seconds_to_beat(2.0), 4.0));
        assert!(close(map.sixteenth_at(10.0), 0.125));
    }

    #[test]
    fn change_only_affects_later_beats() {
        let map = TempoMap::from_beats([(0.0, bpm(120.0)), (4.0, bpm(240.0))]).unwrap();
        assert!(close(map.beat_to_seconds(2.0), 1.0));
        assert!(close(map.beat_to_seconds(4.0), 2.0));
        assert!(close(map.beat_to_seconds(8.0), 3.0));
        assert!(close(map.seconds_to_beat(3.0), 8.0));
        assert!(close(map.bpm_at_time(2.5), 240.0));
    }

    #[test]
    fn first_point_after_zero_extends_backwards() {
        let map = TempoMap::from_beats([(2.0, bpm(60.0))]).unwrap();
        assert!(close(map.beat_to_seconds(2.0), 2.0));
        assert_eq!(map.bpm_changes().count(), 1);
    }

    #[test]
    fn same_beat_keeps_last_and_skips_invalid() {
        let map = TempoMap::from_beats([
            (0.0, bpm(100.0)),
            (0.0, bpm(120.0)),
            (f64::NAN, bpm(300.0)),
        ])
        .unwrap();
        assert!(close(map.initial_bpm(), 120.0));
        assert!(TempoMap::from_beats(std::iter::empty()).is_none());
    }

    #[test]
    fn time_points_derive_beats() {
        let map = TempoMap::from_time_points([(0.0, bpm(120.0)), (2.0, bpm(240.0))]).unwrap();
        let changes: Vec<_> = map.bpm_changes().collect();
        assert_eq!(changes.len(), 2);
        assert!(close(changes[1].beat, 4.0));
        assert!(close(changes[1].time, 2.0));
        assert!(close(map.beat_to_seconds(8.0), 3.0));
    }

    #[test]
    fn stops_and_delays() {
        let stop = TempoMap::constant(bpm(120.0)).with_stops([Stop {
            beat: 2.0,
            duration: 1.0,
            kind: StopKind::Stop,
        }]);
        assert!(close(stop.beat_to_seconds(2.0), 1.0));
        assert!(close(stop.beat_to_seconds(3.0), 2.5));
        assert!(close(stop.seconds_to_beat(1.5), 2.0));
        assert!(close(stop.seconds_to_beat(2.5), 3.0));

        let delay = TempoMap::constant(bpm(120.0)).with_stops([Stop {
            beat: 2.0,
            duration: 1.0,
            kind: StopKind::Delay,
        }]);
        assert!(close(delay.beat_to_seconds(2.0), 2.0));
    }
}
