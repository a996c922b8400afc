//! Notes and the per-gamemode note kinds.

use std::{cmp::Ordering, fmt::Debug, hash::Hash};

use crate::{chart::Gamemode, engine::EngineConfig, judgement::JudgementTable};

/// How the engine scores a note of some kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringRule {
    /// Matched against an input event and judged by the timing tier table.
    Judged,
    /// Judged like [`ScoringRule::Judged`], but a hit heals by a fixed amount instead of the tier's health delta.
    Heal,
    /// Resolved by whether its lane is held when it passes. Only adjusts health.
    Sustain,
    /// Hitting it costs health. Letting it pass does nothing.
    Bomb,
    /// Hitting it empties the health bar.
    Death,
    /// Never scored, only displayed.
    Unscored,
}

/// The kind of input event which hits a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trigger {
    /// A key press.
    #[default]
    Press,
    /// A key release.
    Release,
}

/// A gamemode-specific set of note types.
///
/// The engine is generic over this trait. Each implementation maps its variants to a
/// [`ScoringRule`] and supplies the default judgement table and health settings of its gamemode.
pub trait NoteKind: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// The gamemode charts of this kind are played in.
    const GAMEMODE: Gamemode;

    /// Whether held notes are judged by their length directly, rather than by synthesized tick notes.
    const NATIVE_SUSTAINS: bool;

    /// How a note of this kind is scored.
    fn rule(self) -> ScoringRule;

    /// The input event which hits a note of this kind.
    fn trigger(self) -> Trigger {
        Trigger::Press
    }

    /// Whether a note of this kind may keep a non-zero length.
    fn allows_length(self) -> bool {
        self.rule() == ScoringRule::Judged
    }

    /// The timing tiers of the gamemode.
    fn default_judgements() -> JudgementTable;

    /// The health settings of the gamemode.
    fn default_config() -> EngineConfig;
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum NoteState {
    #[default]
    Pending,
    Hit(f64),
    Missed,
}

/// A single note of a chart.
///
/// Notes are created by a parser and stay immutable, except for the hit state which the engine
/// resolves exactly once. A note is never both hit and missed.
#[derive(Debug, Clone, PartialEq)]
pub struct Note<K> {
    /// Start time in seconds from the start of the song.
    pub time: f64,
    /// Key or column index.
    pub lane: usize,
    /// Hold length in seconds, `0` for a tap.
    pub length: f64,
    /// The note type.
    pub kind: K,
    /// Index of the head note in the chart, for synthesized sustain ticks.
    pub parent: Option<usize>,
    /// Format-specific data the parser could not map.
    pub extra: Option<serde_json::Value>,
    state: NoteState,
}

impl<K: NoteKind> Note<K> {
    /// Creates a tap note.
    #[must_use]
    pub const fn new(time: f64, lane: usize, kind: K) -> Self {
        Self {
            time,
            lane,
            length: 0.0,
            kind,
            parent: None,
            extra: None,
            state: NoteState::Pending,
        }
    }

    /// Sets the hold length. Negative, non-finite lengths and kinds which cannot be held give `0`.
    #[must_use]
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = if self.kind.allows_length() && length.is_finite() && length > 0.0 {
            length
        } else {
            0.0
        };
        self
    }

    /// Sets the parent note index.
    #[must_use]
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Attaches unmapped source data.
    #[must_use]
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

impl<K> Note<K> {
    /// Whether the note was hit.
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self.state, NoteState::Hit(_))
    }

    /// Whether the note was missed.
    #[must_use]
    pub const fn is_missed(&self) -> bool {
        matches!(self.state, NoteState::Missed)
    }

    /// Whether the note is neither hit nor missed yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, NoteState::Pending)
    }

    /// The time the note was hit at, or [`f64::INFINITY`] if it was missed.
    #[must_use]
    pub const fn hit_time(&self) -> Option<f64> {
        match self.state {
            NoteState::Pending => None,
            NoteState::Hit(time) => Some(time),
            NoteState::Missed => Some(f64::INFINITY),
        }
    }

    /// The absolute timing error of the resolution, infinite for a miss.
    #[must_use]
    pub fn reaction(&self) -> Option<f64> {
        self.hit_time().map(|hit| (hit - self.time).abs())
    }

    /// The time the hold ends at.
    #[must_use]
    pub fn end_time(&self) -> f64 {
        self.time + self.length
    }

    /// Marks the note as hit. Returns `false` and changes nothing if it was already resolved.
    pub(crate) fn resolve_hit(&mut self, time: f64) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.state = NoteState::Hit(time);
        true
    }

    /// Marks the note as missed. Returns `false` and changes nothing if it was already resolved.
    pub(crate) fn resolve_miss(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.state = NoteState::Missed;
        true
    }

    pub(crate) fn reset(&mut self) {
        self.state = NoteState::Pending;
    }
}

impl<K: Ord> Note<K> {
    /// Timeline order: time, then lane, then kind.
    #[must_use]
    pub fn timeline_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.lane.cmp(&other.lane))
            .then(self.kind.cmp(&other.kind))
    }
}
