//! Time-stamped chart events which are not notes.

use serde::Serialize;

/// An occurrence on the chart timeline, independent of notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Time in seconds from the start of the song.
    pub time: f64,
    /// What happens.
    pub kind: EventKind,
}

/// The type of an [`Event`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The tempo changes.
    BpmChange {
        /// The new tempo.
        bpm: f64,
    },
    /// The camera moves to a player.
    CameraFocus {
        /// `0` for the player, `1` for the opponent, other values for extra characters.
        player: u32,
    },
    /// The camera zooms.
    CameraZoom {
        /// Zoom factor.
        zoom: f64,
        /// Tween duration in steps, if given.
        duration: Option<f64>,
    },
    /// A character plays an animation.
    PlayAnimation {
        /// The character or prop.
        target: String,
        /// The animation name.
        animation: String,
    },
    /// A countdown marker before the first beat.
    Countdown {
        /// Counts left, `0` for "go".
        remaining: u8,
    },
    /// The time signature changes.
    TimeSignature {
        /// Beats per measure.
        numerator: u32,
        /// Beat unit.
        denominator: u32,
    },
    /// A named song section starts.
    Section {
        /// The section label.
        name: String,
    },
    /// A lyric line or syllable.
    Lyric {
        /// The text.
        text: String,
    },
    /// A star power phrase starts.
    StarPower {
        /// Phrase length in seconds.
        length: f64,
    },
    /// A solo starts or ends.
    Solo {
        /// `true` at the start.
        start: bool,
    },
    /// The scroll pauses.
    Stop {
        /// Pause length in seconds.
        duration: f64,
    },
    /// An event this crate does not model, kept verbatim.
    Custom {
        /// The source event name.
        name: String,
        /// The source payload.
        value: serde_json::Value,
    },
}

impl Event {
    /// Creates an event.
    #[must_use]
    pub const fn new(time: f64, kind: EventKind) -> Self {
        Self { time, kind }
    }
}

/// Sorts events by time, keeping the source order of simultaneous events.
pub(crate) fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_is_stable() {
        let mut events = vec![
            Event::new(2.0, EventKind::Solo { start: false }),
            Event::new(1.0, EventKind::Section { name: "a".into() }),
            Event::new(1.0, EventKind::Section { name: "b".into() }),
        ];
        sort_events(&mut events);
        assert_eq!(
            events[1].kind,
            EventKind::Section { name: "b".into() }
        );
        assert_eq!(events[2].time, 2.0);
    }

    #[test]
    fn serializes_tagged() {
        let event = Event::new(0.5, EventKind::BpmChange { bpm: 150.0 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"time": 0.5, "kind": {"type": "bpm_change", "bpm": 150.0}})
        );
    }
}
