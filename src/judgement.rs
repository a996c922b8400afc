//! Timing tiers and their lookup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance in milliseconds when comparing a reaction time against a window edge.
const WINDOW_EPSILON_MS: f64 = 1e-6;

/// A named timing tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    /// Display name, such as `sick` or `miss`.
    pub name: String,
    /// The largest timing error in milliseconds this tier accepts. `None` marks the catch-all miss tier.
    pub window_ms: Option<f64>,
    /// Score added per note.
    #[serde(default)]
    pub score: u64,
    /// Accuracy weight in `0..=1`.
    #[serde(default)]
    pub accuracy: f64,
    /// Health change per note.
    #[serde(default)]
    pub health: f64,
}

impl Judgement {
    /// Creates a tier with a finite window.
    #[must_use]
    pub fn new(name: impl Into<String>, window_ms: f64, score: u64, accuracy: f64, health: f64) -> Self {
        Self {
            name: name.into(),
            window_ms: Some(window_ms),
            score,
            accuracy,
            health,
        }
    }

    /// Creates the catch-all miss tier.
    #[must_use]
    pub fn miss(name: impl Into<String>, health: f64) -> Self {
        Self {
            name: name.into(),
            window_ms: None,
            score: 0,
            accuracy: 0.0,
            health,
        }
    }

    /// Whether this is the catch-all tier.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        self.window_ms.is_none()
    }
}

/// An invalid judgement table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JudgementTableError {
    /// The table has no tiers.
    #[error("judgement table is empty")]
    Empty,
    /// No tier has an unbounded window.
    #[error("judgement table has no catch-all miss tier")]
    NoCatchAll,
    /// More than one tier has an unbounded window.
    #[error("judgement table has more than one catch-all tier: {first} and {second}")]
    MultipleCatchAll {
        /// The first catch-all tier.
        first: String,
        /// The second catch-all tier.
        second: String,
    },
    /// A window is negative or not finite.
    #[error("judgement {name} has an invalid window {window_ms}")]
    InvalidWindow {
        /// The tier.
        name: String,
        /// Its window.
        window_ms: f64,
    },
    /// Two tiers have the same window, which makes the lookup ambiguous.
    #[error("judgements {first} and {second} share the window {window_ms}")]
    DuplicateWindow {
        /// The first tier.
        first: String,
        /// The second tier.
        second: String,
        /// The shared window.
        window_ms: f64,
    },
}

/// Judgement tiers of a gamemode, ordered from the tightest window to the catch-all miss tier.
///
/// The order of the input does not matter: the table is always searched narrowest-first, so a
/// reaction time maps to the same tier however the tiers were listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Judgement>", into = "Vec<Judgement>")]
pub struct JudgementTable {
    /// Sorted by window, the catch-all last.
    tiers: Vec<Judgement>,
}

impl JudgementTable {
    /// Validates and sorts tiers into a table.
    ///
    /// # Errors
    ///
    /// See [`JudgementTableError`].
    pub fn new(tiers: impl IntoIterator<Item = Judgement>) -> Result<Self, JudgementTableError> {
        let mut tiers: Vec<_> = tiers.into_iter().collect();
        if tiers.is_empty() {
            return Err(JudgementTableError::Empty);
        }
        if let Some(bad) = tiers.iter().find(|tier| {
            tier.window_ms
                .is_some_and(|window| !window.is_finite() || window < 0.0)
        }) {
            return Err(JudgementTableError::InvalidWindow {
                name: bad.name.clone(),
                window_ms: bad.window_ms.unwrap_or_default(),
            });
        }
        let mut catch_all = tiers.iter().filter(|tier| tier.is_miss());
        let Some(first) = catch_all.next() else {
            return Err(JudgementTableError::NoCatchAll);
        };
        if let Some(second) = catch_all.next() {
            return Err(JudgementTableError::MultipleCatchAll {
                first: first.name.clone(),
                second: second.name.clone(),
            });
        }

        tiers.sort_by(|a, b| {
            let a = a.window_ms.unwrap_or(f64::INFINITY);
            let b = b.window_ms.unwrap_or(f64::INFINITY);
            a.total_cmp(&b)
        });
        for pair in tiers.windows(2) {
            if let (Some(a), Some(b)) = (pair[0].window_ms, pair[1].window_ms) {
                if (a - b).abs() < WINDOW_EPSILON_MS {
                    return Err(JudgementTableError::DuplicateWindow {
                        first: pair[0].name.clone(),
                        second: pair[1].name.clone(),
                        window_ms: a,
                    });
                }
            }
        }
        Ok(Self { tiers })
    }

    /// Builds a table from tiers already sorted narrowest-first with the catch-all last.
    pub(crate) fn from_sorted(tiers: Vec<Judgement>) -> Self {
        debug_assert!(tiers.last().is_some_and(Judgement::is_miss));
        Self { tiers }
    }

    /// Finds the tightest tier accepting a timing error of `reaction` seconds.
    ///
    /// An infinite reaction, as recorded for missed notes, always lands on the catch-all tier.
    #[must_use]
    pub fn judge(&self, reaction: f64) -> (usize, &Judgement) {
        let reaction_ms = reaction.abs() * 1000.0;
        let index = self
            .tiers
            .iter()
            .position(|tier| {
                tier.window_ms
                    .is_none_or(|window| reaction_ms <= window + WINDOW_EPSILON_MS)
            })
            .unwrap_or(self.tiers.len() - 1);
        (index, &self.tiers[index])
    }

    /// Whether a timing error of `reaction` seconds is inside the widest finite window.
    #[must_use]
    pub fn within_window(&self, reaction: f64) -> bool {
        reaction.abs() * 1000.0 <= self.hit_window() * 1000.0 + WINDOW_EPSILON_MS
    }

    /// The widest finite window in seconds, `0` if the table has only the catch-all tier.
    #[must_use]
    pub fn hit_window(&self) -> f64 {
        self.tiers
            .iter()
            .filter_map(|tier| tier.window_ms)
            .fold(0.0, f64::max)
            / 1000.0
    }

    /// The catch-all miss tier.
    #[must_use]
    pub fn miss(&self) -> &Judgement {
        &self.tiers[self.miss_index()]
    }

    /// Index of the catch-all miss tier.
    #[must_use]
    pub fn miss_index(&self) -> usize {
        self.tiers.len() - 1
    }

    /// The tier at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Judgement> {
        self.tiers.get(index)
    }

    /// Tiers from the tightest to the catch-all.
    pub fn iter(&self) -> std::slice::Iter<'_, Judgement> {
        self.tiers.iter()
    }

    /// Number of tiers, including the catch-all.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always `false`, a valid table has at least the catch-all tier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl TryFrom<Vec<Judgement>> for JudgementTable {
    type Error = JudgementTableError;

    fn try_from(tiers: Vec<Judgement>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<JudgementTable> for Vec<Judgement> {
    fn from(table: JudgementTable) -> Self {
        table.tiers
    }
}

impl<'a> IntoIterator for &'a JudgementTable {
    type Item = &'a Judgement;
    type IntoIter = std::slice::Iter<'a, Judgement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<Judgement> {
        vec![
            Judgement::miss("miss", -0.1),
            Judgement::new("good", 90.0, 200, 0.75, 0.02),
            Judgement::new("sick", 45.0, 350, 1.0, 0.04),
        ]
    }

    #[test]
    fn narrowest_first_regardless_of_input_order() {
        let table = JudgementTable::new(tiers()).unwrap();
        let mut reversed = tiers();
        reversed.reverse();
        let other = JudgementTable::new(reversed).unwrap();
        for reaction in [0.0, 0.03, 0.045, 0.05, 0.09, 0.2, f64::INFINITY] {
            assert_eq!(table.judge(reaction), other.judge(reaction));
        }
        assert_eq!(table.judge(0.045).1.name, "sick");
        assert_eq!(table.judge(-0.05).1.name, "good");
        assert_eq!(table.judge(0.2).1.name, "miss");
        assert_eq!(table.judge(f64::INFINITY).0, table.miss_index());
    }

    #[test]
    fn hit_window_is_widest_finite() {
        let table = JudgementTable::new(tiers()).unwrap();
        assert!((table.hit_window() - 0.09).abs() < 1e-12);
        assert!(table.within_window(0.09));
        assert!(!table.within_window(0.0901));
    }

    #[test]
    fn rejects_invalid_tables() {
        assert_eq!(JudgementTable::new(Vec::new()), Err(JudgementTableError::Empty));
        assert_eq!(
            JudgementTable::new([Judgement::new("sick", 45.0, 1, 1.0, 0.0)]),
            Err(JudgementTableError::NoCatchAll)
        );
        assert!(matches!(
            JudgementTable::new([Judgement::miss("a", 0.0), Judgement::miss("b", 0.0)]),
            Err(JudgementTableError::MultipleCatchAll { .. })
        ));
        assert!(matches!(
            JudgementTable::new([Judgement::miss("miss", 0.0), Judgement::new("x", -1.0, 0, 0.0, 0.0)]),
            Err(JudgementTableError::InvalidWindow { .. })
        ));
        assert!(matches!(
            JudgementTable::new([
                Judgement::miss("miss", 0.0),
                Judgement::new("a", 45.0, 0, 0.0, 0.0),
                Judgement::new("b", 45.0, 0, 0.0, 0.0),
            ]),
            Err(JudgementTableError::DuplicateWindow { .. })
        ));
    }

    #[test]
    fn deserializes_with_null_miss_window() {
        let table: JudgementTable = serde_json::from_str(
            r#"[
                {"name": "great", "window_ms": 25, "score": 300, "accuracy": 1.0, "health": 0.02},
                {"name": "miss", "window_ms": null, "health": -0.05}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.miss().is_miss());
        assert!(serde_json::from_str::<JudgementTable>("[]").is_err());
    }
}
