//! Scoring of player input against a chart.
//!
//! An [`Engine`] owns one chart and is driven by [`Engine::advance`], which takes the current
//! chart time and the input events that arrived since the previous call. Each call runs one
//! scoring pass:
//!
//! 1. Unresolved notes whose time is within the hit window of the chart time become candidates.
//! 2. A candidate the player can no longer reach is missed. A sustain tick is hit if its lane is
//!    held. Any other candidate is hit by the first unconsumed input event of its trigger kind on
//!    its lane inside the hit window, which consumes that event.
//! 3. Every resolved note is scored by [`score_note`], and the health is clamped.
//!
//! The same chart, input events and chart time sequence always produce the same result.

use serde::{Deserialize, Serialize};

use crate::{
    chart::{
        Chart,
        note::{Note, NoteKind, ScoringRule, Trigger},
    },
    judgement::JudgementTable,
};

/// Direction of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// The key went down.
    Down,
    /// The key went up.
    Up,
}

/// A key event on a lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Chart time of the event in seconds.
    pub time: f64,
    /// The lane.
    pub lane: usize,
    /// Press or release.
    pub action: KeyAction,
}

impl InputEvent {
    /// A key press.
    #[must_use]
    pub const fn down(time: f64, lane: usize) -> Self {
        Self {
            time,
            lane,
            action: KeyAction::Down,
        }
    }

    /// A key release.
    #[must_use]
    pub const fn up(time: f64, lane: usize) -> Self {
        Self {
            time,
            lane,
            action: KeyAction::Up,
        }
    }

    const fn triggers(&self, trigger: Trigger) -> bool {
        matches!(
            (self.action, trigger),
            (KeyAction::Down, Trigger::Press) | (KeyAction::Up, Trigger::Release)
        )
    }
}

/// Health settings of an engine.
///
/// Each gamemode has its own defaults in [`NoteKind::default_config`]. Use
/// [`EngineConfig::with_overrides`] to change some fields from a JSON settings object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower health bound. Reaching it kills the player.
    pub min_hp: f64,
    /// Upper health bound.
    pub max_hp: f64,
    /// Health at the start.
    pub initial_hp: f64,
    /// Health lost by hitting a bomb.
    pub bomb_penalty: f64,
    /// Health gained by hitting a heal note, instead of its tier's health delta.
    pub heal_amount: f64,
    /// Health gained by a held sustain tick or a completed hold, and lost by a dropped tick.
    pub sustain_health: f64,
    /// Health lost by releasing a native hold early.
    pub hold_drop_penalty: f64,
    /// Seconds before the end of a native hold at which releasing no longer drops it.
    pub hold_release_grace: f64,
    /// Number of input lanes, the chart's lane count if `None`.
    pub lanes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_hp: 0.0,
            max_hp: 1.0,
            initial_hp: 0.5,
            bomb_penalty: 0.0,
            heal_amount: 0.0,
            sustain_health: 0.0,
            hold_drop_penalty: 0.0,
            hold_release_grace: 0.0,
            lanes: None,
        }
    }
}

impl EngineConfig {
    /// Replaces the fields named in a JSON object, keeping the others.
    ///
    /// # Errors
    ///
    /// If a named field has the wrong type.
    pub fn with_overrides(self, overrides: &serde_json::Value) -> serde_json::Result<Self> {
        let mut value = serde_json::to_value(&self)?;
        if let (Some(base), Some(overrides)) = (value.as_object_mut(), overrides.as_object()) {
            for (key, field) in overrides {
                base.insert(key.clone(), field.clone());
            }
        }
        serde_json::from_value(value)
    }
}

/// Health change of a scored note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthEffect {
    /// No change.
    None,
    /// Add this to the health.
    Delta(f64),
    /// Drop to the minimum.
    Kill,
}

/// Streak change of a scored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreakEffect {
    /// No change.
    Keep,
    /// A judged hit.
    Increment,
    /// A judged miss.
    Break,
}

/// The effect of one resolved note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    /// Score to add.
    pub score: u64,
    /// Accuracy weight, if the note counts towards accuracy.
    pub accuracy: Option<f64>,
    /// Health change.
    pub health: HealthEffect,
    /// Streak change.
    pub streak: StreakEffect,
    /// Index of the judgement tier, for judged notes.
    pub tier: Option<usize>,
    /// Whether a sustain tick produced this.
    pub sustain: bool,
}

impl ScoreOutcome {
    const NONE: Self = Self {
        score: 0,
        accuracy: None,
        health: HealthEffect::None,
        streak: StreakEffect::Keep,
        tier: None,
        sustain: false,
    };
}

/// Scores a resolved note. Returns `None` while the note is neither hit nor missed.
///
/// A missed note has an infinite reaction time and always lands on the catch-all tier.
#[must_use]
pub fn score_note<K: NoteKind>(
    note: &Note<K>,
    judgements: &JudgementTable,
    config: &EngineConfig,
) -> Option<ScoreOutcome> {
    let reaction = note.reaction()?;
    let hit = note.is_hit();
    let rule = note.kind.rule();
    Some(match rule {
        ScoringRule::Unscored => ScoreOutcome::NONE,
        ScoringRule::Sustain => ScoreOutcome {
            health: HealthEffect::Delta(if hit {
                config.sustain_health
            } else {
                -config.sustain_health
            }),
            sustain: true,
            ..ScoreOutcome::NONE
        },
        ScoringRule::Death if hit => ScoreOutcome {
            health: HealthEffect::Kill,
            ..ScoreOutcome::NONE
        },
        ScoringRule::Bomb if hit => ScoreOutcome {
            health: HealthEffect::Delta(-config.bomb_penalty),
            ..ScoreOutcome::NONE
        },
        ScoringRule::Death | ScoringRule::Bomb => ScoreOutcome::NONE,
        ScoringRule::Judged | ScoringRule::Heal => {
            let (tier, judgement) = judgements.judge(reaction);
            let landed = hit && !judgement.is_miss();
            let health = if rule == ScoringRule::Heal && landed {
                config.heal_amount
            } else {
                judgement.health
            };
            ScoreOutcome {
                score: judgement.score,
                accuracy: Some(judgement.accuracy),
                health: HealthEffect::Delta(health),
                streak: if landed {
                    StreakEffect::Increment
                } else {
                    StreakEffect::Break
                },
                tier: Some(tier),
                sustain: false,
            }
        }
    })
}

/// Running statistics of an engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Stats {
    /// Total score.
    pub score: u64,
    /// Current streak of judged hits.
    pub streak: u32,
    /// Longest streak so far.
    pub max_streak: u32,
    /// Judged notes hit.
    pub hits: u32,
    /// Judged notes missed.
    pub misses: u32,
    /// Sum of accuracy weights of judged notes.
    pub accuracy_sum: f64,
    /// Number of notes counting towards accuracy.
    pub accuracy_count: u32,
    /// Hits per judgement tier, in table order.
    pub judgement_counts: Vec<u32>,
    /// Native holds kept to their end.
    pub holds_completed: u32,
    /// Native holds released early.
    pub holds_dropped: u32,
    /// Whether the last scored note was a sustain tick.
    pub last_was_sustain: bool,
}

impl Stats {
    fn new(tiers: usize) -> Self {
        Self {
            judgement_counts: vec![0; tiers],
            ..Self::default()
        }
    }

    fn apply(&mut self, outcome: &ScoreOutcome) {
        self.last_was_sustain = outcome.sustain;
        self.score += outcome.score;
        if let Some(accuracy) = outcome.accuracy {
            self.accuracy_sum += accuracy;
            self.accuracy_count += 1;
        }
        if let Some(count) = outcome.tier.and_then(|tier| self.judgement_counts.get_mut(tier)) {
            *count += 1;
        }
        match outcome.streak {
            StreakEffect::Keep => {}
            StreakEffect::Increment => {
                self.hits += 1;
                self.streak += 1;
                self.max_streak = self.max_streak.max(self.streak);
            }
            StreakEffect::Break => {
                self.misses += 1;
                self.streak = 0;
            }
        }
    }
}

/// One resolved note.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgementRecord {
    /// Index of the note in the chart.
    pub note: usize,
    /// Chart time of the scoring pass which resolved it.
    pub chart_time: f64,
    /// The note's hit time, infinite for a miss.
    pub hit_time: f64,
    /// The scoring result.
    pub outcome: ScoreOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveHold {
    note: usize,
    lane: usize,
    /// When the head was hit, which may be before the note time.
    start: f64,
    end: f64,
}

/// The scoring state machine of one chart.
#[derive(Debug, Clone)]
pub struct Engine<K> {
    chart: Chart<K>,
    config: EngineConfig,
    judgements: JudgementTable,
    hit_window: f64,
    chart_time: f64,
    /// Indices of unresolved scored notes, in chart order.
    current: Vec<usize>,
    /// Unconsumed input events, sorted by time.
    inputs: Vec<InputEvent>,
    held: Vec<bool>,
    last_release: Vec<f64>,
    holds: Vec<ActiveHold>,
    health: f64,
    dead: bool,
    stats: Stats,
    log: Vec<JudgementRecord>,
}

impl<K: NoteKind> Engine<K> {
    /// Creates an engine with the gamemode's default judgements and health settings.
    #[must_use]
    pub fn new(chart: Chart<K>) -> Self {
        Self::with_config(chart, K::default_config(), K::default_judgements())
    }

    /// Creates an engine with custom settings.
    #[must_use]
    pub fn with_config(chart: Chart<K>, config: EngineConfig, judgements: JudgementTable) -> Self {
        let lanes = config.lanes.unwrap_or(chart.lanes);
        let mut engine = Self {
            hit_window: judgements.hit_window(),
            stats: Stats::new(judgements.len()),
            health: config.initial_hp,
            chart,
            config,
            judgements,
            chart_time: f64::NEG_INFINITY,
            current: Vec::new(),
            inputs: Vec::new(),
            held: vec![false; lanes],
            last_release: vec![f64::NEG_INFINITY; lanes],
            holds: Vec::new(),
            dead: false,
            log: Vec::new(),
        };
        engine.reset();
        engine
    }

    /// Moves the chart time forward, takes new input events and runs one scoring pass.
    ///
    /// A chart time earlier than the previous one is ignored, the events are still taken.
    pub fn advance(&mut self, chart_time: f64, events: impl IntoIterator<Item = InputEvent>) {
        if chart_time < self.chart_time {
            log::warn!(
                "chart time went backwards from {} to {chart_time}, keeping the former",
                self.chart_time
            );
        } else {
            self.chart_time = chart_time;
        }
        self.ingest(events);
        self.calculate_score();
    }

    fn ingest(&mut self, events: impl IntoIterator<Item = InputEvent>) {
        let before = self.inputs.len();
        for event in events {
            let Some(held) = self.held.get_mut(event.lane) else {
                log::warn!(
                    "input on lane {} ignored, the chart has {} lanes",
                    event.lane,
                    self.held.len()
                );
                continue;
            };
            match event.action {
                KeyAction::Down => *held = true,
                KeyAction::Up => {
                    *held = false;
                    self.last_release[event.lane] = event.time;
                }
            }
            self.inputs.push(event);
        }
        if self.inputs.len() != before {
            self.inputs.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
    }

    /// Runs one scoring pass at the current chart time.
    fn calculate_score(&mut self) {
        let now = self.chart_time;
        let mut resolved = Vec::new();
        for (position, &index) in self.current.iter().enumerate() {
            let note = &self.chart.notes[index];
            if note.time > now + self.hit_window {
                break;
            }
            let hit_time = if now > note.time + self.hit_window {
                None
            } else if note.kind.rule() == ScoringRule::Sustain {
                if note.time > now || !self.held.get(note.lane).copied().unwrap_or(false) {
                    continue;
                }
                Some(note.time)
            } else {
                let trigger = note.kind.trigger();
                let Some(input) = self.inputs.iter().position(|input| {
                    input.lane == note.lane
                        && input.triggers(trigger)
                        && self.judgements.within_window(input.time - note.time)
                }) else {
                    continue;
                };
                Some(self.inputs.remove(input).time)
            };
            resolved.push((position, index, hit_time));
        }

        for &(_, index, hit_time) in &resolved {
            self.resolve(index, hit_time);
        }
        let mut positions = resolved.iter().map(|&(position, ..)| position).peekable();
        let mut position = 0;
        self.current.retain(|_| {
            let keep = positions.next_if_eq(&position).is_none();
            position += 1;
            keep
        });

        self.update_holds();
        let horizon = now - 2.0 * self.hit_window;
        self.inputs.retain(|input| input.time >= horizon);

        self.health = self.health.clamp(self.config.min_hp, self.config.max_hp);
        if self.health <= self.config.min_hp {
            self.dead = true;
        }
    }

    fn resolve(&mut self, index: usize, hit_time: Option<f64>) {
        let note = &mut self.chart.notes[index];
        let accepted = match hit_time {
            Some(time) => note.resolve_hit(time),
            None => note.resolve_miss(),
        };
        if !accepted {
            log::warn!("note {index} at {} was already resolved, skipping it", note.time);
            return;
        }
        let note = &self.chart.notes[index];
        let Some(outcome) = score_note(note, &self.judgements, &self.config) else {
            return;
        };
        let hit_time = note.hit_time().unwrap_or(f64::INFINITY);
        if K::NATIVE_SUSTAINS && note.is_hit() && note.length > 0.0 {
            self.holds.push(ActiveHold {
                note: index,
                lane: note.lane,
                start: hit_time,
                end: note.end_time(),
            });
        }
        self.apply(&outcome);
        log::trace!(
            "note {index} at {:.3}s resolved at {hit_time:.3}s: {outcome:?}",
            self.chart.notes[index].time
        );
        self.log.push(JudgementRecord {
            note: index,
            chart_time: self.chart_time,
            hit_time,
            outcome,
        });
    }

    fn apply(&mut self, outcome: &ScoreOutcome) {
        match outcome.health {
            HealthEffect::None => {}
            HealthEffect::Delta(delta) => self.health += delta,
            HealthEffect::Kill => {
                self.health = self.config.min_hp;
                self.dead = true;
            }
        }
        self.stats.apply(outcome);
    }

    fn update_holds(&mut self) {
        let now = self.chart_time;
        let grace = self.config.hold_release_grace;
        let mut index = 0;
        while index < self.holds.len() {
            let hold = self.holds[index];
            let released = self.last_release[hold.lane];
            let dropped = released > hold.start && released < hold.end - grace;
            if dropped {
                self.health -= self.config.hold_drop_penalty;
                self.stats.holds_dropped += 1;
                log::trace!("hold of note {} dropped at {released:.3}s", hold.note);
            } else if now >= hold.end {
                self.health += self.config.sustain_health;
                self.stats.holds_completed += 1;
            } else {
                index += 1;
                continue;
            }
            self.holds.remove(index);
        }
    }

    /// Restores every note and statistic, and clears the death flag.
    pub fn reset(&mut self) {
        for note in &mut self.chart.notes {
            note.reset();
        }
        self.current = self
            .chart
            .notes
            .iter()
            .enumerate()
            .filter(|(_, note)| note.kind.rule() != ScoringRule::Unscored)
            .map(|(index, _)| index)
            .collect();
        self.chart_time = f64::NEG_INFINITY;
        self.inputs.clear();
        self.held.fill(false);
        self.last_release.fill(f64::NEG_INFINITY);
        self.holds.clear();
        self.health = self.config.initial_hp;
        self.dead = false;
        self.stats = Stats::new(self.judgements.len());
        self.log.clear();
    }

    /// Whether every scored note is resolved and no hold is active.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current.is_empty() && self.holds.is_empty()
    }

    /// Mean accuracy weight of judged notes, `None` before the first one.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        (self.stats.accuracy_count > 0)
            .then(|| self.stats.accuracy_sum / f64::from(self.stats.accuracy_count))
    }

    /// The chart being played.
    #[must_use]
    pub const fn chart(&self) -> &Chart<K> {
        &self.chart
    }

    /// Gives the chart back, with the hit state of its notes.
    #[must_use]
    pub fn into_chart(self) -> Chart<K> {
        self.chart
    }

    /// The statistics so far.
    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The current health.
    #[must_use]
    pub const fn health(&self) -> f64 {
        self.health
    }

    /// Whether the health has reached the minimum since the last reset.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// The latest chart time, negative infinity before the first advance.
    #[must_use]
    pub const fn chart_time(&self) -> f64 {
        self.chart_time
    }

    /// Every resolved note, in resolution order.
    #[must_use]
    pub fn log(&self) -> &[JudgementRecord] {
        &self.log
    }

    /// The judgement tiers in use.
    #[must_use]
    pub const fn judgements(&self) -> &JudgementTable {
        &self.judgements
    }

    /// The health settings in use.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The widest window in seconds.
    #[must_use]
    pub const fn hit_window(&self) -> f64 {
        self.hit_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::fnf::FnfNote;

    fn resolved(kind: FnfNote, hit: Option<f64>) -> Note<FnfNote> {
        let mut note = Note::new(1.0, 0, kind);
        match hit {
            Some(time) => assert!(note.resolve_hit(time)),
            None => assert!(note.resolve_miss()),
        }
        note
    }

    #[test]
    fn pending_notes_are_not_scored() {
        let note = Note::new(1.0, 0, FnfNote::Normal);
        let table = FnfNote::default_judgements();
        assert_eq!(score_note(&note, &table, &FnfNote::default_config()), None);
    }

    #[test]
    fn rules() {
        let table = FnfNote::default_judgements();
        let config = FnfNote::default_config();
        let score = |note| score_note(&note, &table, &config).unwrap();

        let sick = score(resolved(FnfNote::Normal, Some(1.01)));
        assert_eq!(sick.tier, Some(0));
        assert_eq!(sick.streak, StreakEffect::Increment);
        assert_eq!(sick.health, HealthEffect::Delta(0.04));

        let heal = score(resolved(FnfNote::Heal, Some(1.01)));
        assert_eq!(heal.health, HealthEffect::Delta(config.heal_amount));
        let missed_heal = score(resolved(FnfNote::Heal, None));
        assert_eq!(missed_heal.health, HealthEffect::Delta(-0.1));
        assert_eq!(missed_heal.streak, StreakEffect::Break);

        assert_eq!(score(resolved(FnfNote::Death, Some(1.0))).health, HealthEffect::Kill);
        assert_eq!(score(resolved(FnfNote::Death, None)), ScoreOutcome::NONE);
        assert_eq!(
            score(resolved(FnfNote::Bomb, Some(1.0))).health,
            HealthEffect::Delta(-config.bomb_penalty)
        );
        assert_eq!(score(resolved(FnfNote::Bomb, None)), ScoreOutcome::NONE);

        let tick = score(resolved(FnfNote::Sustain, None));
        assert_eq!(tick.health, HealthEffect::Delta(-config.sustain_health));
        assert_eq!(tick.streak, StreakEffect::Keep);
        assert!(tick.sustain && tick.accuracy.is_none());
    }

    #[test]
    fn overrides_keep_other_fields() {
        let config = FnfNote::default_config()
            .with_overrides(&serde_json::json!({"bomb_penalty": 0.25}))
            .unwrap();
        assert_eq!(config.bomb_penalty, 0.25);
        assert_eq!(config.max_hp, 2.0);
        assert!(
            EngineConfig::default()
                .with_overrides(&serde_json::json!({"max_hp": "full"}))
                .is_err()
        );
    }
}
