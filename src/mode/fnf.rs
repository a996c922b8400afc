//! FNF style four-key charts.
//!
//! Holds are not judged natively: the parser synthesizes [`FnfNote::Sustain`] ticks along the
//! held duration, and each tick is resolved by whether its lane is held when it passes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownNoteType;
use crate::{
    chart::{
        Gamemode,
        note::{NoteKind, ScoringRule},
    },
    engine::EngineConfig,
    judgement::{Judgement, JudgementTable},
};

/// Note types of FNF charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FnfNote {
    /// A regular note.
    Normal,
    /// Hitting it costs health.
    Bomb,
    /// Hitting it kills.
    Death,
    /// Hitting it heals.
    Heal,
    /// A regular note drawn with a warning.
    Caution,
    /// A beat marker across the highway.
    Strikeline,
    /// A synthesized hold tick.
    Sustain,
}

impl NoteKind for FnfNote {
    const GAMEMODE: Gamemode = Gamemode::FourKey;
    const NATIVE_SUSTAINS: bool = false;

    fn rule(self) -> ScoringRule {
        match self {
            Self::Normal | Self::Caution => ScoringRule::Judged,
            Self::Bomb => ScoringRule::Bomb,
            Self::Death => ScoringRule::Death,
            Self::Heal => ScoringRule::Heal,
            Self::Strikeline => ScoringRule::Unscored,
            Self::Sustain => ScoringRule::Sustain,
        }
    }

    fn allows_length(self) -> bool {
        self == Self::Normal
    }

    fn default_judgements() -> JudgementTable {
        JudgementTable::from_sorted(vec![
            Judgement::new("sick", 45.0, 350, 1.0, 0.04),
            Judgement::new("good", 90.0, 200, 0.75, 0.02),
            Judgement::new("bad", 135.0, 100, 0.5, 0.0),
            Judgement::new("awful", 166.0, 50, 0.25, -0.06),
            Judgement::miss("miss", -0.1),
        ])
    }

    fn default_config() -> EngineConfig {
        EngineConfig {
            min_hp: 0.0,
            max_hp: 2.0,
            initial_hp: 1.0,
            bomb_penalty: 0.5,
            heal_amount: 0.4,
            sustain_health: 0.01,
            hold_drop_penalty: 0.0,
            hold_release_grace: 0.0,
            lanes: None,
        }
    }
}

impl FromStr for FnfNote {
    type Err = UnknownNoteType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "normal" | "" => Self::Normal,
            "bomb" => Self::Bomb,
            "death" => Self::Death,
            "heal" => Self::Heal,
            "caution" => Self::Caution,
            "strikeline" => Self::Strikeline,
            "sustain" => Self::Sustain,
            _ => return Err(UnknownNoteType(s.to_owned())),
        })
    }
}
