//! Five-fret guitar charts with an open lane.

use serde::{Deserialize, Serialize};

use crate::{
    chart::{
        Gamemode,
        note::{NoteKind, ScoringRule},
    },
    engine::EngineConfig,
    judgement::{Judgement, JudgementTable},
};

/// Lane of open notes.
pub const OPEN_LANE: usize = 5;

/// Note types of Hero charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeroNote {
    /// Needs a strum.
    Strum,
    /// Hammer-on or pull-off, playable without strumming.
    Hopo,
    /// Playable by fretting alone.
    Tap,
}

impl NoteKind for HeroNote {
    const GAMEMODE: Gamemode = Gamemode::Hero;
    const NATIVE_SUSTAINS: bool = true;

    fn rule(self) -> ScoringRule {
        ScoringRule::Judged
    }

    fn default_judgements() -> JudgementTable {
        JudgementTable::from_sorted(vec![
            Judgement::new("hit", 70.0, 50, 1.0, 0.02),
            Judgement::miss("miss", -0.04),
        ])
    }

    fn default_config() -> EngineConfig {
        EngineConfig {
            min_hp: 0.0,
            max_hp: 1.0,
            initial_hp: 0.5,
            bomb_penalty: 0.0,
            heal_amount: 0.0,
            sustain_health: 0.01,
            hold_drop_penalty: 0.0,
            hold_release_grace: 0.1,
            lanes: None,
        }
    }
}
