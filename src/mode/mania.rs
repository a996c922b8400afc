//! Dance and key-column charts (StepMania, osu!mania).
//!
//! Timing windows and life changes follow the ITG defaults.

use serde::{Deserialize, Serialize};

use crate::{
    chart::{
        Gamemode,
        note::{NoteKind, ScoringRule, Trigger},
    },
    engine::EngineConfig,
    judgement::{Judgement, JudgementTable},
};

/// Note types of mania charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManiaNote {
    /// Tap, or hold head if it has a length.
    Normal,
    /// Roll head.
    Roll,
    /// Must not be pressed.
    Mine,
    /// Hit by releasing the key.
    Lift,
    /// Displayed, never judged.
    Fake,
}

impl NoteKind for ManiaNote {
    const GAMEMODE: Gamemode = Gamemode::Mania;
    const NATIVE_SUSTAINS: bool = true;

    fn rule(self) -> ScoringRule {
        match self {
            Self::Normal | Self::Roll | Self::Lift => ScoringRule::Judged,
            Self::Mine => ScoringRule::Bomb,
            Self::Fake => ScoringRule::Unscored,
        }
    }

    fn trigger(self) -> Trigger {
        match self {
            Self::Lift => Trigger::Release,
            _ => Trigger::Press,
        }
    }

    fn allows_length(self) -> bool {
        matches!(self, Self::Normal | Self::Roll)
    }

    fn default_judgements() -> JudgementTable {
        JudgementTable::from_sorted(vec![
            Judgement::new("fantastic", 23.0, 5, 1.0, 0.008),
            Judgement::new("excellent", 44.5, 4, 0.8, 0.008),
            Judgement::new("great", 103.5, 2, 0.4, 0.004),
            Judgement::new("decent", 136.5, 1, 0.2, 0.0),
            Judgement::new("way off", 181.5, 0, 0.0, -0.05),
            Judgement::miss("miss", -0.1),
        ])
    }

    fn default_config() -> EngineConfig {
        EngineConfig {
            min_hp: 0.0,
            max_hp: 1.0,
            initial_hp: 0.5,
            bomb_penalty: 0.05,
            heal_amount: 0.0,
            sustain_health: 0.008,
            hold_drop_penalty: 0.08,
            hold_release_grace: 0.1,
            lanes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifts_trigger_on_release() {
        assert_eq!(ManiaNote::Lift.trigger(), Trigger::Release);
        assert_eq!(ManiaNote::Normal.trigger(), Trigger::Press);
        assert_eq!(ManiaNote::Mine.rule(), ScoringRule::Bomb);
    }

    #[test]
    fn itg_windows() {
        let table = ManiaNote::default_judgements();
        assert_eq!(table.judge(0.0225).1.name, "fantastic");
        assert_eq!(table.judge(0.1).1.name, "great");
        assert_eq!(table.judge(0.19).1.name, "miss");
    }
}
