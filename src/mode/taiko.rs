//! Taiko drum charts: don on lane 0, ka on lane 1.

use serde::{Deserialize, Serialize};

use crate::{
    chart::{
        Gamemode,
        note::{NoteKind, ScoringRule},
    },
    engine::EngineConfig,
    judgement::{Judgement, JudgementTable},
};

/// Lane of don (center) notes.
pub const DON_LANE: usize = 0;
/// Lane of ka (rim) notes.
pub const KA_LANE: usize = 1;

/// Note types of Taiko charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaikoNote {
    /// Center hit.
    Don,
    /// Rim hit.
    Ka,
    /// Large center hit.
    LargeDon,
    /// Large rim hit.
    LargeKa,
    /// Drumroll, displayed only.
    Drumroll,
    /// Large drumroll, displayed only.
    LargeDrumroll,
    /// Spinner, displayed only.
    Denden,
}

impl TaikoNote {
    /// The drum side hitting this note, `None` for display-only notes.
    #[must_use]
    pub const fn lane(self) -> Option<usize> {
        match self {
            Self::Don | Self::LargeDon => Some(DON_LANE),
            Self::Ka | Self::LargeKa => Some(KA_LANE),
            Self::Drumroll | Self::LargeDrumroll | Self::Denden => None,
        }
    }
}

impl NoteKind for TaikoNote {
    const GAMEMODE: Gamemode = Gamemode::Taiko;
    const NATIVE_SUSTAINS: bool = false;

    fn rule(self) -> ScoringRule {
        match self {
            Self::Don | Self::Ka | Self::LargeDon | Self::LargeKa => ScoringRule::Judged,
            Self::Drumroll | Self::LargeDrumroll | Self::Denden => ScoringRule::Unscored,
        }
    }

    fn allows_length(self) -> bool {
        self.rule() == ScoringRule::Unscored
    }

    fn default_judgements() -> JudgementTable {
        JudgementTable::from_sorted(vec![
            Judgement::new("great", 25.0, 300, 1.0, 0.02),
            Judgement::new("ok", 75.0, 150, 0.5, 0.01),
            Judgement::miss("miss", -0.05),
        ])
    }

    fn default_config() -> EngineConfig {
        EngineConfig {
            min_hp: 0.0,
            max_hp: 1.0,
            initial_hp: 0.5,
            ..EngineConfig::default()
        }
    }
}
