//! Prelude module for this crate.
//!
//! Re-exports the chart model, the engine, every gamemode and the loader, so that
//! `use charm::prelude::*;` is enough for most uses.

// Re-export the chart model
pub use crate::chart::{
    Chart, ChartBuilder, ChartMetadata, ChartSet, Format, Gamemode,
    event::{Event, EventKind},
    fin_f64::FinF64,
    note::{Note, NoteKind, ScoringRule, Trigger},
    tempo::{BpmChange, Stop, StopKind, TempoMap},
};

// Re-export scoring types
pub use crate::{
    engine::{
        Engine, EngineConfig, HealthEffect, InputEvent, JudgementRecord, KeyAction, ScoreOutcome,
        Stats, StreakEffect, score_note,
    },
    judgement::{Judgement, JudgementTable, JudgementTableError},
};

// Re-export gamemodes
pub use crate::mode::{FnfNote, HeroNote, ManiaNote, TaikoNote};

// Re-export parsing and loading
pub use crate::{
    loader::{LoadedCharts, load_chart, load_chartset, load_chartsets, resolve_parsers},
    parse::{ChartParser, ParseConfig, lanes::LaneMap},
};

pub use crate::error::{ChartError, Result};
