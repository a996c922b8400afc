//! The chart and scoring core of a multi-mode rhythm game.
//!
//! This crate consists of three layers:
//!
//! - [`chart`] defines the common timeline model: [`chart::Chart`] owns time-sorted
//!   [`chart::note::Note`]s and [`chart::event::Event`]s, and [`chart::tempo::TempoMap`]
//!   converts beats into seconds across BPM changes and stops.
//! - [`parse`] turns chart files into that model. Supported formats are FNF JSON (v1 and v2),
//!   StepMania (`.sm`/`.ssc`), osu! (`.osu`, mania and taiko) and Clone Hero (`.chart`).
//!   [`loader`] sniffs a folder and routes it to the matching parsers.
//! - [`engine`] scores player input against a chart. It is generic over a [`chart::note::NoteKind`],
//!   and each gamemode in [`mode`] supplies its note kinds, judgement table and health settings.
//!
//! In detail, our policies are:
//!
//! - Times are seconds as `f64`, relative to the start of the song audio.
//! - Parsers either return complete, sorted charts or fail. They never return a partial chart.
//! - Scoring is single-threaded and deterministic: the same chart, input events and chart time
//!   sequence always produce the same judgements.
//!
//! # Example
//!
//! ```
//! use charm::prelude::*;
//!
//! let chart = Chart::<FnfNote>::builder(4)
//!     .note(Note::new(1.0, 0, FnfNote::Normal))
//!     .build();
//! let mut engine = Engine::new(chart);
//! engine.advance(1.05, [InputEvent::down(1.05, 0)]);
//! assert!(engine.chart().notes[0].is_hit());
//! assert_eq!(engine.stats().streak, 1);
//! ```

pub mod chart;
pub mod engine;
pub mod error;
pub mod judgement;
pub mod loader;
pub mod mode;
pub mod parse;
pub mod prelude;
pub mod util;

pub use error::{ChartError, Result};
