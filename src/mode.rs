//! Gamemode definitions: note kinds with their scoring rules, default judgement tables and health settings.

pub mod fnf;
pub mod hero;
pub mod mania;
pub mod taiko;

use thiserror::Error;

/// A note type name that the gamemode does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown note type {0:?}")]
pub struct UnknownNoteType(pub String);

pub use self::{fnf::FnfNote, hero::HeroNote, mania::ManiaNote, taiko::TaikoNote};
