//! Mapping of FNF source lanes to players, lanes and note types.

use std::{fs, io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ParseConfig, from_json};
use crate::{
    error::{ChartError, Result},
    mode::{UnknownNoteType, fnf::FnfNote},
};

/// Name of the lane map override file in an FNF chart folder.
pub const LANE_MAP_FILE: &str = "fnf.json";

/// Where a source lane ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u8, usize, String)", into = "(u8, usize, String)")]
pub struct LaneTarget {
    /// `0` for the player whose section it is, `1` for the other.
    pub player: u8,
    /// Lane on that player's chart.
    pub lane: usize,
    /// Note type.
    pub kind: FnfNote,
}

/// An invalid lane map entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaneTargetError {
    /// Only two players exist.
    #[error("player must be 0 or 1, got {0}")]
    InvalidPlayer(u8),
    /// The type name is unknown.
    #[error(transparent)]
    UnknownType(#[from] UnknownNoteType),
}

impl TryFrom<(u8, usize, String)> for LaneTarget {
    type Error = LaneTargetError;

    fn try_from((player, lane, kind): (u8, usize, String)) -> std::result::Result<Self, Self::Error> {
        if player > 1 {
            return Err(LaneTargetError::InvalidPlayer(player));
        }
        Ok(Self {
            player,
            lane,
            kind: kind.parse()?,
        })
    }
}

impl From<LaneTarget> for (u8, usize, String) {
    fn from(target: LaneTarget) -> Self {
        let kind = serde_json::to_value(target.kind)
            .ok()
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_default();
        (target.player, target.lane, kind)
    }
}

/// Lane map of FNF charts, indexed by source lane.
///
/// The default maps lanes 0 to 3 to the player whose section it is and 4 to 7 to the other one,
/// all as normal notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneMap {
    lanes: Vec<LaneTarget>,
}

impl Default for LaneMap {
    fn default() -> Self {
        Self {
            lanes: (0..8)
                .map(|lane| LaneTarget {
                    player: u8::from(lane >= 4),
                    lane: lane % 4,
                    kind: FnfNote::Normal,
                })
                .collect(),
        }
    }
}

impl LaneMap {
    /// Creates a map from targets indexed by source lane.
    #[must_use]
    pub const fn new(lanes: Vec<LaneTarget>) -> Self {
        Self { lanes }
    }

    /// The target of a source lane, `None` if unmapped.
    #[must_use]
    pub fn get(&self, source: i64) -> Option<LaneTarget> {
        usize::try_from(source)
            .ok()
            .and_then(|index| self.lanes.get(index))
            .copied()
    }

    /// Lane count of each player's chart.
    #[must_use]
    pub fn lanes_per_player(&self) -> usize {
        self.lanes
            .iter()
            .map(|target| target.lane + 1)
            .max()
            .unwrap_or(0)
            .max(4)
    }

    /// Reads `fnf.json` in `folder`, `None` if there is none.
    ///
    /// # Errors
    ///
    /// If the file exists but cannot be read or is invalid.
    pub fn from_folder(folder: &Path) -> Result<Option<Self>> {
        let path = folder.join(LANE_MAP_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => from_json(&path, &text).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ChartError::io(path, err)),
        }
    }

    /// The map in effect for `folder`: the configured override, else `fnf.json`, else the default.
    ///
    /// # Errors
    ///
    /// See [`LaneMap::from_folder`].
    pub fn resolve(config: &ParseConfig, folder: &Path) -> Result<Self> {
        if let Some(map) = &config.fnf_lane_map {
            return Ok(map.clone());
        }
        Ok(Self::from_folder(folder)?.unwrap_or_default())
    }
}
