//! Chart file parsers.
//!
//! Every format implements [`ChartParser`]. Parsers are cheap structs borrowing a [`ParseConfig`];
//! [`crate::loader`] decides which of them handle a folder.

pub mod fnf_v1;
pub mod fnf_v2;
pub mod hero;
pub mod lanes;
pub mod osu;
pub mod stepmania;

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use self::lanes::LaneMap;
use crate::{
    chart::{Chart, ChartMetadata, Format, note::Note, note::NoteKind, tempo::TempoMap},
    error::{ChartError, Result},
};

/// Options shared by all parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// FNF lane map which takes precedence over any `fnf.json` in a chart folder.
    pub fnf_lane_map: Option<LaneMap>,
    /// Whether FNF holds are turned into sixteenth-note sustain ticks.
    pub synthesize_sustain_ticks: bool,
    /// Hero natural HOPO threshold in beats, `65 / 192` if `None`.
    pub hopo_threshold: Option<f64>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            fnf_lane_map: None,
            synthesize_sustain_ticks: true,
            hopo_threshold: None,
        }
    }
}

/// A chart file format reader.
pub trait ChartParser {
    /// The note kind of the charts this parser produces.
    type Kind: NoteKind;

    /// The format this parser reads.
    const FORMAT: Format;

    /// Whether `path`, a chart folder or file, contains charts of this format.
    ///
    /// Never fails: unreadable or malformed input gives `false`.
    fn can_parse(&self, path: &Path) -> bool;

    /// Lists the charts under `path` without parsing their notes.
    ///
    /// # Errors
    ///
    /// [`ChartError::NoChartsFound`] if no usable chart is found, or a read or syntax error.
    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>>;

    /// Fully parses the charts described by `metadata`, one per player, track or instrument.
    ///
    /// # Errors
    ///
    /// A read, syntax or structure error. No partial chart is ever returned.
    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<Self::Kind>>>;
}

/// The contents of a chart file.
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub text: String,
    /// md5 hex digest of the raw bytes.
    pub hash: String,
}

/// Reads a chart file as text, hashing its raw bytes.
pub(crate) fn read_source(path: &Path) -> Result<Source> {
    let bytes = fs::read(path).map_err(|source| ChartError::io(path, source))?;
    let mut context = md5::Context::new();
    context.consume(&bytes);
    let hash = format!("{:x}", context.finalize());
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text).to_owned();
    Ok(Source { text, hash })
}

/// Files directly under `path` accepted by `filter`, sorted by name. A file `path` is returned
/// alone if accepted.
pub(crate) fn list_files(path: &Path, filter: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(if filter(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }
    let entries = fs::read_dir(path).map_err(|source| ChartError::io(path, source))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ChartError::io(path, source))?;
        let file = entry.path();
        if file.is_file() && filter(&file) {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// The folder a chart path belongs to.
pub(crate) fn folder_of(path: &Path) -> &Path {
    if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    }
}

/// Deserializes JSON, reporting the path of the offending value on failure.
pub(crate) fn from_json<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T> {
    let deserializer = &mut serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|source| ChartError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Fails with [`ChartError::NoChartsFound`] if `charts` is empty.
pub(crate) fn non_empty<T>(charts: Vec<T>, path: &Path, format: Format) -> Result<Vec<T>> {
    if charts.is_empty() {
        return Err(ChartError::NoChartsFound {
            path: path.to_path_buf(),
            format,
        });
    }
    Ok(charts)
}

const TICK_EPSILON: f64 = 1e-9;

/// Appends a tick of `kind` every sixteenth note along each held note, starting one sixteenth
/// after the head and stopping before its end. The sixteenth length uses the tempo at the head.
///
/// Ticks point at their head by index, so call this before sorting.
pub(crate) fn push_sustain_ticks<K: NoteKind>(notes: &mut Vec<Note<K>>, tempo: &TempoMap, kind: K) {
    for head in 0..notes.len() {
        let Note {
            time, length, lane, ..
        } = notes[head];
        if length <= 0.0 {
            continue;
        }
        let step = tempo.sixteenth_at(time);
        let end = time + length;
        let mut count = 1;
        loop {
            let tick = time + step * f64::from(count);
            if tick >= end - TICK_EPSILON {
                break;
            }
            notes.push(Note::new(tick, lane, kind).with_parent(head));
            count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::{fin_f64::FinF64, sort_with_parents},
        mode::fnf::FnfNote,
    };

    #[test]
    fn ticks_every_sixteenth() {
        let tempo = TempoMap::constant(FinF64::DEFAULT_BPM);
        let mut notes = vec![
            Note::new(1.0, 2, FnfNote::Normal).with_length(0.5),
            Note::new(0.5, 0, FnfNote::Normal),
        ];
        push_sustain_ticks(&mut notes, &tempo, FnfNote::Sustain);
        sort_with_parents(&mut notes);

        let ticks: Vec<_> = notes
            .iter()
            .filter(|note| note.kind == FnfNote::Sustain)
            .collect();
        assert_eq!(ticks.len(), 3);
        for (tick, expected) in ticks.iter().zip([1.125, 1.25, 1.375]) {
            assert!((tick.time - expected).abs() < 1e-9);
            assert_eq!(tick.lane, 2);
            assert_eq!(tick.parent, Some(1));
        }
        assert_eq!(notes[1].time, 1.0);
    }

    #[test]
    fn json_errors_name_the_field() {
        #[derive(Debug, Deserialize)]
        struct Song {
            #[allow(dead_code)]
            bpm: f64,
        }
        let err = from_json::<Song>(Path::new("song.json"), r#"{"bpm": "fast"}"#).unwrap_err();
        let ChartError::Json { source, .. } = &err else {
            panic!("expected a json error, got {err:?}");
        };
        assert_eq!(source.path().to_string(), "bpm");
    }
}
