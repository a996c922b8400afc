//! FNF v1 charts: one `.json` per difficulty, notes grouped in sections.
//!
//! Note times are absolute milliseconds. Sections only carry the tempo and which player the
//! section belongs to, so the tempo map is rebuilt by summing section lengths in beats.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{
    ChartParser, ParseConfig, folder_of, from_json, lanes::LaneMap, list_files, non_empty,
    push_sustain_ticks, read_source,
};
use crate::{
    chart::{
        Chart, ChartMetadata, Format,
        event::{Event, EventKind},
        fin_f64::FinF64,
        note::Note,
        tempo::TempoMap,
    },
    error::{ChartError, Result},
    mode::fnf::FnfNote,
    util::{StrExtension, file_stem, has_suffix},
};

/// Difficulty names recognized as a `-suffix` of the file stem.
const DIFFICULTY_SUFFIXES: [&str; 5] = ["easy", "normal", "hard", "erect", "nightmare"];

/// Instruments of the two charts every file yields.
pub(crate) const PLAYERS: [&str; 2] = ["player1", "player2"];

#[derive(Debug, Deserialize)]
struct Header {
    song: SongHeader,
}

#[derive(Debug, Deserialize)]
struct SongHeader {
    song: String,
    #[serde(default)]
    artist: Option<String>,
    #[allow(dead_code)]
    notes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartFile {
    song: Song,
}

#[derive(Debug, Deserialize)]
struct Song {
    bpm: f64,
    #[serde(default)]
    speed: Option<f64>,
    notes: Vec<Section>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Section {
    #[serde(default)]
    must_hit_section: bool,
    #[serde(default)]
    section_notes: Vec<Vec<Value>>,
    #[serde(default)]
    length_in_steps: Option<f64>,
    #[serde(default)]
    section_beats: Option<f64>,
    #[serde(default, rename = "changeBPM")]
    change_bpm: bool,
    #[serde(default)]
    bpm: Option<f64>,
}

impl Section {
    fn beats(&self) -> Option<f64> {
        self.section_beats
            .or_else(|| self.length_in_steps.map(|steps| steps / 4.0))
            .filter(|beats| beats.is_finite() && *beats >= 0.0)
    }
}

/// Reader of FNF v1 charts.
#[derive(Debug, Clone, Copy)]
pub struct FnfV1Parser<'c> {
    config: &'c ParseConfig,
}

impl<'c> FnfV1Parser<'c> {
    /// Creates a parser.
    #[must_use]
    pub const fn new(config: &'c ParseConfig) -> Self {
        Self { config }
    }
}

/// Whether `path` may be an FNF v1 chart, judging by its name.
fn is_candidate(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    has_suffix(path, ".json")
        && !name.eq_ignore_ascii_case(super::lanes::LANE_MAP_FILE)
        && !name.eq_ignore_ascii_case("events.json")
        && !name.ends_with_ignore_case("-metadata.json")
        && !name.ends_with_ignore_case("-chart.json")
}

/// The difficulty of a chart file, derived from its stem and folder name.
fn difficulty_of(path: &Path) -> String {
    let stem = file_stem(path);
    let folder = path
        .parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if stem.eq_ignore_ascii_case(folder) {
        return "normal".to_owned();
    }
    if let Some(rest) = stem
        .strip_prefix_ignore_case(folder)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|rest| !rest.is_empty())
    {
        return rest.to_ascii_lowercase();
    }
    stem.rsplit_once('-')
        .map(|(_, suffix)| suffix.to_ascii_lowercase())
        .filter(|suffix| DIFFICULTY_SUFFIXES.contains(&suffix.as_str()))
        .unwrap_or_else(|| stem.to_ascii_lowercase())
}

impl ChartParser for FnfV1Parser<'_> {
    type Kind = FnfNote;
    const FORMAT: Format = Format::FnfV1;

    fn can_parse(&self, path: &Path) -> bool {
        list_files(path, is_candidate)
            .unwrap_or_default()
            .iter()
            .any(|file| {
                read_source(file)
                    .and_then(|source| from_json::<Header>(file, &source.text))
                    .is_ok()
            })
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        let mut charts = Vec::new();
        for file in list_files(path, is_candidate)? {
            let source = read_source(&file)?;
            let header = match from_json::<Header>(&file, &source.text) {
                Ok(header) => header,
                Err(err) => {
                    log::debug!("skipping {}: {err}", file.display());
                    continue;
                }
            };
            charts.push(ChartMetadata {
                difficulty: difficulty_of(&file),
                path: file,
                format: Self::FORMAT,
                title: header.song.song,
                artist: header.song.artist.unwrap_or_default(),
                charter: None,
                instrument: None,
                index: 0,
                hash: source.hash,
            });
        }
        non_empty(charts, path, Self::FORMAT)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<FnfNote>>> {
        let path = metadata.path.as_path();
        let source = read_source(path)?;
        let song = from_json::<ChartFile>(path, &source.text)?.song;
        let lane_map = LaneMap::resolve(self.config, folder_of(path))?;

        let initial_bpm = FinF64::positive(song.bpm)
            .ok_or_else(|| ChartError::malformed(path, format!("invalid bpm {}", song.bpm)))?;

        let mut section_starts = Vec::with_capacity(song.notes.len());
        let mut tempo_points = vec![(0.0, initial_bpm)];
        let mut beat = 0.0;
        for (index, section) in song.notes.iter().enumerate() {
            section_starts.push(beat);
            if section.change_bpm {
                if let Some(bpm) = section.bpm.and_then(FinF64::positive) {
                    tempo_points.push((beat, bpm));
                }
            }
            beat += section.beats().ok_or_else(|| {
                ChartError::malformed(
                    path,
                    format!("section {index} has neither lengthInSteps nor sectionBeats"),
                )
            })?;
        }
        let tempo = TempoMap::from_beats(tempo_points).unwrap_or_else(|| TempoMap::constant(initial_bpm));

        let mut events: Vec<_> = (0..4u8)
            .map(|count| {
                Event::new(
                    tempo.beat_to_seconds(f64::from(count) - 4.0),
                    EventKind::Countdown {
                        remaining: 3 - count,
                    },
                )
            })
            .collect();
        let mut focused = None;
        let mut notes: [Vec<Note<FnfNote>>; 2] = [Vec::new(), Vec::new()];
        let mut unknown = Vec::new();
        for (section, &start) in song.notes.iter().zip(&section_starts) {
            let time = tempo.beat_to_seconds(start);
            let player = u32::from(!section.must_hit_section);
            if focused != Some(player) {
                events.push(Event::new(time, EventKind::CameraFocus { player }));
                focused = Some(player);
            }
            if section.change_bpm {
                if let Some(bpm) = section.bpm.filter(|bpm| *bpm > 0.0) {
                    events.push(Event::new(time, EventKind::BpmChange { bpm }));
                }
            }

            for raw in &section.section_notes {
                let (Some(ms), Some(lane)) = (
                    raw.first().and_then(Value::as_f64),
                    raw.get(1).and_then(Value::as_f64),
                ) else {
                    return Err(ChartError::malformed(
                        path,
                        format!("note {raw:?} needs a time and a lane"),
                    ));
                };
                let lane = lane as i64;
                let Some(target) = lane_map.get(lane) else {
                    unknown.push(lane);
                    continue;
                };
                let length_ms = raw.get(2).and_then(Value::as_f64).unwrap_or_default();
                let mut note = Note::new(ms / 1000.0, target.lane, target.kind)
                    .with_length(length_ms.round() / 1000.0);
                if raw.len() > 3 {
                    note = note.with_extra(Value::Array(raw[3..].to_vec()));
                }
                let owner = (target.player >= 1) == section.must_hit_section;
                notes[usize::from(owner)].push(note);
            }
        }
        if !unknown.is_empty() {
            return Err(ChartError::unknown_lanes(path, unknown));
        }

        let lanes = lane_map.lanes_per_player();
        let charts: Vec<_> = notes
            .into_iter()
            .zip(PLAYERS)
            .map(|(mut notes, instrument)| {
                if self.config.synthesize_sustain_ticks {
                    push_sustain_ticks(&mut notes, &tempo, FnfNote::Sustain);
                }
                Chart::builder(lanes)
                    .metadata(metadata.clone())
                    .instrument(instrument)
                    .tempo(tempo.clone())
                    .scroll_speed(song.speed)
                    .notes(notes)
                    .events(events.iter().cloned())
                    .build()
            })
            .collect();
        log::debug!(
            "parsed {}: {} and {} notes, {} events",
            path.display(),
            charts[0].notes.len(),
            charts[1].notes.len(),
            events.len()
        );
        Ok(charts)
    }
}
