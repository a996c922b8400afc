//! FNF v2 charts: a `<song>-metadata.json` with the tempo and the difficulty list, and a
//! `<song>-chart.json` with the notes of every difficulty.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, de::IgnoredAny};
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
    parse::fnf_v1::PLAYERS,
    util::StrExtension,
};

const METADATA_SUFFIX: &str = "-metadata.json";
const CHART_SUFFIX: &str = "-chart.json";

#[derive(Debug, Deserialize)]
struct VersionHeader {
    version: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
enum TimeFormat {
    #[default]
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "seconds", alias = "float")]
    Seconds,
}

impl TimeFormat {
    fn to_seconds(self, time: f64) -> f64 {
        match self {
            Self::Milliseconds => time / 1000.0,
            Self::Seconds => time,
        }
    }

    /// Hold lengths are whole milliseconds in the `ms` format.
    fn length_to_seconds(self, length: f64) -> f64 {
        match self {
            Self::Milliseconds => length.round() / 1000.0,
            Self::Seconds => length,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile {
    song_name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    charter: Option<String>,
    #[serde(default)]
    time_format: TimeFormat,
    #[serde(default)]
    time_changes: Vec<TimeChange>,
    #[serde(default)]
    play_data: PlayData,
}

#[derive(Debug, Deserialize)]
struct TimeChange {
    t: f64,
    bpm: f64,
}

#[derive(Debug, Default, Deserialize)]
struct PlayData {
    #[serde(default)]
    difficulties: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DifficultyList {
    notes: BTreeMap<String, IgnoredAny>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartFile {
    #[serde(default)]
    scroll_speed: BTreeMap<String, f64>,
    #[serde(default)]
    events: Vec<RawEvent>,
    notes: BTreeMap<String, Vec<RawNote>>,
}

#[derive(Debug, Deserialize)]
struct RawNote {
    t: f64,
    d: i64,
    #[serde(default)]
    l: f64,
    #[serde(default)]
    k: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    t: f64,
    e: String,
    #[serde(default)]
    v: Value,
}

/// Reader of FNF v2 charts.
#[derive(Debug, Clone, Copy)]
pub struct FnfV2Parser<'c> {
    config: &'c ParseConfig,
}

impl<'c> FnfV2Parser<'c> {
    /// Creates a parser.
    #[must_use]
    pub const fn new(config: &'c ParseConfig) -> Self {
        Self { config }
    }
}

fn is_metadata(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with_ignore_case(METADATA_SUFFIX))
}

/// The `-chart.json` next to a `-metadata.json`.
fn companion_of(metadata: &Path) -> PathBuf {
    swap_suffix(metadata, METADATA_SUFFIX, CHART_SUFFIX)
}

/// The `-metadata.json` next to a `-chart.json`.
fn metadata_of(chart: &Path) -> PathBuf {
    swap_suffix(chart, CHART_SUFFIX, METADATA_SUFFIX)
}

fn swap_suffix(path: &Path, from: &str, to: &str) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let stem = name.strip_suffix_ignore_case(from).unwrap_or(name);
    path.with_file_name(format!("{stem}{to}"))
}

fn read_metadata(path: &Path) -> Result<MetadataFile> {
    let source = read_source(path)?;
    let header: VersionHeader = from_json(path, &source.text)?;
    if !header.version.starts_with("2.") {
        return Err(ChartError::malformed(
            path,
            format!("unsupported version {}", header.version),
        ));
    }
    from_json(path, &source.text)
}

fn event_kind(name: &str, value: Value) -> EventKind {
    let number = |key: &str| value.get(key).and_then(Value::as_f64);
    match name {
        "FocusCamera" => {
            let player = value
                .as_u64()
                .or_else(|| value.get("char").and_then(Value::as_u64));
            if let Some(player) = player.and_then(|player| u32::try_from(player).ok()) {
                return EventKind::CameraFocus { player };
            }
        }
        "ZoomCamera" => {
            if let Some(zoom) = number("zoom") {
                return EventKind::CameraZoom {
                    zoom,
                    duration: number("duration"),
                };
            }
        }
        "PlayAnimation" => {
            let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
            if let (Some(target), Some(animation)) = (text("target"), text("anim")) {
                return EventKind::PlayAnimation { target, animation };
            }
        }
        _ => {}
    }
    EventKind::Custom {
        name: name.to_owned(),
        value,
    }
}

impl ChartParser for FnfV2Parser<'_> {
    type Kind = FnfNote;
    const FORMAT: Format = Format::FnfV2;

    fn can_parse(&self, path: &Path) -> bool {
        list_files(path, is_metadata)
            .unwrap_or_default()
            .iter()
            .any(|file| read_metadata(file).is_ok() && companion_of(file).is_file())
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        let mut charts = Vec::new();
        for file in list_files(path, is_metadata)? {
            let metadata = read_metadata(&file)?;
            let chart_path = companion_of(&file);
            if !chart_path.is_file() {
                return Err(ChartError::malformed(
                    &file,
                    format!("missing {}", chart_path.display()),
                ));
            }
            let source = read_source(&chart_path)?;
            let notes: DifficultyList = from_json(&chart_path, &source.text)?;
            let difficulties: Vec<String> = if metadata.play_data.difficulties.is_empty() {
                notes.notes.keys().cloned().collect()
            } else {
                metadata
                    .play_data
                    .difficulties
                    .iter()
                    .filter(|difficulty| notes.notes.contains_key(*difficulty))
                    .cloned()
                    .collect()
            };
            for (index, difficulty) in difficulties.into_iter().enumerate() {
                charts.push(ChartMetadata {
                    path: chart_path.clone(),
                    format: Self::FORMAT,
                    title: metadata.song_name.clone(),
                    artist: metadata.artist.clone(),
                    charter: metadata.charter.clone(),
                    difficulty,
                    instrument: None,
                    index,
                    hash: source.hash.clone(),
                });
            }
        }
        non_empty(charts, path, Self::FORMAT)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<FnfNote>>> {
        let path = metadata.path.as_path();
        let song = read_metadata(&metadata_of(path))?;
        let source = read_source(path)?;
        let mut chart: ChartFile = from_json(path, &source.text)?;
        let lane_map = LaneMap::resolve(self.config, folder_of(path))?;
        let time_format = song.time_format;

        let tempo = TempoMap::from_time_points(song.time_changes.iter().filter_map(|change| {
            FinF64::positive(change.bpm).map(|bpm| (time_format.to_seconds(change.t), bpm))
        }))
        .ok_or_else(|| ChartError::malformed(path, "no usable timeChanges"))?;

        let raw_notes = chart.notes.remove(&metadata.difficulty).ok_or_else(|| {
            ChartError::malformed(path, format!("no notes for {}", metadata.difficulty))
        })?;
        let mut notes: [Vec<Note<FnfNote>>; 2] = [Vec::new(), Vec::new()];
        let mut unknown = Vec::new();
        for raw in raw_notes {
            let Some(target) = lane_map.get(raw.d) else {
                unknown.push(raw.d);
                continue;
            };
            let named = raw.k.as_deref().filter(|kind| !kind.is_empty());
            let kind = named
                .and_then(|kind| kind.parse().ok())
                .unwrap_or(target.kind);
            let mut note = Note::new(time_format.to_seconds(raw.t), target.lane, kind)
                .with_length(time_format.length_to_seconds(raw.l));
            if let Some(name) = named.filter(|name| name.parse::<FnfNote>().is_err()) {
                note = note.with_extra(Value::String(name.to_owned()));
            }
            notes[usize::from(target.player >= 1)].push(note);
        }
        if !unknown.is_empty() {
            return Err(ChartError::unknown_lanes(path, unknown));
        }

        let mut events: Vec<_> = tempo
            .bpm_changes()
            .map(|change| {
                Event::new(
                    change.time,
                    EventKind::BpmChange {
                        bpm: change.bpm.as_f64(),
                    },
                )
            })
            .collect();
        events.extend(
            chart
                .events
                .into_iter()
                .map(|raw| Event::new(time_format.to_seconds(raw.t), event_kind(&raw.e, raw.v))),
        );
        let scroll_speed = chart
            .scroll_speed
            .get(&metadata.difficulty)
            .or_else(|| chart.scroll_speed.get("default"))
            .copied();

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
                    .scroll_speed(scroll_speed)
                    .notes(notes)
                    .events(events.iter().cloned())
                    .build()
            })
            .collect();
        log::debug!(
            "parsed {} [{}]: {} and {} notes, {} events",
            path.display(),
            metadata.difficulty,
            charts[0].notes.len(),
            charts[1].notes.len(),
            events.len()
        );
        Ok(charts)
    }
}
