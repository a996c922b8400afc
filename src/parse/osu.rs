//! osu! `.osu` beatmaps in mania and taiko mode, decoded with `rosu-map`.

use std::path::{Path, PathBuf};

use rosu_map::{
    Beatmap,
    section::{
        general::GameMode,
        hit_objects::{HitObject, HitObjectKind, hit_samples::HitSoundType},
    },
};

use super::{ChartParser, Source, list_files, non_empty, read_source};
use crate::{
    chart::{
        Chart, ChartMetadata, Format,
        event::{Event, EventKind},
        fin_f64::FinF64,
        note::Note,
        tempo::TempoMap,
    },
    error::{ChartError, Result},
    mode::{
        mania::ManiaNote,
        taiko::{DON_LANE, TaikoNote},
    },
    util::has_suffix,
};

/// Width of the osu! playfield in pixels.
const PLAYFIELD_WIDTH: f64 = 512.0;

fn decode(path: &Path, source: &Source) -> Result<Beatmap> {
    Beatmap::from_bytes(source.text.as_bytes())
        .map_err(|err| ChartError::malformed(path, err.to_string()))
}

/// Beatmaps of `mode` directly under `path`. Files which fail to decode are skipped.
fn beatmaps(path: &Path, mode: GameMode) -> Result<Vec<(PathBuf, Source, Beatmap)>> {
    let mut maps = Vec::new();
    for file in list_files(path, |file| has_suffix(file, ".osu"))? {
        let source = read_source(&file)?;
        match decode(&file, &source) {
            Ok(map) if map.mode == mode => maps.push((file, source, map)),
            Ok(_) => {}
            Err(err) => log::warn!("skipping {}: {err}", file.display()),
        }
    }
    Ok(maps)
}

fn metadata_of(path: &Path, format: Format, mode: GameMode) -> Result<Vec<ChartMetadata>> {
    let charts = beatmaps(path, mode)?
        .into_iter()
        .map(|(file, source, map)| ChartMetadata {
            path: file,
            format,
            charter: Some(map.creator).filter(|creator| !creator.is_empty()),
            title: map.title,
            artist: map.artist,
            difficulty: map.version,
            instrument: None,
            index: 0,
            hash: source.hash,
        })
        .collect();
    non_empty(charts, path, format)
}

fn can_parse(path: &Path, mode: GameMode) -> bool {
    beatmaps(path, mode).is_ok_and(|maps| !maps.is_empty())
}

/// Tempo map and BPM change events of the uninherited timing points, `None` without any.
fn tempo_of(map: &Beatmap) -> Option<(TempoMap, Vec<Event>)> {
    let tempo = TempoMap::from_time_points(map.control_points.timing_points.iter().filter_map(
        |point| FinF64::positive(60_000.0 / point.beat_len).map(|bpm| (point.time / 1000.0, bpm)),
    ))?;
    let events = tempo
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
    Some((tempo, events))
}

/// Reader of osu!mania beatmaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsuManiaParser;

impl ChartParser for OsuManiaParser {
    type Kind = ManiaNote;
    const FORMAT: Format = Format::OsuMania;

    fn can_parse(&self, path: &Path) -> bool {
        can_parse(path, GameMode::Mania)
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        metadata_of(path, Self::FORMAT, GameMode::Mania)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<ManiaNote>>> {
        let path = metadata.path.as_path();
        let map = decode(path, &read_source(path)?)?;
        let keys = map.circle_size.round() as usize;
        if keys == 0 {
            return Err(ChartError::malformed(path, "CircleSize gives no keys"));
        }

        let mut notes = Vec::with_capacity(map.hit_objects.len());
        let mut unknown = Vec::new();
        for object in &map.hit_objects {
            let (x, length) = match &object.kind {
                HitObjectKind::Circle(circle) => (f64::from(circle.pos.x), 0.0),
                HitObjectKind::Hold(hold) => (f64::from(hold.pos_x), hold.duration / 1000.0),
                _ => continue,
            };
            let lane = (x * keys as f64 / PLAYFIELD_WIDTH).floor() as i64;
            let Some(lane) = usize::try_from(lane).ok().filter(|lane| *lane < keys) else {
                unknown.push(lane);
                continue;
            };
            notes.push(
                Note::new(object.start_time / 1000.0, lane, ManiaNote::Normal).with_length(length),
            );
        }
        if !unknown.is_empty() {
            return Err(ChartError::unknown_lanes(path, unknown));
        }

        let (tempo, events) = tempo_of(&map).unwrap_or_default();
        let chart = Chart::builder(keys)
            .metadata(metadata.clone())
            .instrument(format!("{keys}k"))
            .tempo(tempo)
            .notes(notes)
            .events(events)
            .build();
        log::debug!(
            "parsed {}: {} notes over {keys} keys",
            path.display(),
            chart.notes.len()
        );
        Ok(vec![chart])
    }
}

/// Reader of osu!taiko beatmaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsuTaikoParser;

/// The taiko note of a hit object. Whistle or clap makes a ka, finish makes it large.
fn taiko_note(object: &mut HitObject, sound: HitSoundType) -> Option<Note<TaikoNote>> {
    let time = object.start_time / 1000.0;
    let large = sound.has_flag(HitSoundType::FINISH);
    let note = match &mut object.kind {
        HitObjectKind::Circle(_) => {
            let rim = sound.has_flag(HitSoundType::WHISTLE | HitSoundType::CLAP);
            let kind = match (rim, large) {
                (false, false) => TaikoNote::Don,
                (false, true) => TaikoNote::LargeDon,
                (true, false) => TaikoNote::Ka,
                (true, true) => TaikoNote::LargeKa,
            };
            Note::new(time, kind.lane().unwrap_or(DON_LANE), kind)
        }
        HitObjectKind::Slider(slider) => {
            let kind = if large {
                TaikoNote::LargeDrumroll
            } else {
                TaikoNote::Drumroll
            };
            Note::new(time, DON_LANE, kind).with_length(slider.duration() / 1000.0)
        }
        HitObjectKind::Spinner(spinner) => {
            Note::new(time, DON_LANE, TaikoNote::Denden).with_length(spinner.duration / 1000.0)
        }
        HitObjectKind::Hold(_) => return None,
    };
    Some(note)
}

impl ChartParser for OsuTaikoParser {
    type Kind = TaikoNote;
    const FORMAT: Format = Format::OsuTaiko;

    fn can_parse(&self, path: &Path) -> bool {
        can_parse(path, GameMode::Taiko)
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        metadata_of(path, Self::FORMAT, GameMode::Taiko)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<TaikoNote>>> {
        let path = metadata.path.as_path();
        let mut map = decode(path, &read_source(path)?)?;
        let (tempo, events) = tempo_of(&map)
            .ok_or_else(|| ChartError::malformed(path, "no uninherited timing point"))?;

        let notes: Vec<_> = map
            .hit_objects
            .iter_mut()
            .zip(map.hit_sounds.iter().copied())
            .filter_map(|(object, sound)| taiko_note(object, sound))
            .collect();

        let chart = Chart::builder(2)
            .metadata(metadata.clone())
            .instrument("taiko")
            .tempo(tempo)
            .notes(notes)
            .events(events)
            .build();
        log::debug!("parsed {}: {} notes", path.display(), chart.notes.len());
        Ok(vec![chart])
    }
}
