//! Hero `.chart` files: bracketed sections of `key = value` lines.
//!
//! Positions are ticks, `Resolution` ticks per beat. `[SyncTrack]` holds the tempo, `[Events]`
//! the song events, and every other section one difficulty of one instrument.

use std::{collections::BTreeMap, path::Path};

use super::{ChartParser, ParseConfig, list_files, non_empty, read_source};
use crate::{
    chart::{
        Chart, ChartMetadata, Format,
        event::{Event, EventKind},
        fin_f64::FinF64,
        note::Note,
        tempo::TempoMap,
    },
    error::{ChartError, Result},
    mode::hero::{HeroNote, OPEN_LANE},
    util::has_suffix,
};

const DEFAULT_RESOLUTION: f64 = 192.0;

/// Natural HOPO threshold in beats.
const DEFAULT_HOPO_THRESHOLD: f64 = 65.0 / 192.0;

const DIFFICULTIES: [&str; 4] = ["Easy", "Medium", "Hard", "Expert"];

const INSTRUMENTS: [(&str, &str); 5] = [
    ("Single", "guitar"),
    ("DoubleGuitar", "guitar_coop"),
    ("DoubleBass", "bass"),
    ("DoubleRhythm", "rhythm"),
    ("Keyboard", "keys"),
];

mod fret {
    pub const FORCED: u64 = 5;
    pub const TAP: u64 = 6;
    pub const OPEN: u64 = 7;
}

const STAR_POWER: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section<'a> {
    name: &'a str,
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> Section<'a> {
    fn value(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|&(_, value)| unquote(value))
    }

    /// Entries keyed by tick, in file order.
    fn ticked(&self) -> impl Iterator<Item = std::result::Result<(u64, &'a str), String>> + '_ {
        self.entries.iter().map(|&(tick, value)| {
            tick.parse()
                .map(|tick| (tick, value))
                .map_err(|_| format!("invalid tick {tick:?} in [{}]", self.name))
        })
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
}

fn sections(text: &str) -> std::result::Result<Vec<Section<'_>>, String> {
    let mut sections: Vec<Section<'_>> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line == "{" || line == "}" {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|line| line.strip_suffix(']')) {
            sections.push(Section {
                name,
                entries: Vec::new(),
            });
            continue;
        }
        let section = sections
            .last_mut()
            .ok_or_else(|| format!("{line:?} outside of a section"))?;
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("expected key = value, got {line:?}"))?;
        section.entries.push((key.trim(), value.trim()));
    }
    Ok(sections)
}

/// The difficulty and instrument of a track section name.
fn track_of(name: &str) -> Option<(&'static str, &'static str)> {
    DIFFICULTIES.into_iter().find_map(|difficulty| {
        let rest = name.strip_prefix(difficulty)?;
        INSTRUMENTS
            .into_iter()
            .find(|(suffix, _)| *suffix == rest)
            .map(|(_, instrument)| (difficulty, instrument))
    })
}

fn numbers<const N: usize>(fields: &str) -> Option<[u64; N]> {
    let mut numbers = [0; N];
    let mut fields = fields.split_whitespace();
    for number in &mut numbers {
        *number = fields.next()?.parse().ok()?;
    }
    Some(numbers)
}

/// Song level timing: tick to second conversion.
#[derive(Debug, Clone)]
struct Timing {
    resolution: f64,
    offset: f64,
    tempo: TempoMap,
}

impl Timing {
    fn beat(&self, tick: u64) -> f64 {
        tick as f64 / self.resolution
    }

    fn time(&self, tick: u64) -> f64 {
        self.tempo.beat_to_seconds(self.beat(tick)) + self.offset
    }

    fn span(&self, tick: u64, length: u64) -> std::result::Result<f64, String> {
        let end = tick
            .checked_add(length)
            .ok_or_else(|| format!("length {length} at tick {tick} is out of range"))?;
        Ok(self.time(end) - self.time(tick))
    }
}

fn song_section<'s, 'a>(sections: &'s [Section<'a>]) -> Option<&'s Section<'a>> {
    sections.iter().find(|section| section.name == "Song")
}

fn timing_and_events(
    sections: &[Section<'_>],
) -> std::result::Result<(Timing, Vec<Event>), String> {
    let song = song_section(sections);
    let number = |key: &str| {
        song.and_then(|song| song.value(key))
            .and_then(|value| value.parse::<f64>().ok())
    };
    let resolution = number("Resolution")
        .filter(|resolution| *resolution > 0.0)
        .unwrap_or(DEFAULT_RESOLUTION);
    let offset = number("Offset").unwrap_or_default();

    let mut points = Vec::new();
    let mut signatures = Vec::new();
    if let Some(sync) = sections.iter().find(|section| section.name == "SyncTrack") {
        for entry in sync.ticked() {
            let (tick, value) = entry?;
            let (kind, fields) = value.split_once(' ').unwrap_or((value, ""));
            match kind {
                "B" => {
                    let [milli_bpm] =
                        numbers(fields).ok_or_else(|| format!("invalid tempo {value:?}"))?;
                    if let Some(bpm) = FinF64::positive(milli_bpm as f64 / 1000.0) {
                        points.push((tick as f64 / resolution, bpm));
                    }
                }
                "TS" => {
                    let mut parts = fields.split_whitespace().map(str::parse::<u32>);
                    let Some(Ok(numerator)) = parts.next() else {
                        return Err(format!("invalid time signature {value:?}"));
                    };
                    let exponent = parts.next().and_then(|part| part.ok()).unwrap_or(2);
                    signatures.push((tick, numerator, 1u32 << exponent.min(8)));
                }
                _ => {}
            }
        }
    }
    let timing = Timing {
        resolution,
        offset,
        tempo: TempoMap::from_beats(points).unwrap_or_default(),
    };

    let mut events: Vec<_> = timing
        .tempo
        .bpm_changes()
        .map(|change| {
            Event::new(
                change.time + offset,
                EventKind::BpmChange {
                    bpm: change.bpm.as_f64(),
                },
            )
        })
        .collect();
    events.extend(signatures.into_iter().map(|(tick, numerator, denominator)| {
        Event::new(
            timing.time(tick),
            EventKind::TimeSignature {
                numerator,
                denominator,
            },
        )
    }));
    if let Some(section) = sections.iter().find(|section| section.name == "Events") {
        for entry in section.ticked() {
            let (tick, value) = entry?;
            let Some(text) = value.strip_prefix("E ") else {
                continue;
            };
            let text = unquote(text.trim());
            let text = text
                .strip_prefix('[')
                .and_then(|text| text.strip_suffix(']'))
                .unwrap_or(text);
            let kind = if let Some(name) = text.strip_prefix("section ") {
                EventKind::Section {
                    name: name.trim().to_owned(),
                }
            } else if let Some(lyric) = text.strip_prefix("lyric ") {
                EventKind::Lyric {
                    text: lyric.trim().to_owned(),
                }
            } else {
                EventKind::Custom {
                    name: text.to_owned(),
                    value: serde_json::Value::Null,
                }
            };
            events.push(Event::new(timing.time(tick), kind));
        }
    }
    Ok((timing, events))
}

/// The notes of one tick.
#[derive(Debug, Default)]
struct Row {
    frets: Vec<(usize, u64)>,
    forced: bool,
    tap: bool,
}

/// Notes and track events of a difficulty track.
fn track_notes(
    section: &Section<'_>,
    timing: &Timing,
    hopo_threshold: f64,
) -> std::result::Result<(Vec<Note<HeroNote>>, Vec<Event>, Vec<i64>), String> {
    let mut rows: BTreeMap<u64, Row> = BTreeMap::new();
    let mut events = Vec::new();
    let mut unknown = Vec::new();
    for entry in section.ticked() {
        let (tick, value) = entry?;
        let (kind, fields) = value.split_once(' ').unwrap_or((value, ""));
        match kind {
            "N" => {
                let [fret, length] = numbers(fields)
                    .ok_or_else(|| format!("invalid note {value:?} in [{}]", section.name))?;
                let row = rows.entry(tick).or_default();
                match fret {
                    lane @ 0..=4 => row.frets.push((lane as usize, length)),
                    fret::FORCED => row.forced = true,
                    fret::TAP => row.tap = true,
                    fret::OPEN => row.frets.push((OPEN_LANE, length)),
                    _ => unknown.push(i64::try_from(fret).unwrap_or(i64::MAX)),
                }
            }
            "S" => {
                let [phrase, length] = numbers(fields)
                    .ok_or_else(|| format!("invalid phrase {value:?} in [{}]", section.name))?;
                if phrase == STAR_POWER {
                    events.push(Event::new(
                        timing.time(tick),
                        EventKind::StarPower {
                            length: timing.span(tick, length)?,
                        },
                    ));
                }
            }
            "E" => match fields.trim() {
                "solo" => events.push(Event::new(timing.time(tick), EventKind::Solo { start: true })),
                "soloend" => {
                    events.push(Event::new(timing.time(tick), EventKind::Solo { start: false }));
                }
                _ => {}
            },
            _ => {}
        }
    }

    let threshold = hopo_threshold * timing.resolution;
    let mut notes = Vec::new();
    let mut previous: Option<(u64, Vec<usize>)> = None;
    for (tick, row) in rows {
        if row.frets.is_empty() {
            continue;
        }
        let mut lanes: Vec<_> = row.frets.iter().map(|&(lane, _)| lane).collect();
        lanes.sort_unstable();
        lanes.dedup();
        let natural = lanes.len() == 1
            && previous.as_ref().is_some_and(|(last, last_lanes)| {
                (tick - last) as f64 <= threshold && *last_lanes != lanes
            });
        let kind = if row.tap {
            HeroNote::Tap
        } else if natural != row.forced {
            HeroNote::Hopo
        } else {
            HeroNote::Strum
        };
        for (lane, length) in row.frets {
            let length = timing.span(tick, length)?;
            notes.push(Note::new(timing.time(tick), lane, kind).with_length(length));
        }
        previous = Some((tick, lanes));
    }
    Ok((notes, events, unknown))
}

/// Reader of Hero `.chart` files.
#[derive(Debug, Clone, Copy)]
pub struct HeroParser<'c> {
    config: &'c ParseConfig,
}

impl<'c> HeroParser<'c> {
    /// Creates a parser.
    #[must_use]
    pub const fn new(config: &'c ParseConfig) -> Self {
        Self { config }
    }
}

fn chart_files(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    list_files(path, |file| has_suffix(file, ".chart"))
}

impl ChartParser for HeroParser<'_> {
    type Kind = HeroNote;
    const FORMAT: Format = Format::Hero;

    fn can_parse(&self, path: &Path) -> bool {
        chart_files(path).unwrap_or_default().iter().any(|file| {
            read_source(file).is_ok_and(|source| {
                sections(&source.text).is_ok_and(|sections| song_section(&sections).is_some())
            })
        })
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        let mut charts = Vec::new();
        for file in chart_files(path)? {
            let source = read_source(&file)?;
            let sections =
                sections(&source.text).map_err(|reason| ChartError::malformed(&file, reason))?;
            let song = song_section(&sections);
            let text = |key: &str| {
                song.and_then(|song| song.value(key))
                    .unwrap_or_default()
                    .to_owned()
            };
            let tracks = sections.iter().filter(|section| {
                section
                    .entries
                    .iter()
                    .any(|(_, value)| value.starts_with("N "))
            });
            for (index, (difficulty, instrument)) in
                tracks.filter_map(|section| track_of(section.name)).enumerate()
            {
                charts.push(ChartMetadata {
                    path: file.clone(),
                    format: Self::FORMAT,
                    title: text("Name"),
                    artist: text("Artist"),
                    charter: Some(text("Charter")).filter(|charter| !charter.is_empty()),
                    difficulty: difficulty.to_ascii_lowercase(),
                    instrument: Some(instrument.to_owned()),
                    index,
                    hash: source.hash.clone(),
                });
            }
        }
        non_empty(charts, path, Self::FORMAT)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<HeroNote>>> {
        let path = metadata.path.as_path();
        let source = read_source(path)?;
        let sections =
            sections(&source.text).map_err(|reason| ChartError::malformed(path, reason))?;
        let track = sections
            .iter()
            .find(|section| {
                track_of(section.name).is_some_and(|(difficulty, instrument)| {
                    difficulty.eq_ignore_ascii_case(&metadata.difficulty)
                        && metadata.instrument.as_deref().is_none_or(|wanted| wanted == instrument)
                })
            })
            .ok_or_else(|| {
                ChartError::malformed(path, format!("no track for {}", metadata.difficulty))
            })?;
        let instrument = track_of(track.name).map_or("guitar", |(_, instrument)| instrument);

        let (timing, mut events) =
            timing_and_events(&sections).map_err(|reason| ChartError::malformed(path, reason))?;
        let threshold = self.config.hopo_threshold.unwrap_or(DEFAULT_HOPO_THRESHOLD);
        let (notes, track_events, unknown) = track_notes(track, &timing, threshold)
            .map_err(|reason| ChartError::malformed(path, reason))?;
        if !unknown.is_empty() {
            return Err(ChartError::unknown_lanes(path, unknown));
        }
        events.extend(track_events);

        let chart = Chart::builder(OPEN_LANE + 1)
            .metadata(metadata.clone())
            .instrument(instrument)
            .tempo(timing.tempo)
            .notes(notes)
            .events(events)
            .build();
        log::debug!(
            "parsed {} [{} {instrument}]: {} notes, {} events",
            path.display(),
            metadata.difficulty,
            chart.notes.len(),
            chart.events.len()
        );
        Ok(vec![chart])
    }
}
