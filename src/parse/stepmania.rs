//! StepMania `.sm` and `.ssc` simfiles.
//!
//! Both are lists of `#TAG:value;` pairs. An `.sm` file carries every chart in one `#NOTES` tag
//! with six colon separated fields. An `.ssc` file starts each chart with `#NOTEDATA:;` and
//! follows it with per-chart tags, which may override the song's timing.

use std::path::Path;

use super::{ChartParser, list_files, non_empty, read_source};
use crate::{
    chart::{
        Chart, ChartMetadata, Format,
        event::{Event, EventKind},
        fin_f64::FinF64,
        note::Note,
        tempo::{Stop, StopKind, TempoMap},
    },
    error::{ChartError, Result},
    mode::mania::ManiaNote,
    util::{file_stem, has_suffix},
};

/// A `#TAG:value` pair, the tag name uppercased.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tag<'a> {
    name: String,
    value: &'a str,
}

/// Removes `//` comments.
fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| line.split_once("//").map_or(line, |(code, _)| code))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits a simfile into its tags. A value ends at `;`, or at a line starting with `#` if the
/// `;` is missing.
fn tags(text: &str) -> Vec<Tag<'_>> {
    let mut tags = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('#') {
        rest = &rest[start + 1..];
        let Some((name, after)) = rest.split_once(':') else {
            break;
        };
        let end = after
            .find(';')
            .into_iter()
            .chain(after.find("\n#").map(|pos| pos + 1))
            .min()
            .unwrap_or(after.len());
        tags.push(Tag {
            name: name.trim().to_ascii_uppercase(),
            value: after[..end].trim(),
        });
        rest = &after[end..];
    }
    tags
}

/// Parses `beat=value,beat=value` lists.
fn parse_pairs(value: &str) -> std::result::Result<Vec<(f64, f64)>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (beat, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected beat=value, got {pair:?}"))?;
            let number = |text: &str| {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number {text:?} in {pair:?}"))
            };
            Ok((number(beat)?, number(value)?))
        })
        .collect()
}

fn parse_number(value: &str) -> std::result::Result<f64, String> {
    if value.trim().is_empty() {
        return Ok(0.0);
    }
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number {value:?}"))
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Timing {
    offset: Option<f64>,
    bpms: Option<Vec<(f64, f64)>>,
    stops: Option<Vec<(f64, f64)>>,
    delays: Option<Vec<(f64, f64)>>,
}

impl Timing {
    /// Applies a timing tag, returning `false` if `tag` is not one.
    fn apply(&mut self, tag: &Tag<'_>) -> std::result::Result<bool, String> {
        match tag.name.as_str() {
            "OFFSET" => self.offset = Some(parse_number(tag.value)?),
            "BPMS" => self.bpms = Some(parse_pairs(tag.value)?),
            "STOPS" | "FREEZES" => self.stops = Some(parse_pairs(tag.value)?),
            "DELAYS" => self.delays = Some(parse_pairs(tag.value)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Chart timing layered over song timing.
    fn or(&self, song: &Self) -> Self {
        Self {
            offset: self.offset.or(song.offset),
            bpms: self.bpms.clone().or_else(|| song.bpms.clone()),
            stops: self.stops.clone().or_else(|| song.stops.clone()),
            delays: self.delays.clone().or_else(|| song.delays.clone()),
        }
    }

    fn tempo(&self) -> Option<TempoMap> {
        let points = self
            .bpms
            .iter()
            .flatten()
            .filter_map(|&(beat, bpm)| FinF64::positive(bpm).map(|bpm| (beat, bpm)));
        let pauses = |pairs: &Option<Vec<(f64, f64)>>, kind: StopKind| {
            pairs
                .iter()
                .flatten()
                .map(move |&(beat, duration)| Stop {
                    beat,
                    duration,
                    kind,
                })
                .collect::<Vec<_>>()
        };
        Some(
            TempoMap::from_beats(points)?
                .with_stops(pauses(&self.stops, StopKind::Stop))
                .with_stops(pauses(&self.delays, StopKind::Delay)),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct StepChart<'a> {
    steps_type: String,
    description: String,
    difficulty: String,
    credit: Option<String>,
    timing: Timing,
    notes: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Simfile<'a> {
    title: String,
    artist: String,
    credit: Option<String>,
    timing: Timing,
    charts: Vec<StepChart<'a>>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn parse_simfile(text: &str) -> std::result::Result<Simfile<'_>, String> {
    let mut simfile = Simfile::default();
    let mut current: Option<StepChart<'_>> = None;
    for tag in tags(text) {
        if tag.name == "NOTEDATA" {
            simfile.charts.extend(current.replace(StepChart::default()));
            continue;
        }
        if let Some(chart) = current.as_mut() {
            if chart.timing.apply(&tag)? {
                continue;
            }
            match tag.name.as_str() {
                "STEPSTYPE" => chart.steps_type = tag.value.to_owned(),
                "DESCRIPTION" => chart.description = tag.value.to_owned(),
                "DIFFICULTY" => chart.difficulty = tag.value.to_owned(),
                "CREDIT" => chart.credit = non_blank(tag.value),
                "NOTES" | "NOTES2" => chart.notes = tag.value,
                _ => {}
            }
            continue;
        }
        if simfile.timing.apply(&tag)? {
            continue;
        }
        match tag.name.as_str() {
            "TITLE" => simfile.title = tag.value.to_owned(),
            "ARTIST" => simfile.artist = tag.value.to_owned(),
            "CREDIT" => simfile.credit = non_blank(tag.value),
            "NOTES" => {
                let fields: Vec<_> = tag.value.splitn(6, ':').collect();
                let [steps_type, description, difficulty, _meter, _radar, notes] = fields[..]
                else {
                    return Err(format!(
                        "#NOTES needs 6 fields, found {}",
                        fields.len()
                    ));
                };
                simfile.charts.push(StepChart {
                    steps_type: steps_type.trim().to_owned(),
                    description: description.trim().to_owned(),
                    difficulty: difficulty.trim().to_owned(),
                    credit: None,
                    timing: Timing::default(),
                    notes: notes.trim(),
                });
            }
            _ => {}
        }
    }
    simfile.charts.extend(current);
    Ok(simfile)
}

/// Lane count of a steps type, `None` if unknown.
fn lanes_of(steps_type: &str) -> Option<usize> {
    Some(match steps_type.to_ascii_lowercase().as_str() {
        "dance-single" => 4,
        "dance-solo" | "pump-halfdouble" => 6,
        "dance-double" | "dance-couple" | "dance-routine" => 8,
        "pump-single" => 5,
        "pump-double" => 10,
        "kb7-single" => 7,
        "dance-threepanel" => 3,
        _ => return None,
    })
}

/// One row entry of the note data.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Step {
    beat: f64,
    column: usize,
    symbol: char,
}

/// Reads note data into steps, skipping `[...]` and `{...}` modifiers.
fn steps(notes: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    for (measure, rows) in notes.split(',').enumerate() {
        let rows: Vec<_> = rows
            .lines()
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect();
        for (row, line) in rows.iter().enumerate() {
            let beat = 4.0 * (measure as f64 + row as f64 / rows.len() as f64);
            let mut column = 0;
            let mut depth = 0usize;
            for symbol in line.chars() {
                match symbol {
                    '[' | '{' => depth += 1,
                    ']' | '}' => depth = depth.saturating_sub(1),
                    _ if depth > 0 => {}
                    _ => {
                        steps.push(Step {
                            beat,
                            column,
                            symbol,
                        });
                        column += 1;
                    }
                }
            }
        }
    }
    steps
}

/// Reader of StepMania simfiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepManiaParser;

/// `.ssc` files, plus `.sm` files without an `.ssc` of the same name.
fn simfiles(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    let files = list_files(path, |file| has_suffix(file, ".sm") || has_suffix(file, ".ssc"))?;
    Ok(files
        .iter()
        .filter(|file| {
            has_suffix(file, ".ssc")
                || !files.iter().any(|other| {
                    has_suffix(other, ".ssc") && file_stem(other) == file_stem(file)
                })
        })
        .cloned()
        .collect())
}

impl ChartParser for StepManiaParser {
    type Kind = ManiaNote;
    const FORMAT: Format = Format::StepMania;

    fn can_parse(&self, path: &Path) -> bool {
        simfiles(path).is_ok_and(|files| !files.is_empty())
    }

    fn parse_metadata(&self, path: &Path) -> Result<Vec<ChartMetadata>> {
        let mut charts = Vec::new();
        for file in simfiles(path)? {
            let source = read_source(&file)?;
            let text = strip_comments(&source.text);
            let simfile = parse_simfile(&text).map_err(|reason| ChartError::malformed(&file, reason))?;
            for (index, chart) in simfile.charts.iter().enumerate() {
                let difficulty = if chart.difficulty.is_empty() {
                    chart.description.clone()
                } else {
                    chart.difficulty.clone()
                };
                charts.push(ChartMetadata {
                    path: file.clone(),
                    format: Self::FORMAT,
                    title: simfile.title.clone(),
                    artist: simfile.artist.clone(),
                    charter: chart
                        .credit
                        .clone()
                        .or_else(|| non_blank(&chart.description))
                        .or_else(|| simfile.credit.clone()),
                    difficulty,
                    instrument: Some(chart.steps_type.clone()),
                    index,
                    hash: source.hash.clone(),
                });
            }
        }
        non_empty(charts, path, Self::FORMAT)
    }

    fn parse_chart(&self, metadata: &ChartMetadata) -> Result<Vec<Chart<ManiaNote>>> {
        let path = metadata.path.as_path();
        let source = read_source(path)?;
        let text = strip_comments(&source.text);
        let simfile = parse_simfile(&text).map_err(|reason| ChartError::malformed(path, reason))?;
        let chart = simfile.charts.get(metadata.index).ok_or_else(|| {
            ChartError::malformed(path, format!("no chart at index {}", metadata.index))
        })?;
        let timing = chart.timing.or(&simfile.timing);
        let tempo = timing
            .tempo()
            .ok_or_else(|| ChartError::malformed(path, "no usable #BPMS"))?;
        let offset = timing.offset.unwrap_or_default();
        let time_of = |beat: f64| tempo.beat_to_seconds(beat) - offset;

        let steps = steps(chart.notes);
        let lanes = lanes_of(&chart.steps_type).unwrap_or_else(|| {
            steps
                .iter()
                .map(|step| step.column + 1)
                .max()
                .unwrap_or_default()
        });

        let mut notes: Vec<Note<ManiaNote>> = Vec::new();
        let mut open_holds: Vec<Option<usize>> = vec![None; lanes];
        let mut unknown = Vec::new();
        for step in steps {
            let kind = match step.symbol {
                '1' | '2' => ManiaNote::Normal,
                '4' => ManiaNote::Roll,
                'M' | 'm' => ManiaNote::Mine,
                'L' | 'l' => ManiaNote::Lift,
                'F' | 'f' => ManiaNote::Fake,
                '3' => {
                    if let Some(head) = open_holds.get_mut(step.column).and_then(Option::take) {
                        let length = time_of(step.beat) - notes[head].time;
                        notes[head] = notes[head].clone().with_length(length);
                    }
                    continue;
                }
                _ => continue,
            };
            if step.column >= lanes {
                unknown.push(step.column as i64);
                continue;
            }
            if matches!(step.symbol, '2' | '4') {
                open_holds[step.column] = Some(notes.len());
            }
            notes.push(Note::new(time_of(step.beat), step.column, kind));
        }
        if !unknown.is_empty() {
            return Err(ChartError::unknown_lanes(path, unknown));
        }

        let mut events: Vec<_> = tempo
            .bpm_changes()
            .map(|change| {
                Event::new(
                    change.time - offset,
                    EventKind::BpmChange {
                        bpm: change.bpm.as_f64(),
                    },
                )
            })
            .collect();
        events.extend(tempo.stops().iter().map(|stop| {
            let start = match stop.kind {
                StopKind::Stop => time_of(stop.beat),
                StopKind::Delay => time_of(stop.beat) - stop.duration,
            };
            Event::new(
                start,
                EventKind::Stop {
                    duration: stop.duration,
                },
            )
        }));

        let chart = Chart::builder(lanes)
            .metadata(metadata.clone())
            .instrument(chart.steps_type.clone())
            .tempo(tempo)
            .notes(notes)
            .events(events)
            .build();
        log::debug!(
            "parsed {} [{}]: {} notes over {} lanes",
            path.display(),
            metadata.difficulty,
            chart.notes.len(),
            lanes
        );
        Ok(vec![chart])
    }
}
