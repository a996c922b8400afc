//! The common chart model every parser produces and every engine consumes.

pub mod event;
pub mod fin_f64;
pub mod note;
pub mod tempo;

use std::{
    collections::BTreeSet,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use self::{
    event::{Event, sort_events},
    note::{Note, NoteKind},
    tempo::TempoMap,
};
use crate::{
    error::{ChartError, Result},
    loader::{self, LoadedCharts},
    parse::ParseConfig,
};

/// A way of playing a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gamemode {
    /// FNF style four keys per player.
    FourKey,
    /// Five frets and an open lane.
    Hero,
    /// Two drum sides.
    Taiko,
    /// Dance and key-column styles with any number of lanes.
    Mania,
}

/// A chart file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// One `.json` per difficulty, with sections of notes.
    FnfV1,
    /// `-metadata.json` and `-chart.json` pairs.
    FnfV2,
    /// `.sm` and `.ssc`.
    StepMania,
    /// `.osu` with `Mode: 3`.
    OsuMania,
    /// `.osu` with `Mode: 1`.
    OsuTaiko,
    /// Clone Hero `.chart`.
    Hero,
}

impl Format {
    /// Every supported format, in probing order.
    pub const ALL: [Self; 6] = [
        Self::FnfV2,
        Self::FnfV1,
        Self::StepMania,
        Self::OsuMania,
        Self::OsuTaiko,
        Self::Hero,
    ];

    /// The gamemode charts of this format are played in.
    #[must_use]
    pub const fn gamemode(self) -> Gamemode {
        match self {
            Self::FnfV1 | Self::FnfV2 => Gamemode::FourKey,
            Self::StepMania | Self::OsuMania => Gamemode::Mania,
            Self::OsuTaiko => Gamemode::Taiko,
            Self::Hero => Gamemode::Hero,
        }
    }

    /// The format charts built in memory are attributed to.
    #[must_use]
    pub const fn native_to(gamemode: Gamemode) -> Self {
        match gamemode {
            Gamemode::FourKey => Self::FnfV2,
            Gamemode::Hero => Self::Hero,
            Gamemode::Taiko => Self::OsuTaiko,
            Gamemode::Mania => Self::StepMania,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FnfV1 => "FNF v1",
            Self::FnfV2 => "FNF v2",
            Self::StepMania => "StepMania",
            Self::OsuMania => "osu!mania",
            Self::OsuTaiko => "osu!taiko",
            Self::Hero => "Clone Hero",
        })
    }
}

/// What is known about a chart without parsing its notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartMetadata {
    /// The source file. For FNF v2 this is the `-chart.json` file.
    pub path: PathBuf,
    /// The source format.
    pub format: Format,
    /// Song title.
    pub title: String,
    /// Song artist.
    pub artist: String,
    /// Chart author, if declared.
    pub charter: Option<String>,
    /// Difficulty name as written in the source.
    pub difficulty: String,
    /// Instrument or track, if the format has more than one per difficulty.
    pub instrument: Option<String>,
    /// Position of this chart among the charts of its file.
    pub index: usize,
    /// md5 hex digest of the source file.
    pub hash: String,
}

impl ChartMetadata {
    /// Metadata for a chart which has no source file.
    #[must_use]
    pub fn untitled(gamemode: Gamemode) -> Self {
        Self {
            path: PathBuf::new(),
            format: Format::native_to(gamemode),
            title: String::new(),
            artist: String::new(),
            charter: None,
            difficulty: String::new(),
            instrument: None,
            index: 0,
            hash: String::new(),
        }
    }

    /// The gamemode of the chart.
    #[must_use]
    pub const fn gamemode(&self) -> Gamemode {
        self.format.gamemode()
    }

    /// Whether this chart answers to `difficulty` (ignoring case) and `instrument`.
    ///
    /// Metadata without an instrument matches any instrument; the instrument is then decided by
    /// the parsed charts.
    #[must_use]
    pub fn matches(&self, difficulty: &str, instrument: Option<&str>) -> bool {
        self.difficulty.eq_ignore_ascii_case(difficulty)
            && match (self.instrument.as_deref(), instrument) {
                (Some(own), Some(wanted)) => own.eq_ignore_ascii_case(wanted),
                _ => true,
            }
    }
}

/// A playable note and event timeline of one difficulty and instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart<K> {
    /// Where the chart came from.
    pub metadata: ChartMetadata,
    /// The player or track this chart belongs to, such as `player1` or `guitar`.
    pub instrument: String,
    /// Notes sorted by time, lane and kind.
    pub notes: Vec<Note<K>>,
    /// Events sorted by time.
    pub events: Vec<Event>,
    /// Tempo timeline.
    pub tempo: TempoMap,
    /// Number of lanes.
    pub lanes: usize,
    /// Scroll speed declared by the chart.
    pub scroll_speed: Option<f64>,
}

impl<K: NoteKind> Chart<K> {
    /// Starts building a chart with `lanes` lanes.
    #[must_use]
    pub fn builder(lanes: usize) -> ChartBuilder<K> {
        ChartBuilder {
            chart: Chart {
                metadata: ChartMetadata::untitled(K::GAMEMODE),
                instrument: String::new(),
                notes: Vec::new(),
                events: Vec::new(),
                tempo: TempoMap::default(),
                lanes,
                scroll_speed: None,
            },
        }
    }

    /// The gamemode of the chart.
    #[must_use]
    pub const fn gamemode(&self) -> Gamemode {
        K::GAMEMODE
    }

    /// The tempo at the first beat.
    #[must_use]
    pub fn bpm(&self) -> f64 {
        self.tempo.initial_bpm()
    }

    /// The time the last note ends at, `0` for an empty chart.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end_time)
            .fold(0.0, f64::max)
    }
}

/// Builder of [`Chart`]. Sorts notes and events on [`ChartBuilder::build`].
#[derive(Debug, Clone)]
pub struct ChartBuilder<K> {
    chart: Chart<K>,
}

impl<K: NoteKind> ChartBuilder<K> {
    /// Sets the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: ChartMetadata) -> Self {
        self.chart.metadata = metadata;
        self
    }

    /// Sets the instrument.
    #[must_use]
    pub fn instrument(mut self, instrument: impl Into<String>) -> Self {
        self.chart.instrument = instrument.into();
        self
    }

    /// Sets the tempo map.
    #[must_use]
    pub fn tempo(mut self, tempo: TempoMap) -> Self {
        self.chart.tempo = tempo;
        self
    }

    /// Sets the scroll speed.
    #[must_use]
    pub fn scroll_speed(mut self, speed: Option<f64>) -> Self {
        self.chart.scroll_speed = speed;
        self
    }

    /// Adds a note.
    #[must_use]
    pub fn note(mut self, note: Note<K>) -> Self {
        self.chart.notes.push(note);
        self
    }

    /// Adds notes. Parent indices refer to the order notes were added in.
    #[must_use]
    pub fn notes(mut self, notes: impl IntoIterator<Item = Note<K>>) -> Self {
        self.chart.notes.extend(notes);
        self
    }

    /// Adds events.
    #[must_use]
    pub fn events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.chart.events.extend(events);
        self
    }

    /// Sorts the timeline and finishes the chart.
    #[must_use]
    pub fn build(mut self) -> Chart<K> {
        sort_with_parents(&mut self.chart.notes);
        sort_events(&mut self.chart.events);
        self.chart
    }
}

/// Sorts notes into timeline order and rewrites parent indices to the new positions.
pub(crate) fn sort_with_parents<K: Ord>(notes: &mut Vec<Note<K>>) {
    let mut order: Vec<usize> = (0..notes.len()).collect();
    order.sort_by(|&a, &b| notes[a].timeline_cmp(&notes[b]));

    let mut new_index = vec![0; notes.len()];
    for (new, &old) in order.iter().enumerate() {
        new_index[old] = new;
    }
    let mut slots: Vec<_> = notes.drain(..).map(Some).collect();
    notes.extend(order.iter().filter_map(|&old| slots[old].take()));
    for note in notes.iter_mut() {
        note.parent = note.parent.and_then(|old| new_index.get(old).copied());
    }
}

/// A folder of related charts for one song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSet {
    /// The folder.
    pub path: PathBuf,
    /// Song title, from the first chart.
    pub title: String,
    /// Song artist, from the first chart.
    pub artist: String,
    /// Every chart found in the folder.
    pub charts: Vec<ChartMetadata>,
}

impl ChartSet {
    /// Groups chart metadata of a folder.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, charts: Vec<ChartMetadata>) -> Self {
        let path = path.into();
        let (title, artist) = charts
            .iter()
            .find(|chart| !chart.title.is_empty())
            .map(|chart| (chart.title.clone(), chart.artist.clone()))
            .unwrap_or_else(|| (folder_name(&path), String::new()));
        Self {
            path,
            title,
            artist,
            charts,
        }
    }

    /// Distinct difficulty names.
    #[must_use]
    pub fn difficulties(&self) -> BTreeSet<&str> {
        self.charts
            .iter()
            .map(|chart| chart.difficulty.as_str())
            .collect()
    }

    /// Distinct formats.
    #[must_use]
    pub fn formats(&self) -> BTreeSet<Format> {
        self.charts.iter().map(|chart| chart.format).collect()
    }

    /// Finds the metadata for a difficulty and instrument.
    #[must_use]
    pub fn find(&self, difficulty: &str, instrument: Option<&str>) -> Option<&ChartMetadata> {
        self.charts
            .iter()
            .find(|chart| chart.matches(difficulty, instrument))
    }

    /// Parses the charts of a difficulty, keeping only `instrument` if given.
    ///
    /// # Errors
    ///
    /// [`ChartError::UnknownDifficulty`] if no chart matches, or any parse error.
    pub fn load(
        &self,
        difficulty: &str,
        instrument: Option<&str>,
        config: &ParseConfig,
    ) -> Result<LoadedCharts> {
        let unknown = || ChartError::UnknownDifficulty {
            difficulty: difficulty.to_owned(),
            instrument: instrument.map(str::to_owned),
        };
        let metadata = self.find(difficulty, instrument).ok_or_else(unknown)?;
        let mut charts = loader::load_chart(metadata, config)?;
        if let Some(instrument) = instrument {
            charts.retain_instrument(instrument);
        }
        if charts.is_empty() {
            return Err(unknown());
        }
        Ok(charts)
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
