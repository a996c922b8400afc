//! Format detection and dispatch to the parsers.
//!
//! A chart folder may hold charts of several formats. [`resolve_parsers`] reports every format
//! found, [`load_chartset`] merges their metadata, and [`load_chart`] parses one of them into the
//! note kind of its gamemode.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    chart::{Chart, ChartMetadata, ChartSet, Format, Gamemode},
    error::{ChartError, Result},
    mode::{FnfNote, HeroNote, ManiaNote, TaikoNote},
    parse::{
        ChartParser, ParseConfig,
        fnf_v1::FnfV1Parser,
        fnf_v2::FnfV2Parser,
        hero::HeroParser,
        osu::{OsuManiaParser, OsuTaikoParser},
        stepmania::StepManiaParser,
    },
};

/// Fully parsed charts, typed by gamemode.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCharts {
    /// FNF charts, one per player.
    FourKey(Vec<Chart<FnfNote>>),
    /// A Hero track.
    Hero(Vec<Chart<HeroNote>>),
    /// A taiko chart.
    Taiko(Vec<Chart<TaikoNote>>),
    /// A StepMania or osu!mania chart.
    Mania(Vec<Chart<ManiaNote>>),
}

/// Applies `$body` to the chart vector of any variant.
macro_rules! each_variant {
    ($value:expr, $charts:ident => $body:expr) => {
        match $value {
            LoadedCharts::FourKey($charts) => $body,
            LoadedCharts::Hero($charts) => $body,
            LoadedCharts::Taiko($charts) => $body,
            LoadedCharts::Mania($charts) => $body,
        }
    };
}

impl LoadedCharts {
    /// The gamemode of the charts.
    #[must_use]
    pub const fn gamemode(&self) -> Gamemode {
        match self {
            Self::FourKey(_) => Gamemode::FourKey,
            Self::Hero(_) => Gamemode::Hero,
            Self::Taiko(_) => Gamemode::Taiko,
            Self::Mania(_) => Gamemode::Mania,
        }
    }

    /// Number of charts.
    #[must_use]
    pub fn len(&self) -> usize {
        each_variant!(self, charts => charts.len())
    }

    /// Whether no chart is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instruments of the charts, in order.
    #[must_use]
    pub fn instruments(&self) -> Vec<&str> {
        each_variant!(self, charts => charts.iter().map(|chart| chart.instrument.as_str()).collect())
    }

    /// Keeps only the charts of `instrument`, compared case-insensitively.
    pub fn retain_instrument(&mut self, instrument: &str) {
        each_variant!(self, charts => charts.retain(|chart| chart.instrument.eq_ignore_ascii_case(instrument)));
    }
}

fn can_parse(format: Format, path: &Path, config: &ParseConfig) -> bool {
    match format {
        Format::FnfV1 => FnfV1Parser::new(config).can_parse(path),
        Format::FnfV2 => FnfV2Parser::new(config).can_parse(path),
        Format::StepMania => StepManiaParser.can_parse(path),
        Format::OsuMania => OsuManiaParser.can_parse(path),
        Format::OsuTaiko => OsuTaikoParser.can_parse(path),
        Format::Hero => HeroParser::new(config).can_parse(path),
    }
}

fn parse_metadata(format: Format, path: &Path, config: &ParseConfig) -> Result<Vec<ChartMetadata>> {
    match format {
        Format::FnfV1 => FnfV1Parser::new(config).parse_metadata(path),
        Format::FnfV2 => FnfV2Parser::new(config).parse_metadata(path),
        Format::StepMania => StepManiaParser.parse_metadata(path),
        Format::OsuMania => OsuManiaParser.parse_metadata(path),
        Format::OsuTaiko => OsuTaikoParser.parse_metadata(path),
        Format::Hero => HeroParser::new(config).parse_metadata(path),
    }
}

/// Every format with charts in `folder`, detected with the parsers `config` builds.
///
/// Never fails: unreadable folders give an empty set.
#[must_use]
pub fn resolve_parsers(folder: &Path, config: &ParseConfig) -> BTreeSet<Format> {
    Format::ALL
        .into_iter()
        .filter(|&format| can_parse(format, folder, config))
        .collect()
}

/// Fully parses the charts `metadata` describes, with the parser of its format.
///
/// # Errors
///
/// Any parse error of that parser.
pub fn load_chart(metadata: &ChartMetadata, config: &ParseConfig) -> Result<LoadedCharts> {
    Ok(match metadata.format {
        Format::FnfV1 => LoadedCharts::FourKey(FnfV1Parser::new(config).parse_chart(metadata)?),
        Format::FnfV2 => LoadedCharts::FourKey(FnfV2Parser::new(config).parse_chart(metadata)?),
        Format::StepMania => LoadedCharts::Mania(StepManiaParser.parse_chart(metadata)?),
        Format::OsuMania => LoadedCharts::Mania(OsuManiaParser.parse_chart(metadata)?),
        Format::OsuTaiko => LoadedCharts::Taiko(OsuTaikoParser.parse_chart(metadata)?),
        Format::Hero => LoadedCharts::Hero(HeroParser::new(config).parse_chart(metadata)?),
    })
}

/// Lists the charts of every format in `folder`.
///
/// If one of several formats fails, the charts of the others are still returned.
///
/// # Errors
///
/// [`ChartError::UnknownFormat`] if no format matches, or the first parser error if every
/// matching format fails.
pub fn load_chartset(folder: &Path, config: &ParseConfig) -> Result<ChartSet> {
    let formats = resolve_parsers(folder, config);
    if formats.is_empty() {
        return Err(ChartError::UnknownFormat {
            path: folder.to_path_buf(),
        });
    }
    log::debug!("{}: parsing as {formats:?}", folder.display());

    let mut charts = Vec::new();
    let mut first_error = None;
    for format in formats {
        match parse_metadata(format, folder, config) {
            Ok(found) => charts.extend(found),
            Err(err) => {
                log::debug!("{}: {format} failed: {err}", folder.display());
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if charts.is_empty() => Err(err),
        _ => Ok(ChartSet::new(folder, charts)),
    }
}

/// Scans every subfolder of `songs_dir` for charts, sorted by folder path.
///
/// Folders that fail to load are skipped with a warning. With the `parallel` feature, folders are
/// scanned on the rayon thread pool.
///
/// # Errors
///
/// If `songs_dir` itself cannot be listed.
pub fn load_chartsets(songs_dir: &Path, config: &ParseConfig) -> Result<Vec<ChartSet>> {
    let entries = fs::read_dir(songs_dir).map_err(|source| ChartError::io(songs_dir, source))?;
    let mut folders = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ChartError::io(songs_dir, source))?
            .path();
        if path.is_dir() {
            folders.push(path);
        }
    }

    let scan = |folder: &PathBuf| match load_chartset(folder, config) {
        Ok(set) => Some(set),
        Err(err) => {
            log::warn!("skipping {}: {err}", folder.display());
            None
        }
    };
    #[cfg(feature = "parallel")]
    let mut sets: Vec<_> = folders.par_iter().filter_map(scan).collect();
    #[cfg(not(feature = "parallel"))]
    let mut sets: Vec<_> = folders.iter().filter_map(scan).collect();

    sets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sets)
}
