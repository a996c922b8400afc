mod common;

use charm::{parse::fnf_v2::FnfV2Parser, prelude::*};
use common::{SongFolder, assert_time_close};
use pretty_assertions::assert_eq;
use serde_json::json;

const METADATA: &str = r#"{
    "version": "2.2.0",
    "songName": "Blammed",
    "artist": "Kawai Sprite",
    "charter": "ninjamuffin",
    "timeFormat": "ms",
    "timeChanges": [{"t": 0, "bpm": 120}, {"t": 2000, "bpm": 240}],
    "playData": {"difficulties": ["easy", "hard", "nightmare"]}
}"#;

const CHART: &str = r#"{
    "version": "2.0.0",
    "scrollSpeed": {"hard": 2.0, "default": 1.0},
    "events": [
        {"t": 500, "e": "FocusCamera", "v": {"char": 1}},
        {"t": 600, "e": "SetCameraBop", "v": {"rate": 2}}
    ],
    "notes": {
        "easy": [{"t": 1000, "d": 0}],
        "hard": [
            {"t": 1000, "d": 4, "l": 250},
            {"t": 2500, "d": 1, "k": "hurt"},
            {"t": 3000, "d": 2, "k": "bomb"}
        ]
    }
}"#;

fn folder() -> SongFolder {
    SongFolder::new(
        "blammed",
        &[
            ("blammed-metadata.json", METADATA),
            ("blammed-chart.json", CHART),
        ],
    )
}

#[test]
fn metadata_lists_charted_difficulties() {
    let folder = folder();
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    assert!(parser.can_parse(&folder.path()));

    let metadata = parser.parse_metadata(&folder.path()).unwrap();
    let difficulties: Vec<_> = metadata.iter().map(|chart| chart.difficulty.as_str()).collect();
    assert_eq!(difficulties, ["easy", "hard"]);
    assert_eq!(metadata[0].title, "Blammed");
    assert_eq!(metadata[0].charter.as_deref(), Some("ninjamuffin"));
    assert_eq!(metadata[0].format, Format::FnfV2);
    assert!(metadata[0].path.ends_with("blammed-chart.json"));
}

#[test]
fn hard_chart() {
    let folder = folder();
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    let metadata = parser.parse_metadata(&folder.path()).unwrap();
    let charts = parser.parse_chart(&metadata[1]).unwrap();
    assert_eq!(charts.len(), 2);
    let [player1, player2] = &charts[..] else {
        unreachable!()
    };
    assert_eq!(player1.scroll_speed, Some(2.0));

    // lane 4 belongs to the other player, its hold gets one tick
    assert_eq!(player2.notes.len(), 2);
    assert_time_close(0.25, player2.notes[0].length, "hold length");
    assert_eq!(player2.notes[1].kind, FnfNote::Sustain);
    assert_time_close(1.125, player2.notes[1].time, "tick");

    let kinds: Vec<_> = player1.notes.iter().map(|note| (note.lane, note.kind)).collect();
    assert_eq!(kinds, [(1, FnfNote::Normal), (2, FnfNote::Bomb)]);
    assert_eq!(player1.notes[0].extra, Some(json!("hurt")));
    assert_eq!(player1.notes[1].extra, None);

    assert_time_close(4.0, player1.tempo.seconds_to_beat(2.0), "beat of the change");
    assert_eq!(player1.tempo.bpm_at_time(2.5), 240.0);
    assert!(
        player1
            .events
            .contains(&Event::new(0.5, EventKind::CameraFocus { player: 1 }))
    );
    assert!(player1.events.iter().any(|event| matches!(
        &event.kind,
        EventKind::Custom { name, .. } if name == "SetCameraBop"
    )));
}

#[test]
fn scroll_speed_falls_back_to_default() {
    let folder = folder();
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    let metadata = parser.parse_metadata(&folder.path()).unwrap();
    let charts = parser.parse_chart(&metadata[0]).unwrap();
    assert_eq!(charts[0].scroll_speed, Some(1.0));
    assert_eq!(charts[0].notes.len(), 1);
}

#[test]
fn seconds_time_format() {
    let metadata = METADATA
        .replace(r#""timeFormat": "ms""#, r#""timeFormat": "seconds""#)
        .replace(r#""t": 2000"#, r#""t": 2"#);
    let chart = r#"{"version": "2.0.0", "notes": {"easy": [
        {"t": 1.5, "d": 3},
        {"t": 3.0, "d": 0, "l": 0.4},
        {"t": 5.0, "d": 1, "l": 0.75}
    ]}}"#;
    let folder = SongFolder::new(
        "secs",
        &[("secs-metadata.json", &metadata), ("secs-chart.json", chart)],
    );
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    let metadata = parser.parse_metadata(&folder.path()).unwrap();
    let charts = parser.parse_chart(&metadata[0]).unwrap();
    assert_time_close(1.5, charts[0].notes[0].time, "note time");
    assert_eq!(charts[0].notes[0].lane, 3);

    // lengths in seconds keep their fraction
    let heads: Vec<_> = charts[0]
        .notes
        .iter()
        .filter(|note| note.kind != FnfNote::Sustain)
        .collect();
    assert_eq!(heads.len(), 3);
    assert_time_close(0.4, heads[1].length, "short hold");
    assert_time_close(0.75, heads[2].length, "long hold");

    // 240 BPM from two seconds on, a sixteenth is 0.0625s
    let ticks: Vec<_> = charts[0]
        .notes
        .iter()
        .filter(|note| note.kind == FnfNote::Sustain && note.lane == 0)
        .collect();
    assert_eq!(ticks.len(), 6);
    assert_time_close(3.375, ticks[5].time, "last tick of the short hold");
}

#[test]
fn old_versions_and_missing_companions() {
    let folder = SongFolder::new(
        "old",
        &[
            ("old-metadata.json", &METADATA.replace("2.2.0", "1.0.0")),
            ("old-chart.json", CHART),
        ],
    );
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    assert!(!parser.can_parse(&folder.path()));

    let folder = SongFolder::new("lonely", &[("lonely-metadata.json", METADATA)]);
    assert!(!parser.can_parse(&folder.path()));
    let err = parser.parse_metadata(&folder.path()).unwrap_err();
    assert!(matches!(err, ChartError::Malformed { .. }), "{err:?}");
}

#[test]
fn json_errors_carry_the_field_path() {
    let folder = SongFolder::new(
        "typo",
        &[
            ("typo-metadata.json", METADATA),
            (
                "typo-chart.json",
                r#"{"version": "2.0.0", "notes": {"easy": [{"t": "soon", "d": 0}]}}"#,
            ),
        ],
    );
    let config = ParseConfig::default();
    let parser = FnfV2Parser::new(&config);
    let metadata = parser.parse_metadata(&folder.path()).unwrap();
    let err = parser.parse_chart(&metadata[0]).unwrap_err();
    let ChartError::Json { source, .. } = err else {
        panic!("expected a json error, got {err:?}");
    };
    assert_eq!(source.path().to_string(), "notes.easy[0].t");
}
