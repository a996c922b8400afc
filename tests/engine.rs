mod common;

use charm::prelude::*;
use common::assert_time_close;
use pretty_assertions::assert_eq;

fn fnf(notes: impl IntoIterator<Item = Note<FnfNote>>) -> Engine<FnfNote> {
    Engine::new(Chart::builder(4).notes(notes).build())
}

fn mania(notes: impl IntoIterator<Item = Note<ManiaNote>>) -> Engine<ManiaNote> {
    Engine::new(Chart::builder(4).notes(notes).build())
}

#[test]
fn hit_inside_the_window() {
    let mut engine = fnf([Note::new(1.0, 0, FnfNote::Normal)]);
    engine.advance(1.05, [InputEvent::down(1.05, 0)]);

    let note = &engine.chart().notes[0];
    assert!(note.is_hit());
    assert_eq!(note.hit_time(), Some(1.05));
    let record = &engine.log()[0];
    assert_eq!(record.outcome.tier, Some(1));
    assert_eq!(engine.judgements().get(1).map(|tier| tier.name.as_str()), Some("good"));
    assert_eq!(engine.stats().streak, 1);
    assert_eq!(engine.stats().score, 200);
    assert_eq!(engine.stats().judgement_counts, [0, 1, 0, 0, 0]);
    assert_time_close(1.02, engine.health(), "health after good");
    assert!(engine.is_finished());
}

#[test]
fn miss_after_the_window() {
    let mut engine = fnf([
        Note::new(0.5, 1, FnfNote::Normal),
        Note::new(1.0, 0, FnfNote::Normal),
    ]);
    engine.advance(0.5, [InputEvent::down(0.5, 1)]);
    assert_eq!(engine.stats().streak, 1);
    engine.advance(1.1, []);
    assert!(engine.chart().notes[1].is_pending());

    engine.advance(1.0 + engine.hit_window() + 0.01, []);
    let note = &engine.chart().notes[1];
    assert!(note.is_missed());
    assert_eq!(note.hit_time(), Some(f64::INFINITY));
    assert_eq!(engine.stats().streak, 0);
    assert_eq!(engine.stats().max_streak, 1);
    assert_eq!(engine.stats().misses, 1);
    assert_time_close(1.0 + 0.04 - 0.1, engine.health(), "health after miss");
    assert!(engine.is_finished());
}

#[test]
fn early_presses_do_not_hit() {
    let mut engine = fnf([Note::new(1.0, 0, FnfNote::Normal)]);
    engine.advance(0.7, [InputEvent::down(0.7, 0)]);
    engine.advance(1.0, []);
    assert!(engine.chart().notes[0].is_pending());
    engine.advance(1.01, [InputEvent::down(1.01, 0)]);
    assert_eq!(engine.log()[0].outcome.tier, Some(0));
}

#[test]
fn a_note_is_resolved_once() {
    let mut engine = fnf([Note::new(1.0, 0, FnfNote::Normal)]);
    engine.advance(1.0, [InputEvent::down(1.0, 0), InputEvent::down(1.02, 0)]);
    engine.advance(1.05, [InputEvent::down(1.05, 0)]);
    engine.advance(5.0, []);
    assert_eq!(engine.log().len(), 1);
    assert_eq!(engine.stats().hits, 1);
    assert_eq!(engine.stats().misses, 0);
}

#[test]
fn death_is_sticky_until_reset() {
    let mut engine = fnf([
        Note::new(1.0, 0, FnfNote::Death),
        Note::new(2.0, 1, FnfNote::Heal),
    ]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert!(engine.is_dead());
    assert_eq!(engine.health(), 0.0);

    engine.advance(2.0, [InputEvent::down(2.0, 1)]);
    assert_time_close(0.4, engine.health(), "heal after death");
    assert!(engine.is_dead());

    engine.reset();
    assert!(!engine.is_dead());
    assert_eq!(engine.health(), 1.0);
    assert!(engine.chart().notes.iter().all(Note::is_pending));
    assert_eq!(engine.stats().hits, 0);
    assert!(engine.log().is_empty());
}

#[test]
fn bombs_and_death_notes_are_harmless_when_avoided() {
    let mut engine = fnf([
        Note::new(1.0, 0, FnfNote::Bomb),
        Note::new(1.5, 1, FnfNote::Death),
    ]);
    engine.advance(3.0, []);
    assert!(engine.chart().notes.iter().all(Note::is_missed));
    assert_eq!(engine.health(), 1.0);
    assert_eq!(engine.stats().misses, 0);
    assert!(!engine.is_dead());
}

#[test]
fn bombs_cost_health_without_breaking_the_streak() {
    let mut engine = fnf([
        Note::new(0.5, 1, FnfNote::Normal),
        Note::new(1.0, 0, FnfNote::Bomb),
    ]);
    engine.advance(0.5, [InputEvent::down(0.5, 1)]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert!(engine.chart().notes[1].is_hit());
    assert_time_close(1.04 - 0.5, engine.health(), "health after bomb");
    assert_eq!(engine.stats().streak, 1);
    assert_eq!(engine.accuracy(), Some(1.0));
}

#[test]
fn heals_replace_the_tier_health() {
    let mut engine = fnf([Note::new(1.0, 0, FnfNote::Heal)]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert_time_close(1.4, engine.health(), "health after heal");
    assert_eq!(engine.stats().streak, 1);
}

#[test]
fn health_is_clamped() {
    let chart = Chart::builder(4)
        .notes([
            Note::new(1.0, 0, FnfNote::Heal),
            Note::new(2.0, 0, FnfNote::Bomb),
            Note::new(3.0, 0, FnfNote::Bomb),
            Note::new(4.0, 0, FnfNote::Bomb),
            Note::new(5.0, 0, FnfNote::Bomb),
            Note::new(6.0, 0, FnfNote::Bomb),
        ])
        .build();
    let config = EngineConfig {
        initial_hp: 1.9,
        ..FnfNote::default_config()
    };
    let mut engine = Engine::with_config(chart, config, FnfNote::default_judgements());
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert_eq!(engine.health(), 2.0);

    for time in [2.0, 3.0, 4.0, 5.0, 6.0] {
        engine.advance(time, [InputEvent::down(time, 0)]);
        let health = engine.health();
        assert!((0.0..=2.0).contains(&health), "health {health} out of range");
    }
    assert_eq!(engine.health(), 0.0);
    assert!(engine.is_dead());
}

#[test]
fn sustain_ticks_follow_the_held_key() {
    let mut engine = fnf([
        Note::new(1.0, 0, FnfNote::Normal).with_length(0.5),
        Note::new(1.125, 0, FnfNote::Sustain).with_parent(0),
        Note::new(1.25, 0, FnfNote::Sustain).with_parent(0),
        Note::new(1.375, 0, FnfNote::Sustain).with_parent(0),
    ]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert!(engine.chart().notes[1].is_pending());
    engine.advance(1.2, []);
    assert!(engine.chart().notes[1].is_hit());
    assert!(engine.stats().last_was_sustain);

    engine.advance(1.3, [InputEvent::up(1.3, 0)]);
    engine.advance(1.6, []);
    assert!(engine.chart().notes[2].is_missed());
    assert!(engine.chart().notes[3].is_missed());

    assert_time_close(1.0 + 0.04 + 0.01 - 0.02, engine.health(), "health after ticks");
    assert_eq!(engine.stats().hits, 1);
    assert_eq!(engine.stats().misses, 0);
    assert_eq!(engine.stats().streak, 1);
}

#[test]
fn native_holds_complete() {
    let mut engine = mania([Note::new(1.0, 0, ManiaNote::Normal).with_length(1.0)]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert!(!engine.is_finished());
    // releasing within the grace period still completes the hold
    engine.advance(1.95, [InputEvent::up(1.95, 0)]);
    engine.advance(2.0, []);
    assert_eq!(engine.stats().holds_completed, 1);
    assert_eq!(engine.stats().holds_dropped, 0);
    assert_time_close(0.5 + 0.008 + 0.008, engine.health(), "health after hold");
    assert!(engine.is_finished());
}

#[test]
fn native_holds_drop_on_early_release() {
    let mut engine = mania([Note::new(1.0, 0, ManiaNote::Roll).with_length(1.0)]);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    engine.advance(1.5, [InputEvent::up(1.5, 0)]);
    assert_eq!(engine.stats().holds_dropped, 1);
    assert_time_close(0.5 + 0.008 - 0.08, engine.health(), "health after drop");
    assert!(engine.is_finished());
}

#[test]
fn native_holds_drop_when_released_before_the_note_time() {
    let mut engine = mania([Note::new(1.0, 0, ManiaNote::Normal).with_length(1.0)]);
    engine.advance(0.95, [InputEvent::down(0.95, 0)]);
    assert!(engine.chart().notes[0].is_hit());
    engine.advance(0.97, [InputEvent::up(0.97, 0)]);
    engine.advance(2.5, []);
    assert_eq!(engine.stats().holds_dropped, 1);
    assert_eq!(engine.stats().holds_completed, 0);
    assert!(engine.is_finished());
}

#[test]
fn the_window_edge_still_hits() {
    let mut engine = fnf([
        Note::new(1.0, 0, FnfNote::Normal),
        Note::new(2.0, 1, FnfNote::Normal),
    ]);
    let window = engine.hit_window();
    let edge = 1.0 + window;
    engine.advance(edge, [InputEvent::down(edge, 0)]);
    let note = &engine.chart().notes[0];
    assert!(note.is_hit());
    assert_eq!(note.hit_time(), Some(edge));
    assert!((edge - note.time).abs() <= window + 1e-9);
    assert_eq!(engine.log()[0].outcome.tier, Some(3));

    // a millisecond later the miss sweep wins over the press
    let late = 2.0 + window + 0.001;
    engine.advance(late, [InputEvent::down(late, 1)]);
    assert!(engine.chart().notes[1].is_missed());
    assert_eq!(engine.stats().misses, 1);
    assert_eq!(engine.stats().hits, 1);
}

#[test]
fn lifts_need_a_release() {
    let mut engine = mania([Note::new(1.0, 0, ManiaNote::Lift)]);
    engine.advance(0.9, [InputEvent::down(0.9, 0)]);
    engine.advance(1.0, []);
    assert!(engine.chart().notes[0].is_pending());
    engine.advance(1.01, [InputEvent::up(1.01, 0)]);
    assert!(engine.chart().notes[0].is_hit());
    assert_eq!(engine.log()[0].outcome.tier, Some(0));
}

#[test]
fn mines_and_fakes() {
    let mut engine = mania([
        Note::new(1.0, 2, ManiaNote::Mine),
        Note::new(1.0, 3, ManiaNote::Fake),
    ]);
    engine.advance(1.0, [InputEvent::down(1.0, 2), InputEvent::down(1.0, 3)]);
    assert_time_close(0.45, engine.health(), "health after mine");
    assert!(engine.chart().notes[1].is_pending());
    assert!(engine.is_finished());
}

#[test]
fn display_only_notes_never_block_the_end() {
    let chart = Chart::builder(2)
        .note(Note::new(1.0, 0, TaikoNote::Drumroll).with_length(2.0))
        .build();
    let engine = Engine::new(chart);
    assert!(engine.is_finished());
}

#[test]
fn time_never_goes_backwards() {
    let mut engine = fnf([Note::new(1.0, 0, FnfNote::Normal)]);
    engine.advance(2.0, []);
    engine.advance(1.0, [InputEvent::down(1.0, 0)]);
    assert_eq!(engine.chart_time(), 2.0);
    assert!(engine.chart().notes[0].is_missed());
}

#[test]
fn inputs_beyond_the_lanes_are_ignored() {
    let mut engine = fnf([Note::new(1.0, 3, FnfNote::Normal)]);
    engine.advance(1.0, [InputEvent::down(1.0, 7)]);
    assert!(engine.chart().notes[0].is_pending());
}

#[test]
fn tiers_do_not_depend_on_table_order() {
    let tiers = || Vec::<Judgement>::from(FnfNote::default_judgements());
    let forward = JudgementTable::new(tiers()).unwrap();
    let backward = JudgementTable::new(tiers().into_iter().rev()).unwrap();
    for reaction in [0.0, 0.045, 0.0451, 0.09, 0.1, 0.135, 0.166, 0.2, f64::INFINITY] {
        assert_eq!(forward.judge(reaction), backward.judge(reaction), "{reaction}");
    }
    assert_eq!(forward.judge(0.045).1.name, "sick");
    assert_eq!(forward.judge(0.2).1.name, "miss");
}

#[test]
fn replays_are_deterministic() {
    let notes: Vec<_> = (0..32u32)
        .map(|index| Note::new(0.5 + f64::from(index) * 0.25, (index % 4) as usize, FnfNote::Normal))
        .collect();
    let offsets = [-0.12, 0.0, 0.03, 0.2, 0.07, -0.04, 0.15, 0.01];
    let run = || {
        let mut engine = fnf(notes.clone());
        for (index, note) in notes.iter().enumerate() {
            let time = note.time + offsets[index % offsets.len()];
            engine.advance(time, [InputEvent::down(time, note.lane)]);
        }
        engine.advance(20.0, []);
        engine
    };
    let first = run();
    let second = run();
    assert_eq!(first.log(), second.log());
    assert_eq!(first.stats(), second.stats());

    for note in &first.chart().notes {
        if let Some(hit) = note.hit_time().filter(|_| note.is_hit()) {
            assert!((hit - note.time).abs() <= first.hit_window() + 1e-9);
        }
    }
    assert!(first.is_finished());
    assert_eq!(first.stats().hits + first.stats().misses, 32);
}

#[test]
fn settings_from_json() {
    let config = FnfNote::default_config()
        .with_overrides(&serde_json::json!({"max_hp": 4.0}))
        .unwrap();
    assert_eq!(config.max_hp, 4.0);
    assert_eq!(config.heal_amount, 0.4);

    let table: JudgementTable = serde_json::from_str(
        r#"[{"name": "perfect", "window_ms": 30, "score": 10, "accuracy": 1.0, "health": 0.1},
            {"name": "miss", "window_ms": null, "health": -0.2}]"#,
    )
    .unwrap();
    let mut engine = Engine::with_config(
        Chart::builder(4).note(Note::new(1.0, 0, FnfNote::Normal)).build(),
        config,
        table,
    );
    engine.advance(1.02, [InputEvent::down(1.02, 0)]);
    assert_eq!(engine.stats().score, 10);
    assert_time_close(1.1, engine.health(), "custom tier health");
}
