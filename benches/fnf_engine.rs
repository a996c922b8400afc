//! Benchmark for playing FNF charts through the `Engine`.

use charm::prelude::*;
use criterion::Criterion;
use std::sync::LazyLock;

/// Sixteenth notes at 150 BPM over four lanes, every eighth one held.
fn synthetic_chart(count: u32) -> Chart<FnfNote> {
    let step = 60.0 / 150.0 / 4.0;
    let mut notes = Vec::new();
    for index in 0..count {
        let time = f64::from(index) * step;
        let lane = (index % 4) as usize;
        if index % 8 == 0 {
            let head = notes.len();
            notes.push(Note::new(time, lane, FnfNote::Normal).with_length(step * 2.0));
            notes.push(Note::new(time + step, lane, FnfNote::Sustain).with_parent(head));
        } else {
            notes.push(Note::new(time, lane, FnfNote::Normal));
        }
    }
    Chart::builder(4).notes(notes).build()
}

static CHARTS: LazyLock<Vec<(String, Chart<FnfNote>)>> = LazyLock::new(|| {
    [500, 5_000]
        .into_iter()
        .map(|count| (format!("{count}_notes"), synthetic_chart(count)))
        .collect()
});

/// Presses every head on time and releases it after its length.
fn perfect_inputs(chart: &Chart<FnfNote>) -> Vec<InputEvent> {
    let mut inputs: Vec<_> = chart
        .notes
        .iter()
        .filter(|note| note.kind != FnfNote::Sustain)
        .flat_map(|note| {
            [
                InputEvent::down(note.time, note.lane),
                InputEvent::up(note.time + note.length + 0.01, note.lane),
            ]
        })
        .collect();
    inputs.sort_by(|a, b| a.time.total_cmp(&b.time));
    inputs
}

fn bench_fnf_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("fnf_engine");

    for (name, chart) in CHARTS.iter() {
        let inputs = perfect_inputs(chart);
        let end = chart.duration() + 1.0;
        group.bench_function(format!("{name}_per_input"), |b| {
            b.iter(|| {
                let mut engine = Engine::new(chart.clone());
                for &input in std::hint::black_box(&inputs) {
                    engine.advance(input.time, [input]);
                }
                engine.advance(end, []);
                engine.stats().score
            });
        });
        group.bench_function(format!("{name}_per_frame"), |b| {
            b.iter(|| {
                let mut engine = Engine::new(chart.clone());
                let mut pending = inputs.iter().copied().peekable();
                let mut now = 0.0;
                while now < end {
                    now += 1.0 / 240.0;
                    let frame: Vec<_> =
                        std::iter::from_fn(|| pending.next_if(|input| input.time <= now)).collect();
                    engine.advance(now, std::hint::black_box(frame));
                }
                engine.stats().score
            });
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_fnf_engine(&mut criterion);
}
