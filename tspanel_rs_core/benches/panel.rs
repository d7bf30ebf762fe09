use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tspanel_core::{
    Column, ConcatAxis, OperatorArgs, Panel, RegularSeries, Scalar, StaticCovariates, TimeIndex,
    TimePoint,
};

fn get_series(prefix: &str, len: usize, num_columns: usize) -> RegularSeries {
    let columns = (0..num_columns).map(|i| format!("{prefix}{i}")).collect();
    let values = (0..num_columns)
        .map(|i| Column::from_f64((0..len).map(|j| ((i * 31 + j * 17) % 97) as f64).collect()))
        .collect();
    RegularSeries::new(TimeIndex::ordinal(0, 1, len).unwrap(), columns, values).unwrap()
}

fn get_panel(len: usize, num_columns: usize) -> Panel {
    let statics = StaticCovariates::from([("group".to_string(), Scalar::Int(0))]);
    Panel::new(
        Some(get_series("y", len, num_columns)),
        Some(get_series("o", len, num_columns)),
        Some(get_series("k", len + len / 10, num_columns)),
        Some(statics),
    )
    .unwrap()
}

macro_rules! bench_panel {
    ($c:expr, $len:expr, $num_columns:expr) => {{
        let panel = get_panel($len, $num_columns);
        let point = TimePoint::Fraction(0.7);
        let names: Vec<String> = (0..$num_columns)
            .step_by(2)
            .flat_map(|i| [format!("y{i}"), format!("k{i}")])
            .chain(["group".to_string()])
            .collect();
        let (left, mut right) = panel.split(&point, false).unwrap();
        right.set_known(None).unwrap();
        let suffix = format!("({} rows, {} columns)", $len, $num_columns);
        $c.bench_function(&format!("split {suffix}"), |b| {
            b.iter(|| panel.split(black_box(&point), false))
        });
        $c.bench_function(&format!("concat {suffix}"), |b| {
            b.iter(|| Panel::concat(black_box(&[&left, &right]), ConcatAxis::Time))
        });
        $c.bench_function(&format!("read {suffix}"), |b| {
            b.iter(|| panel.read(black_box(&names)))
        });
        $c.bench_function(&format!("mean {suffix}"), |b| {
            b.iter(|| panel.invoke("mean", black_box(&OperatorArgs::default())))
        });
    }};
}

pub fn bench_panel(c: &mut Criterion) {
    bench_panel!(c, 1_000, 8);
    bench_panel!(c, 100_000, 32);
}

criterion_group!(benches, bench_panel);
criterion_main!(benches);
