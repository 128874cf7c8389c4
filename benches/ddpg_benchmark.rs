use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ddpg::algorithms::{DdpgBuilder, DDPG};
use ndarray::Array1;

fn filled_agent(hidden: usize) -> DDPG {
    let mut agent = DdpgBuilder::new(2, 8)
        .hidden_sizes(vec![hidden, hidden])
        .buffer_size(10_000)
        .seed(0)
        .build()
        .unwrap();
    for i in 0..1_000 {
        let x = (i as f32 * 0.01).sin();
        agent.memorize(
            Array1::from_elem(8, x),
            Array1::from_elem(2, -x),
            x,
            i % 100 == 99,
            Array1::from_elem(8, x + 0.01),
        );
    }
    agent
}

fn bench_get_action(c: &mut Criterion) {
    let agent = filled_agent(64);
    let state = Array1::from_elem(8, 0.5);
    c.bench_function("get_action", |b| b.iter(|| agent.get_action(black_box(state.view())).unwrap()));
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for &batch_size in &[32usize, 128] {
        for &hidden in &[64usize, 256] {
            let mut agent = filled_agent(hidden);
            group.bench_with_input(
                BenchmarkId::new(format!("hidden_{}", hidden), batch_size),
                &batch_size,
                |b, &batch_size| b.iter(|| agent.update(batch_size).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_get_action, bench_update);
criterion_main!(benches);
