use criterion::{black_box, criterion_group, criterion_main, Criterion};
use threadsafe::ThreadSafe;

struct Grid {
    cells: Vec<f32>,
}

impl Grid {
    fn new(size: usize) -> Self {
        Self {
            cells: vec![1.0; size],
        }
    }

    fn sum(&self) -> f32 {
        self.cells.iter().sum()
    }

    fn scale(&mut self, factor: f32) {
        for cell in &mut self.cells {
            *cell *= factor;
        }
    }
}

fn sync_read(c: &mut Criterion) {
    let grid = ThreadSafe::new(Grid::new(1024));
    c.bench_function("sync_read", |b| {
        b.iter(|| black_box(grid.sync(|grid: &Grid| grid.sum())))
    });
}

fn sync_write(c: &mut Criterion) {
    let grid = ThreadSafe::new(Grid::new(1024));
    c.bench_function("sync_write", |b| {
        b.iter(|| grid.sync(|grid: &mut Grid| grid.scale(black_box(1.0))))
    });
}

fn spawn_readers(c: &mut Criterion) {
    let grid = ThreadSafe::new(Grid::new(1024));
    c.bench_function("spawn_readers", |b| {
        b.iter(|| {
            let tasks = (0..32)
                .map(|_| grid.spawn(|grid: &Grid| grid.sum()))
                .collect::<Vec<_>>();
            black_box(threadsafe::results(&tasks))
        })
    });
}

fn spawn_mixed_graph(c: &mut Criterion) {
    let grid = ThreadSafe::new(Grid::new(1024));
    c.bench_function("spawn_mixed_graph", |b| {
        b.iter(|| {
            let reads = (0..8)
                .map(|_| grid.spawn(|grid: &Grid| grid.sum()))
                .collect::<Vec<_>>();
            let write = grid.spawn_after(|grid: &mut Grid| grid.scale(1.0), &reads);
            let more = (0..8)
                .map(|_| grid.spawn_after(|grid: &Grid| grid.sum(), &write))
                .collect::<Vec<_>>();
            black_box(threadsafe::results((&reads, &more)))
        })
    });
}

criterion_group!(
    benches,
    sync_read,
    sync_write,
    spawn_readers,
    spawn_mixed_graph
);
criterion_main!(benches);
