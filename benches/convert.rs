use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Matrix4, Vector3};
use voxspace::{mni2xyz, xyz2mni, Affine};

fn oblique_affine() -> Matrix4<f64> {
    *Affine::from_rows([
        [-2.9, 0.3, 0.1, 92.4],
        [0.2, 2.8, -0.6, -121.7],
        [-0.1, 0.7, 2.9, -69.3],
        [0.0, 0.0, 0.0, 1.0],
    ])
    .matrix()
}

fn bench_converters(c: &mut Criterion) {
    let affine = oblique_affine();
    let voxel = Vector3::new(60.0, 27.0, 23.0);
    let mni = xyz2mni(&affine, &voxel);

    c.bench_function("xyz2mni", |b| {
        b.iter(|| xyz2mni(black_box(&affine), black_box(&voxel)))
    });
    c.bench_function("mni2xyz", |b| {
        b.iter(|| mni2xyz(black_box(&affine), black_box(&mni)))
    });
}

criterion_group!(benches, bench_converters);
criterion_main!(benches);
