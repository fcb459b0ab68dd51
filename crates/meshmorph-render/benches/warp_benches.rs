use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meshmorph_core::lattice::{Lattice, LatticeResolution};
use meshmorph_core::mesh::Mesh;
use meshmorph_core::{FrameBuffer, PixelFormat, Point};
use meshmorph_render::{compose_frame, warp_mesh, FrameMeshes};

fn gradient(width: u32, height: u32) -> FrameBuffer {
    let mut fb = FrameBuffer::new(width, height, PixelFormat::Rgba8);
    for y in 0..height {
        for x in 0..width {
            fb.set_pixel(x, y, [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255]);
        }
    }
    fb
}

// 600x400 with a dense lattice and a handful of moved points.
fn edited_lattices() -> (Lattice, Lattice) {
    let start = Lattice::new(600, 400, LatticeResolution::Ten);
    let mut end = start.clone();
    for (i, j) in [(2, 2), (4, 6), (7, 3)] {
        let p = end.point(i, j);
        end.set_point(i, j, Point::new(p.x + 8, p.y - 6)).unwrap();
    }
    (start, end)
}

fn bench_warp_mesh(c: &mut Criterion) {
    let image = gradient(600, 400);
    let (start, end) = edited_lattices();
    let src_mesh = Mesh::build(&start);
    let mid = Mesh::build(&Lattice::interpolate(&start, &end, 0.5).unwrap());

    c.bench_function("warp_mesh_600x400_n10", |b| {
        b.iter(|| warp_mesh(black_box(&image), &src_mesh, &mid, 0.5).unwrap())
    });
}

fn bench_compose_frame(c: &mut Criterion) {
    let start_image = gradient(600, 400);
    let end_image = gradient(600, 400);
    let (start, end) = edited_lattices();
    let start_mesh = Mesh::build(&start);
    let end_mesh = Mesh::build(&end);
    let mid = Mesh::build(&Lattice::interpolate(&start, &end, 0.5).unwrap());

    let mut group = c.benchmark_group("compose");
    group.sample_size(20);
    group.bench_function("compose_frame_600x400_n10", |b| {
        b.iter(|| {
            compose_frame(
                black_box(&start_image),
                black_box(&end_image),
                FrameMeshes {
                    start: &start_mesh,
                    end: &end_mesh,
                    intermediate: &mid,
                },
                0.5,
            )
            .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_warp_mesh, bench_compose_frame);
criterion_main!(benches);
