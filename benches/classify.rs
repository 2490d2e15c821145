use criterion::{criterion_group, criterion_main, Criterion};
use overlay_watch::classify::{ImeHints, WindowStateClassifier};
use overlay_watch::geometry::Rect;
use overlay_watch::settings::Settings;
use overlay_watch::snapshot::{WindowDescriptor, WindowKind, WindowSnapshot};

fn bench_classify(c: &mut Criterion) {
    let screen = Rect::of_size(1080, 2160);
    let mut windows: Vec<WindowDescriptor> = (0..50)
        .map(|i| {
            WindowDescriptor::new(
                WindowKind::Application,
                format!("com.example.app{i}"),
                Rect::new(0, 0, 1080, 2160 - (i % 7) * 10),
            )
            .with_title(format!("Window {i}"))
        })
        .collect();
    windows.push(WindowDescriptor::new(
        WindowKind::SystemOverlay,
        "com.android.systemui",
        Rect::new(0, 2064, 1080, 2160),
    ));

    let snapshot = WindowSnapshot::new(screen).with_windows(windows);
    let mut classifier = WindowStateClassifier::new(&Settings::default());

    c.bench_function("classify_50_windows", |b| {
        b.iter(|| classifier.classify(&snapshot, ImeHints::default()))
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
