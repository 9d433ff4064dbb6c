use labelscope::catalog::{CatalogOptions, SplitName};
use labelscope::schema::AnnotationSchema;
use labelscope::stats::{analyze_root, AnalyzeOptions, CancelToken, ProgressHook, QualityScope};

mod common;

use common::DatasetBuilder;

fn cat_dog() -> CatalogOptions {
    CatalogOptions {
        classes: Some(vec!["cat".to_string(), "dog".to_string()]),
    }
}

#[test]
fn end_to_end_counts_and_areas() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path()).pair(
        "train",
        "img_1",
        &["0 0.5 0.5 0.4 0.4", "1 0.2 0.2 0.1 0.1"],
    );

    let opts = AnalyzeOptions {
        quality: QualityScope::All,
        ..Default::default()
    };
    let analysis = analyze_root(temp.path(), &cat_dog(), &opts).expect("analyze");
    let stats = &analysis.stats;

    assert_eq!(stats.schema, AnnotationSchema::BoundingBox);
    assert_eq!(stats.total_images, 1);
    assert_eq!(stats.total_labels, 2);
    assert_eq!(stats.count_for("cat"), Some(1));
    assert_eq!(stats.count_for("dog"), Some(1));
    assert_eq!(stats.avg_labels_per_image, 2.0);
    assert!(!stats.cancelled);

    assert_eq!(analysis.images.len(), 1);
    let record = &analysis.images[0];
    assert_eq!(record.image, "img_1.png");
    assert!(record.readable);
    assert!((record.avg_label_area - 0.085).abs() < 1e-9);

    let quality = stats.quality.as_ref().expect("quality summary");
    assert_eq!(quality.measured, 1);
    assert_eq!(quality.unreadable_images, 0);
}

#[test]
fn empty_dataset_yields_zeros() {
    let temp = tempfile::tempdir().expect("create temp dir");

    let analysis =
        analyze_root(temp.path(), &cat_dog(), &AnalyzeOptions::default()).expect("analyze");
    let stats = analysis.stats;

    assert!(stats.splits.is_empty());
    assert_eq!(stats.total_images, 0);
    assert_eq!(stats.total_labels, 0);
    assert_eq!(stats.avg_labels_per_image, 0.0);
    assert_eq!(stats.count_for("cat"), Some(0));
    assert_eq!(stats.count_for("dog"), Some(0));
    assert!(stats.quality.is_none());
}

#[test]
fn empty_split_directories_yield_zeros() {
    let temp = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir_all(temp.path().join("train/images")).expect("create images dir");
    std::fs::create_dir_all(temp.path().join("train/labels")).expect("create labels dir");

    let stats = analyze_root(temp.path(), &cat_dog(), &AnalyzeOptions::default())
        .expect("analyze")
        .stats;

    assert_eq!(stats.splits.len(), 1);
    assert_eq!(stats.images_in(SplitName::Train), Some(0));
    assert_eq!(stats.splits[0].labels, 0);
    assert_eq!(stats.total_images, 0);
    assert_eq!(stats.total_labels, 0);
    assert_eq!(stats.avg_labels_per_image, 0.0);
    assert!(stats.labels_per_class.iter().all(|c| c.count == 0));
    assert!(!stats.cancelled);
}

#[test]
fn missing_root_is_an_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let result = analyze_root(
        &temp.path().join("nope"),
        &cat_dog(),
        &AnalyzeOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn malformed_line_is_skipped() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut lines = vec!["0 0.5 0.5 0.2 0.2"; 9];
    lines.insert(4, "0 0.5 abc 0.2 0.2");
    DatasetBuilder::new(temp.path()).pair("train", "a", &lines);

    let stats = analyze_root(temp.path(), &cat_dog(), &AnalyzeOptions::default())
        .expect("analyze")
        .stats;

    assert_eq!(stats.total_labels, 9);
    assert_eq!(stats.skipped.malformed_lines, 1);
}

#[test]
fn out_of_range_and_degenerate_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path()).pair(
        "train",
        "a",
        &[
            "0 0.5 0.5 0.2 0.2",
            "7 0.5 0.5 0.2 0.2",
            "-1 0.5 0.5 0.2 0.2",
            "1 0.5 0.5 0.0 0.2",
        ],
    );

    let opts = AnalyzeOptions {
        quality: QualityScope::Split(SplitName::Train),
        ..Default::default()
    };
    let analysis = analyze_root(temp.path(), &cat_dog(), &opts).expect("analyze");
    let stats = &analysis.stats;

    assert_eq!(stats.skipped.out_of_range_labels, 2);
    assert_eq!(stats.skipped.degenerate_labels, 1);
    assert_eq!(stats.total_labels, 2);
    assert_eq!(stats.count_for("dog"), Some(1));

    // The degenerate box counts as a label but not as a size.
    assert_eq!(analysis.images[0].label_areas.len(), 1);
    assert!((analysis.images[0].avg_label_area - 0.04).abs() < 1e-9);
}

#[test]
fn class_counts_sum_to_total_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let builder = DatasetBuilder::new(temp.path());
    builder
        .pair("train", "a", &["0 0.5 0.5 0.2 0.2", "1 0.5 0.5 0.2 0.2"])
        .pair("train", "b", &["1 0.5 0.5 0.2 0.2"])
        .pair("valid", "c", &["0 0.5 0.5 0.2 0.2", "bad line"])
        .pair("test", "d", &[]);

    let stats = analyze_root(temp.path(), &cat_dog(), &AnalyzeOptions::default())
        .expect("analyze")
        .stats;

    let per_class: usize = stats.labels_per_class.iter().map(|c| c.count).sum();
    assert_eq!(per_class, stats.total_labels);
    assert_eq!(stats.total_labels, 4);
    assert_eq!(stats.total_images, 4);

    let names: Vec<SplitName> = stats.splits.iter().map(|s| s.name).collect();
    assert_eq!(names, vec![SplitName::Train, SplitName::Val, SplitName::Test]);
    assert_eq!(stats.images_in(SplitName::Val), Some(1));
    assert_eq!(stats.splits[1].dir_name, "valid");
}

#[test]
fn repeated_runs_are_identical() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let builder = DatasetBuilder::new(temp.path());
    for i in 0..6 {
        builder.pair(
            "train",
            &format!("img_{i}"),
            &["0 0.5 0.5 0.2 0.2", "1 0.3 0.3 0.1 0.4"],
        );
    }

    let opts = AnalyzeOptions {
        quality: QualityScope::All,
        quality_sample: Some(3),
        seed: 11,
        ..Default::default()
    };

    let first = analyze_root(temp.path(), &cat_dog(), &opts).expect("first run");
    let second = analyze_root(temp.path(), &cat_dog(), &opts).expect("second run");

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.stats).expect("serialize"),
        serde_json::to_string(&second.stats).expect("serialize")
    );
    assert_eq!(first.images.len(), 3);
}

#[test]
fn parallel_matches_sequential() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let builder = DatasetBuilder::new(temp.path());
    for i in 0..12 {
        let class = if i % 3 == 0 { "1" } else { "0" };
        let line = format!("{class} 0.5 0.5 0.{} 0.2", i % 9 + 1);
        builder.pair("train", &format!("img_{i:02}"), &[line.as_str()]);
    }
    builder.broken_image("train", "img_99.jpg");
    builder.label("train", "img_99", &["0 0.5 0.5 0.2 0.2"]);

    let sequential = AnalyzeOptions {
        quality: QualityScope::All,
        ..Default::default()
    };
    let parallel = AnalyzeOptions {
        parallel: true,
        ..sequential.clone()
    };

    let a = analyze_root(temp.path(), &cat_dog(), &sequential).expect("sequential");
    let b = analyze_root(temp.path(), &cat_dog(), &parallel).expect("parallel");
    assert_eq!(a, b);
}

#[test]
fn unreadable_image_is_counted() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path())
        .pair("train", "good", &["0 0.5 0.5 0.2 0.2"])
        .broken_image("train", "broken.jpg")
        .label("train", "broken", &["1 0.5 0.5 0.2 0.2"]);

    let opts = AnalyzeOptions {
        quality: QualityScope::All,
        ..Default::default()
    };
    let analysis = analyze_root(temp.path(), &cat_dog(), &opts).expect("analyze");

    // Labels of an undecodable image still count.
    assert_eq!(analysis.stats.total_labels, 2);
    let quality = analysis.stats.quality.expect("quality summary");
    assert_eq!(quality.measured, 2);
    assert_eq!(quality.unreadable_images, 1);

    let broken = analysis
        .images
        .iter()
        .find(|r| r.image == "broken.jpg")
        .expect("broken record");
    assert!(!broken.readable);
    assert_eq!(broken.blur_score, 0.0);
    assert_eq!(broken.brightness, 0.0);
}

#[test]
fn cancelled_run_is_flagged() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path()).pair("train", "a", &["0 0.5 0.5 0.2 0.2"]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let opts = AnalyzeOptions {
        cancel,
        ..Default::default()
    };

    let stats = analyze_root(temp.path(), &cat_dog(), &opts)
        .expect("analyze")
        .stats;
    assert!(stats.cancelled);
    assert_eq!(stats.total_images, 0);
}

/// Options whose token is cancelled once `files` files have been folded.
fn cancel_after(files: usize, parallel: bool) -> AnalyzeOptions {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    AnalyzeOptions {
        parallel,
        cancel,
        progress: Some(ProgressHook::new(move |done| {
            if done >= files {
                trigger.cancel();
            }
        })),
        ..Default::default()
    }
}

fn two_split_dataset(root: &std::path::Path) {
    let builder = DatasetBuilder::new(root);
    for i in 0..3 {
        builder.pair("train", &format!("t_{i}"), &["0 0.5 0.5 0.2 0.2"]);
        builder.pair("val", &format!("v_{i}"), &["1 0.5 0.5 0.2 0.2"]);
    }
}

#[test]
fn sequential_cancellation_keeps_finished_files() {
    let temp = tempfile::tempdir().expect("create temp dir");
    two_split_dataset(temp.path());

    let stats = analyze_root(temp.path(), &cat_dog(), &cancel_after(2, false))
        .expect("analyze")
        .stats;

    assert!(stats.cancelled);
    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.total_labels, 2);
    assert_eq!(stats.count_for("cat"), Some(2));
    assert_eq!(stats.count_for("dog"), Some(0));
    assert_eq!(stats.splits.len(), 1);
    assert_eq!(stats.images_in(SplitName::Train), Some(2));
}

#[test]
fn parallel_cancellation_keeps_finished_files() {
    let temp = tempfile::tempdir().expect("create temp dir");
    two_split_dataset(temp.path());

    let stats = analyze_root(temp.path(), &cat_dog(), &cancel_after(2, true))
        .expect("analyze")
        .stats;

    // Outcomes already computed for the split are folded; the next split never starts.
    assert!(stats.cancelled);
    assert!(stats.total_images > 0 && stats.total_images < 6);
    assert_eq!(stats.images_in(SplitName::Val), None);
    let per_class: usize = stats.labels_per_class.iter().map(|c| c.count).sum();
    assert_eq!(per_class, stats.total_labels);
}

#[test]
fn progress_hook_sees_every_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    two_split_dataset(temp.path());

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let opts = AnalyzeOptions {
        progress: Some(ProgressHook::new(move |done| {
            sink.lock().expect("lock").push(done);
        })),
        ..Default::default()
    };

    analyze_root(temp.path(), &cat_dog(), &opts).expect("analyze");
    assert_eq!(*seen.lock().expect("lock"), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn polygon_dataset() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path()).pair(
        "train",
        "a",
        &["0 0.1 0.1 0.5 0.1 0.5 0.5 0.1 0.5", "1 0.2 0.2 0.4 0.2 0.3 0.5"],
    );

    let opts = AnalyzeOptions {
        quality: QualityScope::All,
        ..Default::default()
    };
    let analysis = analyze_root(temp.path(), &cat_dog(), &opts).expect("analyze");

    assert_eq!(analysis.stats.schema, AnnotationSchema::Polygon);
    assert_eq!(analysis.stats.total_labels, 2);
    let areas = &analysis.images[0].label_areas;
    assert!((areas[0] - 0.16).abs() < 1e-9);
    assert!((areas[1] - 0.03).abs() < 1e-9);
}

#[test]
fn class_names_from_data_yaml() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path())
        .data_yaml("names: [person, car, bike]\n")
        .pair("train", "a", &["2 0.5 0.5 0.2 0.2"]);

    let stats = analyze_root(
        temp.path(),
        &CatalogOptions::default(),
        &AnalyzeOptions::default(),
    )
    .expect("analyze")
    .stats;

    let names: Vec<&str> = stats
        .labels_per_class
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(names, vec!["person", "car", "bike"]);
    assert_eq!(stats.count_for("bike"), Some(1));
    assert_eq!(stats.count_for("person"), Some(0));
}

#[test]
fn text_report_renders() {
    let temp = tempfile::tempdir().expect("create temp dir");
    DatasetBuilder::new(temp.path()).pair("train", "a", &["0 0.5 0.5 0.2 0.2"]);

    let stats = analyze_root(temp.path(), &cat_dog(), &AnalyzeOptions::default())
        .expect("analyze")
        .stats;
    let text = stats.to_string();

    assert!(text.contains("Dataset Annotation Report"));
    assert!(text.contains("cat"));
    assert!(text.contains("Nothing skipped"));
}
