mod common;

use colony_counter::batch::BatchRunner;
use colony_counter::{CancelToken, DetectionParams, NameResolver, SessionState};
use std::path::PathBuf;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_all_reports_each_image_and_keeps_going() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut paths: Vec<PathBuf> = (1..=3)
        .map(|sample| {
            common::write_plate(
                dir.path(),
                &format!("Day 2/{sample}_1st_dilution.png"),
                &common::plate(&common::ROUND_COLONIES[..sample]),
            )
        })
        .collect();
    paths.push(dir.path().join("Day 2/9_1st_dilution.png"));

    let mut seen = Vec::new();
    let report = BatchRunner::new(2)
        .open_all(
            paths,
            &DetectionParams::default(),
            &NameResolver::default(),
            &CancelToken::new(),
            |path, result| seen.push((path.to_path_buf(), result.is_ok())),
        )
        .await;

    assert_eq!(seen.len(), 4);
    assert_eq!(report.sessions.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].0.ends_with("9_1st_dilution.png"));

    let mut counts: Vec<(u32, usize)> = report
        .sessions
        .iter()
        .map(|s| (s.timepoint().unwrap().sample_number, s.total()))
        .collect();
    counts.sort();
    assert_eq!(counts, vec![(1, 1), (2, 2), (3, 3)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsegmentable_image_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let tiny = common::write_plate(
        dir.path(),
        "Day 1/1_1st.png",
        &image::RgbImage::from_pixel(2, 2, common::AGAR),
    );
    let plate = common::write_plate(
        dir.path(),
        "Day 1/2_1st.png",
        &common::plate(&common::ROUND_COLONIES),
    );

    let report = BatchRunner::default()
        .open_all(
            vec![tiny, plate],
            &DetectionParams::default(),
            &NameResolver::default(),
            &CancelToken::new(),
            |_, result| assert!(result.is_ok()),
        )
        .await;
    assert!(report.failures.is_empty());
    let mut counts: Vec<(u32, usize, bool)> = report
        .sessions
        .iter()
        .map(|s| {
            (
                s.timepoint().unwrap().sample_number,
                s.total(),
                s.segmentation().is_some(),
            )
        })
        .collect();
    counts.sort();
    assert_eq!(counts, vec![(1, 0, false), (2, 3, true)]);
}

#[tokio::test]
async fn cancelled_batch_starts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_plate(dir.path(), "1_1st.png", &common::plate(&[]));
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = BatchRunner::default()
        .open_all(
            vec![path],
            &DetectionParams::default(),
            &NameResolver::default(),
            &cancel,
            |_, _| panic!("no image should complete"),
        )
        .await;
    assert!(report.sessions.is_empty());
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn recount_all_applies_new_params() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_plate(
        dir.path(),
        "Day 1/1_3rd.png",
        &common::plate(&common::ROUND_COLONIES),
    );
    let runner = BatchRunner::default();
    let opened = runner
        .open_all(
            vec![path],
            &DetectionParams::default(),
            &NameResolver::default(),
            &CancelToken::new(),
            |_, _| {},
        )
        .await;
    assert_eq!(opened.sessions[0].total(), 3);

    let stricter = DetectionParams {
        min_area: 650.0,
        ..DetectionParams::default()
    };
    let mut done = 0;
    let report = runner
        .recount_all(opened.sessions, &stricter, &CancelToken::new(), |s| {
            assert_eq!(s.state(), SessionState::Detected);
            done += 1;
        })
        .await;
    assert_eq!(done, 1);
    assert_eq!(report.recounted, 1);
    assert_eq!(report.sessions[0].total(), 1);

    let cancel = CancelToken::new();
    cancel.cancel();
    let report = runner
        .recount_all(report.sessions, &DetectionParams::default(), &cancel, |_| {})
        .await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.sessions[0].total(), 1);
}
