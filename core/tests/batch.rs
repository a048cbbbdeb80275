use std::fs;
use std::path::Path;

use ecgcore::analysis::PadLevel;
use ecgcore::batch::{self, Batch};
use ecgcore::log::silent_logger;
use ecgcore::mock::SyntheticEcg;
use ecgcore::storage::{self, Band, Fill, TrackingSheet};
use ecgcore::{Analysis, Parameters};

fn write_recording(dir: &Path, name: &str, ecg: &SyntheticEcg, seed: u64) {
    let text: String = ecg
        .generate(seed)
        .samples()
        .iter()
        .map(|s| format!("{},{}\n", s.time, s.voltage))
        .collect();
    fs::write(dir.join(name), text).unwrap();
}

fn batch() -> Batch {
    let params = Parameters {
        pad_level: PadLevel::Fixed(0.0),
        ..Parameters::default()
    };
    Batch::new(Analysis::new(params, silent_logger()), silent_logger()).unwrap()
}

#[test]
fn lists_only_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("test_data2.csv"), "0,0\n").unwrap();
    fs::write(dir.path().join("test_data1.csv"), "0,0\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    fs::create_dir(dir.path().join("plots.csv")).unwrap();

    let files = batch::csv_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["test_data1.csv", "test_data2.csv"]);
}

#[test]
fn serial_and_parallel_agree() {
    let dir = tempfile::tempdir().unwrap();
    let slow = SyntheticEcg::default();
    let fast = SyntheticEcg {
        bpm: 90.0,
        beats: 15,
        noise: 0.02,
        ..SyntheticEcg::default()
    };
    write_recording(dir.path(), "test_data1.csv", &slow, 1);
    write_recording(dir.path(), "test_data2.csv", &fast, 2);

    let files = batch::csv_files(dir.path()).unwrap();
    let batch = batch();
    let serial = batch.run_serial(&files, None);
    let parallel = batch.run_parallel(&files, None);

    assert_eq!(serial.len(), 2);
    for (a, b) in serial.iter().zip(parallel.iter()) {
        let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
        assert_eq!(a.path, b.path);
        assert_eq!(a.metrics, b.metrics);
    }

    let first = serial[0].as_ref().unwrap();
    assert_eq!(first.key, Some(1));
    assert_eq!(first.metrics.num_beats, slow.beats);
    let second = serial[1].as_ref().unwrap();
    assert_eq!(second.key, Some(2));
    assert_eq!(second.metrics.num_beats, fast.beats);
}

#[test]
fn one_bad_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_recording(dir.path(), "test_data1.csv", &SyntheticEcg::default(), 1);
    fs::write(
        dir.path().join("test_data2.csv"),
        "time,voltage\nx,y\n0.0,0.1\n0.1,zz\n",
    )
    .unwrap();

    let mut files = batch::csv_files(dir.path()).unwrap();
    files.push(dir.path().join("test_data3.csv"));

    let reports = batch().run_parallel(&files, Some((1.0, 4.0)));
    assert!(reports[0].is_ok());
    let sparse = reports[1].as_ref().unwrap();
    assert_eq!(sparse.dropped_rows, 3);
    assert_eq!(sparse.metrics.duration, 0.0);
    assert!(reports[2].is_err());
}

#[test]
fn reports_feed_json_and_tracking_sheet() {
    let dir = tempfile::tempdir().unwrap();
    write_recording(dir.path(), "test_data1.csv", &SyntheticEcg::default(), 5);
    let sheet_path = dir.path().join("Beat_Tracking.xlsx");
    let mut book = umya_spreadsheet::new_file();
    let worksheet = book.get_sheet_mut(&0).unwrap();
    worksheet.get_cell_mut("A2").set_value("data1");
    worksheet.get_cell_mut("B2").set_value("10");
    umya_spreadsheet::writer::xlsx::write(&book, &sheet_path).unwrap();

    let files = batch::csv_files(dir.path()).unwrap();
    let reports = batch().run_serial(&files, None);
    let report = reports[0].as_ref().unwrap();

    let json = storage::write_json(&report.path, &report.metrics).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
    assert_eq!(value["num_beats"], report.metrics.num_beats);

    let mut sheet = TrackingSheet::open(&sheet_path).unwrap();
    let band = sheet.annotate(report.key.unwrap(), report.metrics.num_beats, &silent_logger());
    assert_eq!(band, Band::Exact);
    sheet.save().unwrap();

    let reopened = TrackingSheet::open(&sheet_path).unwrap();
    assert_eq!(reopened.value("C2").as_deref(), Some("10"));
    assert_eq!(reopened.fill_argb("C2").as_deref(), Some(Fill::Green.argb()));
}
