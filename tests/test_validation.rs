//! Integration test: Raw batch validation and sentinel quoting

use kolosal_pipeline::config::RunConfig;
use kolosal_pipeline::error::PipelineError;
use kolosal_pipeline::transform::QuotingTransformer;
use kolosal_pipeline::validation::{RawBatchValidator, ValidationFailure, Verdict};
use std::fs;
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"{
    "LengthOfDateStampInFile": 8,
    "LengthOfTimeStampInFile": 6,
    "NumberofColumns": 3,
    "ColName": {"a": "FLOAT", "b": "FLOAT", "Result": "INTEGER"}
}"#;

fn setup(root: &Path) -> (RunConfig, PathBuf) {
    let run = RunConfig {
        schema_file: root.join("schema.json"),
        raw_batch_dir: root.join("raw"),
        good_dir: root.join("validated").join("good"),
        bad_dir: root.join("validated").join("bad"),
        collection: "train".to_string(),
        export_csv_file: root.join("export.csv"),
    };
    let regex_file = root.join("regex.txt");
    fs::write(&run.schema_file, SCHEMA).unwrap();
    fs::write(&regex_file, "batch_[0-9]+_[0-9]+\\.csv").unwrap();
    fs::create_dir_all(&run.raw_batch_dir).unwrap();
    (run, regex_file)
}

fn raw(run: &RunConfig, name: &str, content: &str) {
    fs::write(run.raw_batch_dir.join(name), content).unwrap();
}

fn exists_in(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

#[test]
fn test_every_file_lands_in_exactly_one_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());

    let names = [
        "batch_20230101_120000.csv",
        "batch_2023_12.csv",
        "batch_20230101_1200.csv",
        "other_20230101_120000.csv",
        "batch_20230102_120000.csv",
        "batch_20230103_120000.csv",
    ];
    raw(&run, names[0], "a,b,Result\n1,2,1\n3,4,0\n");
    raw(&run, names[1], "a,b,Result\n1,2,1\n");
    raw(&run, names[2], "a,b,Result\n1,2,1\n");
    raw(&run, names[3], "a,b,Result\n1,2,1\n");
    raw(&run, names[4], "a,b\n1,2\n");
    raw(&run, names[5], "a,b,Result\n1,,1\n2,,0\n");

    let report = RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();

    for name in names {
        let good = exists_in(&run.good_dir, name);
        let bad = exists_in(&run.bad_dir, name);
        assert!(good ^ bad, "{} good={} bad={}", name, good, bad);
        assert_eq!(report.verdict_for(name).map(Verdict::is_good), Some(good));
    }
    assert_eq!(report.good_files(), vec!["batch_20230101_120000.csv"]);
}

#[test]
fn test_filename_verdicts() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());
    raw(&run, "batch_20230101_120000.csv", "a,b,Result\n1,2,1\n");
    raw(&run, "batch_2023_12.csv", "a,b,Result\n1,2,1\n");

    let report = RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();
    assert_eq!(report.verdict_for("batch_20230101_120000.csv"), Some(&Verdict::Good));
    assert_eq!(
        report.verdict_for("batch_2023_12.csv"),
        Some(&Verdict::Bad(ValidationFailure::DateStampLength { expected: 8, actual: 4 }))
    );
}

#[test]
fn test_wrong_column_count_moves_to_bad() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());
    let name = "batch_20230101_120000.csv";
    raw(&run, name, "a,b,c,Result\n1,2,3,1\n");

    let report = RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();
    assert!(!exists_in(&run.good_dir, name));
    assert!(exists_in(&run.bad_dir, name));
    assert_eq!(
        report.verdict_for(name),
        Some(&Verdict::Bad(ValidationFailure::ColumnCount { expected: 3, actual: 4 }))
    );
}

#[test]
fn test_partially_null_column_stays_good() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());
    let name = "batch_20230101_120000.csv";
    raw(&run, name, "a,b,Result\n1,,1\n2,5,0\n3,,1\n");

    let report = RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();
    assert_eq!(report.verdict_for(name), Some(&Verdict::Good));

    let content = fs::read_to_string(run.good_dir.join(name)).unwrap();
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn test_passing_file_is_rewritten_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());
    let name = "batch_20230101_120000.csv";
    raw(&run, name, "a,b,Result\n1.50,2,1\n2.25,4,0\n");

    let report = RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();
    assert_eq!(report.verdict_for(name), Some(&Verdict::Good));

    let content = fs::read_to_string(run.good_dir.join(name)).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["a,b,Result", "1.5,2,1", "2.25,4,0"]);

    // The raw intake copy is untouched
    let raw_content = fs::read_to_string(run.raw_batch_dir.join(name)).unwrap();
    assert!(raw_content.contains("1.50"));
}

#[test]
fn test_missing_regex_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let (run, _) = setup(dir.path());
    let missing = dir.path().join("no_such_regex.txt");

    let validator = RawBatchValidator::new(&run, &missing);
    assert!(matches!(validator.get_naming_regex(), Err(PipelineError::ConfigError(_))));
    assert!(matches!(validator.validate_all(), Err(PipelineError::ConfigError(_))));
}

#[test]
fn test_quoting_twice_equals_quoting_once() {
    let dir = tempfile::tempdir().unwrap();
    let (run, regex_file) = setup(dir.path());
    let name = "batch_20230101_120000.csv";
    raw(&run, name, "a,b,Result\n1,?,1\n?,5,0\n3,4,1\n");
    RawBatchValidator::new(&run, &regex_file).validate_all().unwrap();

    let transformer = QuotingTransformer::new(&run, "?");
    transformer.quote_sentinels().unwrap();
    let once = fs::read_to_string(run.good_dir.join(name)).unwrap();
    transformer.quote_sentinels().unwrap();
    let twice = fs::read_to_string(run.good_dir.join(name)).unwrap();

    assert_eq!(once, twice);
    assert!(once.contains("'?'"));
}
