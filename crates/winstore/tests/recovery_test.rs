//! Integration tests for log replay on open.

use alopex_winstore::{LogStore, StepClock, StoreConfig, Timestamp, WinStoreError};
use chrono::{NaiveDate, TimeDelta};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn at(day: u32, h: u32, m: u32, s: u32) -> Timestamp {
    NaiveDate::from_ymd_opt(2000, 5, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn create_store(dir: &Path, start: Timestamp) -> LogStore {
    LogStore::new(StoreConfig::new(dir, "dataFile"))
        .with_clock(StepClock::new(start, TimeDelta::seconds(1)))
}

fn write_file(dir: &Path, name: &str, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_round_trip_across_day_boundary() {
    let temp_dir = TempDir::new().unwrap();

    let before = {
        let store = create_store(temp_dir.path(), at(15, 23, 59, 57));
        store.add_window("key1", "w", Duration::from_secs(10)).unwrap();
        store.add_window("key2", "w", Duration::from_secs(1)).unwrap();
        store.open().unwrap();

        for i in 1..=4 {
            store.update("key1", &i.to_string(), i as f64).unwrap();
            store.update("key2", &(i * 10).to_string(), (i * 10) as f64).unwrap();
        }
        assert_eq!(
            store.history_files(),
            vec!["dataFile_20000515.dat", "dataFile_20000516.dat"]
        );

        let snapshot = (
            store.get("key1").unwrap(),
            store.get("key2").unwrap(),
            store.window_average("key1", "w").unwrap(),
            store.window_count("key1", "w").unwrap(),
            store.window_average("key2", "w").unwrap(),
            store.window_count("key2", "w").unwrap(),
        );
        store.close().unwrap();
        snapshot
    };

    let store = create_store(temp_dir.path(), at(16, 8, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(10)).unwrap();
    store.add_window("key2", "w", Duration::from_secs(1)).unwrap();
    store.open().unwrap();

    let after = (
        store.get("key1").unwrap(),
        store.get("key2").unwrap(),
        store.window_average("key1", "w").unwrap(),
        store.window_count("key1", "w").unwrap(),
        store.window_average("key2", "w").unwrap(),
        store.window_count("key2", "w").unwrap(),
    );
    assert_eq!(after, before);
    assert_eq!(after.2, 2.5);
    assert_eq!(after.3, 4);
    assert_eq!(after.0.value, "4");
    assert_eq!(
        store.history_files(),
        vec!["dataFile_20000515.dat", "dataFile_20000516.dat"]
    );
}

#[test]
fn test_round_trip_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = create_store(temp_dir.path(), at(15, 12, 0, 0));
        store.add_window("key1", "w", Duration::from_secs(10)).unwrap();
        store.open().unwrap();
        store.close().unwrap();
    }

    let store = create_store(temp_dir.path(), at(17, 12, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(10)).unwrap();
    store.open().unwrap();

    assert_eq!(store.get("key1"), None);
    assert!(matches!(
        store.window_count("key1", "w"),
        Err(WinStoreError::NoWindowData)
    ));
    // The existing file is adopted rather than creating one for today.
    assert_eq!(store.history_files(), vec!["dataFile_20000515.dat"]);
}

#[test]
fn test_corrupt_lines_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        temp_dir.path(),
        "dataFile_20000515.dat",
        &[
            "20000515122456.000000000|U|key1|1",
            "garbage",
            "20000515122457.000000000|X|key1|5",
            "2000051512245.000000000|U|key1|5",
            "19990515122457.000000000|U|key1|5",
            "20000515122458.000000000|U|k|5",
            "20000515122459.000000000|U|key1|3",
        ],
    );
    write_file(temp_dir.path(), "dataFile_backup.txt", &["garbage"]);
    write_file(
        temp_dir.path(),
        "other_20000516.dat",
        &["20000516122459.000000000|U|key1|100"],
    );

    let store = create_store(temp_dir.path(), at(15, 13, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();

    assert_eq!(store.window_count("key1", "w").unwrap(), 2);
    assert_eq!(store.window_average("key1", "w").unwrap(), 2.0);
    assert_eq!(store.get("key1").unwrap().value, "3");
    assert_eq!(store.history_files(), vec!["dataFile_20000515.dat"]);

    store.update("key1", "7", 7.0).unwrap();
    store.close().unwrap();

    let content = fs::read_to_string(temp_dir.path().join("dataFile_20000515.dat")).unwrap();
    assert!(content.ends_with(
        "20000515122459.000000000|U|key1|3\n20000515130000.000000000|U|key1|7\n"
    ));
}

#[test]
fn test_out_of_sequence_records_skipped() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        temp_dir.path(),
        "dataFile_20000515.dat",
        &[
            "20000515122458.000000000|U|key1|10",
            "20000515122456.000000000|U|key1|99",
            "20000515122459.000000000|U|key1|20",
            "20000515122456.000000000|U|key2|1",
            "20000515122456.000000000|U|key2|3",
        ],
    );

    let store = create_store(temp_dir.path(), at(15, 13, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.add_window("key2", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();

    assert_eq!(store.window_count("key1", "w").unwrap(), 2);
    assert_eq!(store.window_average("key1", "w").unwrap(), 15.0);
    assert_eq!(store.get("key1").unwrap().value, "20");

    // Equal timestamps are in sequence.
    assert_eq!(store.window_count("key2", "w").unwrap(), 2);
    assert_eq!(store.get("key2").unwrap().value, "3");
}

#[test]
fn test_live_update_out_of_sequence() {
    let temp_dir = TempDir::new().unwrap();
    let clock = std::sync::Arc::new(StepClock::new(at(15, 12, 0, 0), TimeDelta::seconds(1)));
    let store = LogStore::new(StoreConfig::new(temp_dir.path(), "dataFile"))
        .with_clock(std::sync::Arc::clone(&clock));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();

    store.update("key1", "10", 10.0).unwrap();
    clock.set(at(15, 11, 0, 0));
    assert!(matches!(
        store.update("key1", "99", 99.0),
        Err(WinStoreError::OutOfSequence(_))
    ));

    assert_eq!(store.get("key1").unwrap().value, "10");
    assert_eq!(store.window_count("key1", "w").unwrap(), 1);

    let content = fs::read_to_string(temp_dir.path().join("dataFile_20000515.dat")).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn test_delete_then_update_survives_replay() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = create_store(temp_dir.path(), at(15, 12, 0, 0));
        store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
        store.open().unwrap();

        store.update("key1", "1", 1.0).unwrap();
        store.update("key1", "2", 2.0).unwrap();
        store.delete("key1").unwrap();

        assert_eq!(store.get("key1"), None);
        assert!(matches!(
            store.window_count("key1", "w"),
            Err(WinStoreError::NoWindowData)
        ));

        store.update("key1", "5", 5.0).unwrap();
        assert_eq!(store.window_count("key1", "w").unwrap(), 1);
        assert_eq!(store.window_average("key1", "w").unwrap(), 5.0);
        store.close().unwrap();
    }

    let store = create_store(temp_dir.path(), at(15, 13, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();

    assert_eq!(store.get("key1").unwrap().value, "5");
    assert_eq!(store.window_count("key1", "w").unwrap(), 1);
    assert_eq!(store.window_average("key1", "w").unwrap(), 5.0);
}

#[test]
fn test_reopen_does_not_double_apply() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_store(temp_dir.path(), at(15, 12, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();
    store.update("key1", "1", 1.0).unwrap();
    store.update("key1", "3", 3.0).unwrap();
    store.close().unwrap();

    assert!(!store.is_open());
    store.open().unwrap();
    assert_eq!(store.window_count("key1", "w").unwrap(), 2);
    assert_eq!(store.window_average("key1", "w").unwrap(), 2.0);
}

#[test]
fn test_non_numeric_values_replay_without_samples() {
    let temp_dir = TempDir::new().unwrap();
    write_file(
        temp_dir.path(),
        "dataFile_20000515.dat",
        &[
            "20000515122456.000000000|U|key1|4",
            "20000515122457.000000000|U|key1|not a number",
        ],
    );

    let store = create_store(temp_dir.path(), at(15, 13, 0, 0));
    store.add_window("key1", "w", Duration::from_secs(60)).unwrap();
    store.open().unwrap();

    assert_eq!(store.get("key1").unwrap().value, "not a number");
    assert_eq!(store.window_count("key1", "w").unwrap(), 1);
    assert_eq!(store.window_average("key1", "w").unwrap(), 4.0);
}
