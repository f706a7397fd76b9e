use std::fs;

use pretty_assertions::assert_eq;
use spydom_engine::{ensure_output_dir, ensure_target_dir, AtomicFileWriter, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("nested").join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("taken");
    fs::write(&file_path, "x").unwrap();

    let err = ensure_output_dir(&file_path).unwrap_err();
    assert!(matches!(err, PersistError::OutputDir(_)));
}

#[test]
fn target_dir_creation_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let first = ensure_target_dir(temp.path(), "https-a.example/b").unwrap();
    let second = ensure_target_dir(temp.path(), "https-a.example/b").unwrap();
    assert_eq!(first, second);
    assert!(first.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("title.txt", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "title.txt");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("title.txt", "world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn write_line_ends_with_exactly_one_newline() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("sub"));

    let path = writer.write_line("final-url.txt", "https://a.example/\n\n").unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "https://a.example/\n");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("screenshot.png", "data").is_err());
    assert!(!file_path.with_file_name("screenshot.png").exists());
}
