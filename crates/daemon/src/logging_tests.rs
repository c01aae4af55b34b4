use super::*;
use tempfile::tempdir;

#[test]
fn level_directive_covers_the_whole_scale() {
    assert_eq!(level_directive(0), "off");
    assert_eq!(level_directive(2), "error");
    assert_eq!(level_directive(4), "warn");
    assert_eq!(level_directive(6), "info");
    assert_eq!(level_directive(8), "debug");
    assert_eq!(level_directive(9), "trace");
}

#[test]
fn build_layer_creates_the_log_directory() {
    let dir = tempdir().unwrap();
    let log_file = dir.path().join("nested").join("opsipxeconfd.log");
    let (_layer, _guard) = build_layer(&log_file, 5).unwrap();
    assert!(log_file.parent().unwrap().is_dir());
}
