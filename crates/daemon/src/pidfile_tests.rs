use super::*;
use tempfile::tempdir;

#[test]
fn acquire_writes_current_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("opsipxeconfd.pid");
    acquire(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), std::process::id());
}

#[test]
fn acquire_rejects_a_live_process() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("opsipxeconfd.pid");
    std::fs::write(&path, format!("{}\n", std::process::id())).unwrap();
    let err = acquire(&path).unwrap_err();
    assert!(matches!(err, PidFileError::AlreadyRunning(pid) if pid == std::process::id() as i32));
}

#[test]
fn acquire_overwrites_a_stale_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("opsipxeconfd.pid");
    // PID 1 is owned by the init system and never equals our own pid, but a
    // pid this large is extremely unlikely to be live in a test sandbox.
    std::fs::write(&path, "2147483000\n").unwrap();
    acquire(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), std::process::id());
}

#[test]
fn release_removes_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("opsipxeconfd.pid");
    acquire(&path).unwrap();
    release(&path);
    assert!(!path.exists());
}

#[test]
fn release_on_a_missing_file_is_a_no_op() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.pid");
    release(&path);
}
