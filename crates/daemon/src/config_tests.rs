use super::*;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), contents).unwrap();
    file
}

#[test]
fn parses_recognised_keys_and_ignores_comments() {
    let file = write_config(
        "# a comment\n\
         ; also a comment\n\
         \n\
         pxe config dir = /tftpboot/pxelinux.cfg\n\
         pxe config template = /tftpboot/pxelinux.cfg/install\n\
         max control connections = 8\n\
         max pxe config writers = 50\n\
         log level = 6\n\
         depot id = depot1.example.org\n",
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.pxe_config_dir, PathBuf::from("/tftpboot/pxelinux.cfg"));
    assert_eq!(config.pxe_config_template, PathBuf::from("/tftpboot/pxelinux.cfg/install"));
    assert_eq!(config.max_control_connections, 8);
    assert_eq!(config.max_pxe_config_writers, 50);
    assert_eq!(config.log_level, 6);
    assert_eq!(config.depot_id, "depot1.example.org");
    // Untouched keys keep their defaults.
    assert_eq!(config.pid_file, PathBuf::from(DEFAULT_PID_FILE));
}

#[test]
fn unrecognised_key_is_ignored_not_fatal() {
    let file = write_config("some unknown key = whatever\npxe config dir = /tftpboot\n");
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.pxe_config_dir, PathBuf::from("/tftpboot"));
}

#[test]
fn non_integer_value_for_int_key_is_an_error() {
    let file = write_config("log level = not-a-number\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotAnInteger { .. }));
}

#[test]
fn malformed_line_without_equals_is_an_error() {
    let file = write_config("this has no equals sign\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed { .. }));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load(Path::new("/nonexistent/opsipxeconfd.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn reload_preserves_pid_file_but_takes_everything_else() {
    let mut running = Config { pid_file: PathBuf::from("/var/run/original.pid"), ..Config::default() };
    let file = write_config("pid file = /var/run/new.pid\nlog level = 9\n");
    let reloaded = Config::load(file.path()).unwrap();

    running.apply_reloadable(reloaded);
    assert_eq!(running.pid_file, PathBuf::from("/var/run/original.pid"));
    assert_eq!(running.log_level, 9);
}
