use super::*;

#[test]
fn debug_is_redacted() {
    let c = Confidential::new("deadbeef".to_string());
    assert_eq!(format!("{c:?}"), "Confidential(***)");
}

#[test]
fn display_is_redacted() {
    let c = Confidential::new("deadbeef".to_string());
    assert_eq!(format!("{c}"), "***");
}

#[test]
fn expose_returns_raw_value() {
    let c = Confidential::new("deadbeef".to_string());
    assert_eq!(c.expose(), "deadbeef");
}

#[test]
fn into_inner_returns_raw_value() {
    let c = Confidential::new("deadbeef".to_string());
    assert_eq!(c.into_inner(), "deadbeef");
}
