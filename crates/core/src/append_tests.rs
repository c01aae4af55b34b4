use super::*;

#[test]
fn set_then_get() {
    let mut bag = AppendBag::new();
    bag.set("pckey", "deadbeef");
    assert_eq!(bag.get("pckey"), Some("deadbeef"));
    assert!(bag.contains("pckey"));
    assert_eq!(bag.get("missing"), None);
}

#[test]
fn bare_flag_has_empty_value() {
    let mut bag = AppendBag::new();
    bag.set("quiet", "");
    assert_eq!(bag.render_tokens(), "quiet");
}

#[test]
fn render_tokens_is_key_value_joined_by_space() {
    let mut bag = AppendBag::new();
    bag.set("a", "1");
    bag.set("b", "2");
    assert_eq!(bag.render_tokens(), "a=1 b=2");
}

#[test]
fn merge_over_caller_wins_and_preserves_first_appearance_order() {
    let mut defaults = AppendBag::new();
    defaults.set("a", "1");
    defaults.set("b", "2");

    let mut caller = AppendBag::new();
    caller.set("b", "9");
    caller.set("c", "3");

    defaults.merge_over(&caller);

    assert_eq!(defaults.render_tokens(), "a=1 b=9 c=3");
}

#[test]
fn set_overwriting_existing_key_keeps_its_position() {
    let mut bag = AppendBag::new();
    bag.set("a", "1");
    bag.set("b", "2");
    bag.set("a", "9");
    assert_eq!(bag.render_tokens(), "a=9 b=2");
}

#[test]
fn parse_tokens_splits_on_first_equals() {
    let bag = AppendBag::parse_tokens("initrd=opsi root=/dev/ram0 quiet");
    assert_eq!(bag.get("initrd"), Some("opsi"));
    assert_eq!(bag.get("root"), Some("/dev/ram0"));
    assert_eq!(bag.get("quiet"), Some(""));
    assert_eq!(bag.render_tokens(), "initrd=opsi root=/dev/ram0 quiet");
}

#[test]
fn parse_tokens_ignores_repeated_whitespace() {
    let bag = AppendBag::parse_tokens("  a=1    b=2  ");
    assert_eq!(bag.render_tokens(), "a=1 b=2");
}

#[test]
fn empty_bag_renders_empty_string() {
    assert_eq!(AppendBag::new().render_tokens(), "");
    assert!(AppendBag::new().is_empty());
}
