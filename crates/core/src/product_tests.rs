use super::*;
use crate::BootAction;

#[test]
fn new_starts_with_empty_versions_and_progress() {
    let host = HostId::canonicalize("h1.example.org").unwrap();
    let poc = ProductOnClient::new(host.clone(), ProductId::new("win10"), BootAction::Setup);
    assert_eq!(poc.host_id, host);
    assert_eq!(poc.product_id, ProductId::new("win10"));
    assert_eq!(poc.product_version, "");
    assert_eq!(poc.package_version, "");
    assert_eq!(poc.action_request, BootAction::Setup);
    assert_eq!(poc.action_progress, "");
}
