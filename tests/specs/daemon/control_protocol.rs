//! `spec.md` §7 error kind 7 ("control parse") and §4.F: malformed
//! commands get an `(ERROR)` reply and the server keeps running for the
//! next connection.

use crate::prelude::*;
use pxe_core::BootAction;

#[tokio::test]
async fn unknown_command_is_an_error_reply_and_the_server_survives() {
    let daemon = Daemon::start("").await;

    let reply = daemon.send("frobnicate").await;
    assert!(reply.starts_with("(ERROR)"), "reply: {reply:?}");
    assert!(reply.contains("unknown command"), "reply: {reply:?}");

    // The server must still be answering after a malformed request.
    let status = daemon.send("status").await;
    assert!(!status.starts_with("(ERROR)"), "status: {status:?}");

    daemon.stop().await;
}

#[tokio::test]
async fn update_with_no_host_id_is_an_error_reply() {
    let daemon = Daemon::start("").await;

    let reply = daemon.send("update").await;
    assert!(reply.starts_with("(ERROR)"), "reply: {reply:?}");
    assert!(reply.contains("hostId"), "reply: {reply:?}");

    daemon.stop().await;
}

#[tokio::test]
async fn update_for_a_host_with_no_pending_actions_succeeds_without_a_fifo() {
    let daemon = Daemon::start("").await;
    // A host the backend knows nothing about has no pending netboot
    // actions, so the updater's short-circuit at step 3 applies.
    let reply = daemon.send("update ghost.example.org").await;
    assert_eq!(reply, "Boot configuration updated");
    assert_eq!(daemon.backend().updates().len(), 0);

    daemon.stop().await;
}

#[tokio::test]
async fn host_with_no_mac_or_ipv4_is_a_no_address_error() {
    let daemon = Daemon::start("").await;
    let host = pxe_core::HostId::new("noaddr.example.org");
    daemon.backend().seed_host(host.clone(), pxe_core::HostRecord::default());
    daemon.backend().seed_netboot_actions(
        host.clone(),
        vec![pxe_core::ProductOnClient::new(host.clone(), pxe_core::ProductId::new("win10"), BootAction::Setup)],
    );
    daemon.backend().seed_products_on_depot(
        "depot1.example.org",
        vec![pxe_core::ProductOnDepot { product_id: pxe_core::ProductId::new("win10"), product_version: "1.0".to_string(), package_version: "1".to_string() }],
    );

    let reply = daemon.send("update noaddr.example.org").await;
    assert!(reply.starts_with("(ERROR)"), "reply: {reply:?}");
    assert!(reply.contains("no address"), "reply: {reply:?}");

    daemon.stop().await;
}
