//! `spec.md` §8 end-to-end scenario 5: `status` reports one row per
//! active writer, each naming its host, while a reader is still pending.

use crate::prelude::*;
use pxe_core::BootAction;

#[tokio::test]
async fn status_lists_every_pending_writer() {
    let daemon = Daemon::start("").await;
    seed_basic_host(
        daemon.backend(),
        "h4.example.org",
        "00:11:22:33:44:88",
        "aaaaaaaa",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );
    seed_basic_host(
        daemon.backend(),
        "h5.example.org",
        "00:11:22:33:44:99",
        "bbbbbbbb",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );

    assert_eq!(daemon.send("update h4.example.org").await, "Boot configuration updated");
    assert_eq!(daemon.send("update h5.example.org").await, "Boot configuration updated");

    wait_for(MAX_WAIT_MS, || {
        daemon.pxe_dir().join("01-00-11-22-33-44-88").exists() && daemon.pxe_dir().join("01-00-11-22-33-44-99").exists()
    })
    .await;

    let status = daemon.send("status").await;
    assert!(status.contains("2 active boot config writer(s)"), "status: {status:?}");
    assert!(status.contains("Boot config for client h4.example.org"), "status: {status:?}");
    assert!(status.contains("Boot config for client h5.example.org"), "status: {status:?}");
    // The confidential host key must never appear in plaintext.
    assert!(!status.contains("aaaaaaaa"), "status: {status:?}");
    assert!(!status.contains("bbbbbbbb"), "status: {status:?}");
    assert!(status.contains("pckey=***"), "status: {status:?}");

    read_fifo_once(daemon.pxe_dir().join("01-00-11-22-33-44-88")).await;
    read_fifo_once(daemon.pxe_dir().join("01-00-11-22-33-44-99")).await;

    daemon.stop().await;
}
