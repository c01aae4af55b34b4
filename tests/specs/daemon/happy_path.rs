//! `spec.md` §8 end-to-end scenario 1: a single host with one pending
//! netboot action gets a FIFO whose rendered `append` line carries the
//! derived tokens, and the backend is told the client read it.

use crate::prelude::*;
use pxe_core::BootAction;

#[tokio::test]
async fn update_writes_a_fifo_with_the_rendered_append_line() {
    let daemon = Daemon::start("").await;
    let host = seed_basic_host(
        daemon.backend(),
        "h1.example.org",
        "00:11:22:33:44:55",
        "deadbeef",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );

    let reply = daemon.send("update h1.example.org").await;
    assert_eq!(reply, "Boot configuration updated");

    let pxefile = daemon.pxe_dir().join("01-00-11-22-33-44-55");
    let content = read_fifo_once(pxefile).await;

    assert!(content.contains("append"), "rendered content should have an append line: {content:?}");
    assert!(content.contains("initrd=opsi"), "content: {content:?}");
    assert!(content.contains("root=/dev/ram0"), "content: {content:?}");
    assert!(content.contains("pckey=deadbeef"), "content: {content:?}");
    assert!(content.contains("hn=h1"), "content: {content:?}");
    assert!(content.contains("dn=example.org"), "content: {content:?}");
    assert!(content.contains("product=win10"), "content: {content:?}");
    assert!(content.contains("service=https://s.example.org:4447/rpc"), "content: {content:?}");

    wait_for(MAX_WAIT_MS, || {
        daemon
            .backend()
            .updates()
            .iter()
            .any(|poc| poc.host_id == host && poc.action_progress == "pxe boot configuration read")
    })
    .await;

    daemon.stop().await;
}
