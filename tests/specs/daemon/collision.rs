//! `spec.md` §8 end-to-end scenario 3: two hosts sharing a MAC address
//! collide on the derived `pxefile`; the first writer wins and the
//! second `update` is rejected without touching the existing FIFO.

use crate::prelude::*;
use pxe_core::BootAction;

#[tokio::test]
async fn second_host_sharing_a_mac_is_rejected_with_address_collision() {
    let daemon = Daemon::start("").await;
    seed_basic_host(
        daemon.backend(),
        "h1.example.org",
        "00:11:22:33:44:55",
        "deadbeef",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );
    seed_basic_host(
        daemon.backend(),
        "h2.example.org",
        "00:11:22:33:44:55",
        "feedface",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );

    let first = daemon.send("update h1.example.org").await;
    assert_eq!(first, "Boot configuration updated");

    let pxefile = daemon.pxe_dir().join("01-00-11-22-33-44-55");
    wait_for(MAX_WAIT_MS, || pxefile.exists()).await;

    let second = daemon.send("update h2.example.org").await;
    assert_eq!(second, "(ERROR): address collision: ".to_string() + &pxefile.display().to_string() + " is already assigned to h1.example.org");

    // The first host's fifo must still be there, untouched.
    assert!(pxefile.exists());

    let content = read_fifo_once(pxefile).await;
    assert!(content.contains("hn=h1"));

    daemon.stop().await;
}
