//! `spec.md` §8 end-to-end scenario 4: an `actionRequest = "always"`
//! product causes a second FIFO to be materialised for the same host as
//! soon as the first one is read, with no new control command.

use crate::prelude::*;
use pxe_core::BootAction;

#[tokio::test]
async fn always_action_reschedules_a_second_fifo_after_the_first_read() {
    let daemon = Daemon::start("").await;
    seed_basic_host(
        daemon.backend(),
        "h3.example.org",
        "00:11:22:33:44:77",
        "beefcafe",
        "win10",
        BootAction::Always,
        "https://s.example.org:4447",
    );

    let reply = daemon.send("update h3.example.org").await;
    assert_eq!(reply, "Boot configuration updated");

    let pxefile = daemon.pxe_dir().join("01-00-11-22-33-44-77");

    // First reader consumes the fifo...
    read_fifo_once(pxefile.clone()).await;

    // ...and a second fifo for the same host appears without another
    // `update` command being sent.
    wait_for(MAX_WAIT_MS, || pxefile.exists()).await;

    daemon.stop().await;
}
