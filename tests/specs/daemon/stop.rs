//! `spec.md` §8 end-to-end scenario 6: `stop` replies immediately and,
//! within a second, every active writer's FIFO and the control socket
//! itself are gone.

use crate::prelude::*;
use pxe_core::BootAction;
use std::time::Duration;

#[tokio::test]
async fn stop_tears_down_active_writers_and_the_control_socket() {
    let daemon = Daemon::start("").await;
    for (n, suffix) in ["aa", "bb", "cc"].iter().enumerate() {
        seed_basic_host(
            daemon.backend(),
            &format!("h{n}.example.org"),
            &format!("00:11:22:33:44:{suffix}"),
            "deadbeef",
            "win10",
            BootAction::Setup,
            "https://s.example.org:4447",
        );
    }

    for (n, suffix) in ["aa", "bb", "cc"].iter().enumerate() {
        let _ = n;
        let host = format!("h{n}.example.org");
        assert_eq!(daemon.send(&format!("update {host}")).await, "Boot configuration updated");
    }

    let pxefiles: Vec<_> = ["aa", "bb", "cc"]
        .iter()
        .map(|suffix| daemon.pxe_dir().join(format!("01-00-11-22-33-44-{suffix}")))
        .collect();
    wait_for(MAX_WAIT_MS, || pxefiles.iter().all(|p| p.exists())).await;

    let socket = daemon.socket();
    let reply = daemon.stop_via_control().await;
    assert_eq!(reply, "opsipxeconfd is going down");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!socket.exists(), "control socket file should be removed");
    for pxefile in &pxefiles {
        assert!(!pxefile.exists(), "fifo {} should be removed on stop", pxefile.display());
    }
}
