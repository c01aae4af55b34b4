//! `spec.md` §8 end-to-end scenario 2: a product naming a
//! `pxeConfigTemplate` makes the updater render from that template
//! instead of the default, and a successful read clears the pending
//! action entirely.

use crate::prelude::*;
use pxe_core::{BootAction, NetbootProduct, ProductId};

#[tokio::test]
async fn product_template_override_is_used_and_clears_the_action() {
    let daemon = Daemon::start("").await;
    let host = seed_basic_host(
        daemon.backend(),
        "h2.example.org",
        "00:11:22:33:44:66",
        "cafef00d",
        "win10",
        BootAction::Setup,
        "https://s.example.org:4447",
    );
    daemon.backend().seed_netboot_product(
        ProductId::new("win10"),
        "1.0",
        "1",
        NetbootProduct { pxe_config_template: Some("altinstall".to_string()) },
    );

    let reply = daemon.send("update h2.example.org").await;
    assert_eq!(reply, "Boot configuration updated");

    let pxefile = daemon.pxe_dir().join("01-00-11-22-33-44-66");
    let content = read_fifo_once(pxefile).await;
    assert!(content.contains("alt=1"), "should render from altinstall, got: {content:?}");

    wait_for(MAX_WAIT_MS, || {
        daemon
            .backend()
            .updates()
            .iter()
            .any(|poc| poc.host_id == host && poc.action_request == BootAction::None)
    })
    .await;

    daemon.stop().await;
}
