// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pxe-daemon: configuration loading, the control protocol and server,
//! the supervisor, process lifecycle (PID file, daemonisation, signals,
//! logging), and the control-socket client used by the `opsipxeconfd`
//! binary (`spec.md` §4.F, §4.H, §6).

pub mod client;
pub mod config;
pub mod daemonize;
pub mod listener;
pub mod logging;
pub mod pidfile;
pub mod protocol;
pub mod supervisor;

pub use config::Config;
pub use supervisor::{Supervisor, SupervisorError};
