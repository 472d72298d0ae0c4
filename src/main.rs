// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use spa_authd::{
    cfg::{cli::Args, config::Config, logger::init_logger},
    orchestrator::Orchestrator,
    policy::{self, PolicySet},
    replay::ReplayStore,
    server,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_from(std::env::args()).context("failed to parse command-line arguments")?;

    let config_path = args.config.to_str().context("config path is not valid UTF-8")?;
    let cfg = Config::load_from_file(&args.config).context("failed to load configuration")?;

    // The logger reads its own section from the same YAML file; a config
    // without a `logger:` section (e.g. a minimal test fixture) just runs
    // unlogged rather than failing startup.
    let _logger_guard = init_logger(config_path).ok();

    if args.test {
        info!("running in test mode: command execution and firewall changes are disabled");
    }
    if args.foreground {
        info!("running in foreground");
    }

    let identity_mode = cfg.spa.sdp_mode();
    let policy_set: PolicySet =
        policy::loader::load_policy(&cfg.access_policy_path, identity_mode).context("failed to load access policy")?;
    let replay = ReplayStore::open(&cfg.replay.digest_db_file).context("failed to open replay store")?;

    let bind = std::net::SocketAddrV4::new(cfg.server.bind_address, cfg.server.udp_serv_port);
    let rules_check_threshold = cfg.server.rules_check_threshold;
    let packet_ctr_limit = cfg.server.packet_ctr_limit;

    let orchestrator = Arc::new(Orchestrator::new(cfg, Arc::new(policy_set), replay, args.test));

    server::run(orchestrator, bind, rules_check_threshold, packet_ctr_limit).await
}
