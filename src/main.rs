mod config;
mod contract;
mod ledger;
mod migration;
mod rpc;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::Config;
use crate::contract::sender::Sender;
use crate::ledger::{
	ArtifactDeployer, RpcClock, RpcContractFactory, RpcLegacyRegistry, RpcStakingContract,
};
use crate::migration::{
	Collaborators, MigrationOrchestrator, MigrationReport,
	state_persistence::StatePersistenceService,
};
use crate::rpc::EthRpcClient;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let config = Config::parse();

	match run(config).await {
		Ok(report) => info!("{}", report.summary()),
		Err(e) => {
			error!("Migration failed: {:#}", e);
			std::process::exit(1);
		}
	}
}

async fn run(config: Config) -> anyhow::Result<MigrationReport> {
	info!("Starting locker migration against {}", config.rpc_url);

	let client = Arc::new(
		EthRpcClient::new(
			&config.rpc_url,
			config.request_timeout(),
			config.read_retry_window(),
		)
		.context("Failed to create RPC client")?,
	);

	let head = client
		.block_number()
		.await
		.context("Failed to reach the node")?;
	info!("Connected to node at block {}", head);

	let sender = Arc::new(Sender::new(
		client.clone(),
		config.deployer,
		config.confirmation_policy(),
	));

	let deployer = Arc::new(ArtifactDeployer::new(
		config.artifacts_dir.clone(),
		sender.clone(),
	));
	let collaborators = Collaborators {
		legacy: Arc::new(RpcLegacyRegistry::new(config.old_locker, sender.clone())),
		staking: Arc::new(RpcStakingContract::new(config.staking, sender.clone())),
		contracts: Arc::new(RpcContractFactory::new(sender.clone())),
		clock: Arc::new(RpcClock::new(client.clone())),
		deployer: deployer.clone(),
		upgrader: deployer,
	};

	let persistence = config.state_dir.clone().map(|dir| {
		info!("Checkpointing migration state in {:?}", dir);
		StatePersistenceService::new(dir)
	});

	let mut orchestrator = MigrationOrchestrator::new(config.settings(), collaborators, persistence);
	let report = orchestrator
		.run()
		.await
		.with_context(|| format!("Migration stopped in state {:?}", orchestrator.state()))?;
	Ok(report)
}
