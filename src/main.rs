use paygate_wallet::config::ClientConfig;
use paygate_wallet::network::network_name;
use paygate_wallet::provider::{
	HttpRpcProvider, InjectedConnector, ProviderFlags, ProviderRegistry, StaticHost,
};
use paygate_wallet::query::{HttpQueryBackend, PaidQueryOrchestrator};
use paygate_wallet::transaction::{NATIVE_TOKEN_DECIMALS, TransactionTracker};
use paygate_wallet::utils::format_token_amount;
use paygate_wallet::wallet::{ConnectOutcome, ConnectionSession, StatusDispatcher, TracingStatusHandler};

use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

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

	if let Err(e) = run().await {
		error!("{}", e);
		std::process::exit(1);
	}
}

async fn run() -> Result<(), Box<dyn Error>> {
	let args: Vec<String> = std::env::args().skip(1).collect();
	let withdraw = args.iter().any(|a| a == "--withdraw");
	let question = args
		.iter()
		.filter(|a| !a.starts_with("--"))
		.cloned()
		.collect::<Vec<_>>()
		.join(" ");

	let config = ClientConfig::from_env()?;
	info!(
		"Starting paygate client on {} (rpc {})",
		network_name(config.chain_id),
		config.rpc_url
	);

	// A development node with unlocked accounts stands in for the browser wallet.
	let node = Arc::new(HttpRpcProvider::new(config.rpc_url.clone())?);
	let host = Arc::new(StaticHost::with_ethereum(node, ProviderFlags::default()));
	let registry = ProviderRegistry::new(host);

	let status = StatusDispatcher::new();
	status.register_handler(Box::new(TracingStatusHandler)).await;

	let mut connection = ConnectionSession::new(
		registry.clone(),
		Box::new(InjectedConnector::new(registry)),
		config.contracts(),
		config.chain_id,
	)
	.with_status(status.clone());

	if let ConnectOutcome::Cancelled = connection.connect().await? {
		info!("Nothing to do");
		return Ok(());
	}
	if let Some(outcome) = connection.select_network(config.chain_id).await {
		info!("Network switch: {:?}", outcome);
	}

	let controls = connection.controls();
	info!("{}", controls.wallet_status);
	if let Some(message) = &controls.contract_status {
		warn!("{}", message);
	}

	if connection.binding().can_pay() {
		let balance = connection.binding().get_balance().await?;
		info!(
			"Contract balance: {} ETH",
			format_token_amount(balance, NATIVE_TOKEN_DECIMALS)
		);
	}

	let orchestrator = PaidQueryOrchestrator::new(
		TransactionTracker::new(config.poll_interval),
		HttpQueryBackend::new(config.query_endpoint())?,
	)
	.with_status(status);

	if withdraw {
		let transaction = orchestrator.withdraw(connection.bound_contract()).await?;
		info!("Withdrawal {} confirmed", transaction.hash);
	} else if !question.is_empty() {
		info!(
			"Paying {} ETH for the question",
			format_token_amount(orchestrator.payment_value(), NATIVE_TOKEN_DECIMALS)
		);
		let answer = orchestrator
			.submit_query(connection.bound_contract(), &question)
			.await?;
		println!("{}", answer.answer);
	} else {
		info!("Usage: paygate-wallet <question> | --withdraw");
	}

	connection.disconnect().await;
	Ok(())
}
