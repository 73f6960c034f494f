//! Check-in engine that drives one run from endpoint selection to outcome.
//!
//! Targets are attempted strictly one after another because they share one
//! sender and one nonce sequence. Only a fatal condition (credentials, no
//! endpoint, signing) aborts the run; every target-level failure advances to
//! the next target.

pub mod state;

pub use state::RunState;

use crate::monitoring::{ConfirmationOutcome, ConfirmationPoller};
use crate::prober::{ClaimabilityProber, ProbeOutcome};
use crate::submitter::{SubmitError, TransactionSubmitter};
use checkin_account::{AccountError, AccountInterface, AccountService};
use checkin_config::Config;
use checkin_delivery::{ConnectedEndpoint, Connector, EndpointPool};
use checkin_types::{
	explorer_link, AbortReason, Address, RunOutcome, SecretString, Target, TransactionHash,
};
use std::sync::Arc;

/// Boxed account factory used by the engine to load credentials at run start.
pub type AccountLoader =
	Box<dyn Fn(&SecretString) -> Result<Box<dyn AccountInterface>, AccountError> + Send + Sync>;

/// What happened to a single target.
enum Attempt {
	Succeeded(TransactionHash),
	Skipped,
	Aborted(AbortReason),
}

/// Orchestrates check-in runs.
pub struct CheckinEngine {
	/// Run configuration.
	pub(crate) config: Config,
	/// Builds the signing account from the configured key.
	pub(crate) account_loader: AccountLoader,
	/// Creates chain clients for endpoint candidates.
	pub(crate) connector: Arc<dyn Connector>,
	/// Endpoint candidates in fallback order.
	pub(crate) pool: EndpointPool,
	pub(crate) prober: ClaimabilityProber,
	pub(crate) submitter: TransactionSubmitter,
	pub(crate) poller: ConfirmationPoller,
}

impl CheckinEngine {
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Executes one run and returns its outcome.
	///
	/// Running again after a successful check-in is safe: the claimed target
	/// no longer passes the probe, so the run ends with `NoneClaimable`.
	pub async fn run(&self) -> RunOutcome {
		tracing::info!(
			id = %self.config.checkin.id,
			targets = self.config.targets.len(),
			endpoints = self.pool.candidates().len(),
			"Starting check-in run"
		);

		let outcome = self.execute().await;

		match &outcome {
			RunOutcome::Succeeded { target, tx_hash } => {
				tracing::info!(target = %target, tx_hash = %tx_hash, "Check-in succeeded");
			}
			RunOutcome::NoneClaimable => {
				tracing::info!("No target claimable");
			}
			RunOutcome::Aborted(reason) => {
				enter(RunState::Aborted, None);
				tracing::error!(reason = %reason, "Run aborted");
			}
		}
		enter(RunState::Done, None);

		outcome
	}

	async fn execute(&self) -> RunOutcome {
		enter(RunState::LoadingAccount, None);
		let account = match self.load_account() {
			Ok(account) => account,
			Err(reason) => return RunOutcome::Aborted(reason),
		};

		enter(RunState::SelectingEndpoint, None);
		let endpoint = match self.pool.select(self.connector.as_ref()).await {
			Ok(endpoint) => endpoint,
			Err(_) => return RunOutcome::Aborted(AbortReason::NoReachableEndpoint),
		};

		let sender = match account.get_address().await {
			Ok(address) => address,
			Err(e) => return RunOutcome::Aborted(AbortReason::InvalidCredentials(e.to_string())),
		};
		tracing::info!(sender = %sender, chain_id = endpoint.chain_id, "Using account");

		for (index, target) in self.config.targets.iter().enumerate() {
			tracing::info!(
				target = %target.name,
				address = %target.address,
				call = %target.call,
				priority = index + 1,
				"Trying target"
			);

			match self.attempt(&endpoint, &account, sender, target).await {
				Attempt::Succeeded(tx_hash) => {
					enter(RunState::Succeeded, Some(target));
					return RunOutcome::Succeeded {
						target: target.name.clone(),
						tx_hash,
					};
				}
				Attempt::Skipped => enter(RunState::Advancing, Some(target)),
				Attempt::Aborted(reason) => return RunOutcome::Aborted(reason),
			}
		}

		RunOutcome::NoneClaimable
	}

	fn load_account(&self) -> Result<AccountService, AbortReason> {
		let Some(private_key) = self.config.account.private_key.as_ref() else {
			tracing::error!("No private key configured");
			return Err(AbortReason::MissingCredentials);
		};

		match (self.account_loader)(private_key) {
			Ok(implementation) => Ok(AccountService::new(implementation)),
			Err(e) => {
				tracing::error!(error = %e, "Failed to load account");
				Err(AbortReason::InvalidCredentials(e.to_string()))
			}
		}
	}

	/// Probes, submits and confirms one target.
	async fn attempt(
		&self,
		endpoint: &ConnectedEndpoint,
		account: &AccountService,
		sender: Address,
		target: &Target,
	) -> Attempt {
		let client = endpoint.client.as_ref();
		let explorer = self.config.checkin.explorer_url.as_deref();

		enter(RunState::ProbingTarget, Some(target));
		let gas_estimate = match self.prober.probe(client, sender, target).await {
			ProbeOutcome::Claimable { gas_estimate } => {
				tracing::info!(target = %target.name, gas_estimate, "Target claimable");
				gas_estimate
			}
			ProbeOutcome::NotClaimable { reason } => {
				tracing::info!(target = %target.name, reason = %reason, "Target not claimable");
				return Attempt::Skipped;
			}
			ProbeOutcome::Error(e) => {
				tracing::warn!(target = %target.name, error = %e, "Probe failed");
				return Attempt::Skipped;
			}
		};

		enter(RunState::Submitting, Some(target));
		let tx_hash = match self
			.submitter
			.submit(client, endpoint.chain_id, account, sender, target, gas_estimate)
			.await
		{
			Ok(tx_hash) => tx_hash,
			Err(SubmitError::Signing(e)) => {
				tracing::error!(target = %target.name, error = %e, "Signing failed");
				return Attempt::Aborted(AbortReason::SigningFailed(e.to_string()));
			}
			Err(e) => {
				tracing::warn!(target = %target.name, error = %e, "Submission failed");
				return Attempt::Skipped;
			}
		};
		tracing::info!(
			target = %target.name,
			tx_hash = %tx_hash,
			link = %explorer_link(explorer, &tx_hash),
			"Transaction sent"
		);

		enter(RunState::Polling, Some(target));
		match self.poller.wait(client, &tx_hash).await {
			ConfirmationOutcome::Confirmed(receipt) if receipt.status.is_success() => {
				tracing::info!(
					target = %target.name,
					block = ?receipt.block_number,
					link = %explorer_link(explorer, &tx_hash),
					"Transaction confirmed"
				);
				Attempt::Succeeded(tx_hash)
			}
			ConfirmationOutcome::Confirmed(receipt) => {
				tracing::warn!(
					target = %target.name,
					block = ?receipt.block_number,
					link = %explorer_link(explorer, &tx_hash),
					"Transaction failed on chain"
				);
				Attempt::Skipped
			}
			ConfirmationOutcome::TimedOut => {
				tracing::warn!(
					target = %target.name,
					deadline_secs = self.poller.deadline().as_secs(),
					link = %explorer_link(explorer, &tx_hash),
					"Confirmation timed out"
				);
				Attempt::Skipped
			}
		}
	}
}

fn enter(state: RunState, target: Option<&Target>) {
	match (target, state.is_terminal()) {
		(Some(target), true) => tracing::info!(state = %state, target = %target.name, "Run state"),
		(Some(target), false) => tracing::debug!(state = %state, target = %target.name, "Run state"),
		(None, true) => tracing::info!(state = %state, "Run state"),
		(None, false) => tracing::debug!(state = %state, "Run state"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::builder::{CheckinBuilder, CheckinFactories};
	use async_trait::async_trait;
	use checkin_account::MockAccountInterface;
	use checkin_delivery::{DeliveryError, DeliveryInterface, MockConnector, MockDeliveryInterface};
	use checkin_types::{
		Bytes, CallRequest, PendingTransaction, ReceiptStatus, SignedTransaction,
		TransactionReceipt, B256,
	};
	use mockall::predicate::eq;
	use std::collections::{HashMap, HashSet};
	use std::str::FromStr;
	use std::sync::Mutex;

	const SENDER: Address = Address::repeat_byte(0x11);
	const TARGET_A: Address = Address::repeat_byte(0xaa);
	const TARGET_B: Address = Address::repeat_byte(0xbb);

	#[derive(Default)]
	struct ChainState {
		/// Targets currently claimable and how their transaction executes.
		claimable: HashMap<Address, ReceiptStatus>,
		/// Targets whose broadcast the node refuses.
		rejecting: HashSet<Address>,
		/// Never hand out receipts.
		withhold_receipts: bool,
		probed: Vec<Address>,
		broadcasts: Vec<Address>,
		/// Nonce of each accepted broadcast.
		nonces: Vec<u8>,
		receipts: HashMap<TransactionHash, TransactionReceipt>,
		nonce: u64,
	}

	/// In-memory chain where each target can be checked in once.
	#[derive(Default)]
	struct FakeChain {
		state: Mutex<ChainState>,
	}

	impl FakeChain {
		fn with_claimable(targets: &[(Address, ReceiptStatus)]) -> Arc<Self> {
			let chain = Self::default();
			chain.state.lock().unwrap().claimable = targets.iter().copied().collect();
			Arc::new(chain)
		}

		fn probed(&self) -> Vec<Address> {
			self.state.lock().unwrap().probed.clone()
		}

		fn broadcasts(&self) -> Vec<Address> {
			self.state.lock().unwrap().broadcasts.clone()
		}
	}

	#[async_trait]
	impl DeliveryInterface for FakeChain {
		async fn chain_id(&self) -> Result<u64, DeliveryError> {
			Ok(204)
		}

		async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, DeliveryError> {
			let mut state = self.state.lock().unwrap();
			state.probed.push(call.to);
			if state.claimable.contains_key(&call.to) {
				Ok(50_000)
			} else {
				Err(DeliveryError::Reverted("execution reverted".into()))
			}
		}

		async fn gas_price(&self) -> Result<u128, DeliveryError> {
			Ok(1_000_000_000)
		}

		async fn nonce(&self, _address: Address) -> Result<u64, DeliveryError> {
			Ok(self.state.lock().unwrap().nonce)
		}

		async fn send_raw_transaction(
			&self,
			tx: &SignedTransaction,
		) -> Result<TransactionHash, DeliveryError> {
			let mut state = self.state.lock().unwrap();
			let to = Address::from_slice(&tx.raw[..20]);
			state.broadcasts.push(to);
			if state.rejecting.contains(&to) {
				return Err(DeliveryError::Rejected("already known".into()));
			}

			let status = state.claimable.get(&to).copied().unwrap_or(ReceiptStatus::Failure);
			if status.is_success() {
				state.claimable.remove(&to);
			}
			state.nonces.push(tx.hash.0[31]);
			state.nonce += 1;
			let block = 100 + state.nonce;
			if !state.withhold_receipts {
				state.receipts.insert(
					tx.hash,
					TransactionReceipt {
						hash: tx.hash,
						status,
						block_number: Some(block),
					},
				);
			}
			Ok(tx.hash)
		}

		async fn get_receipt(
			&self,
			hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, DeliveryError> {
			Ok(self.state.lock().unwrap().receipts.get(hash).cloned())
		}
	}

	/// Test signer: the raw payload is the destination address.
	fn sign(tx: &PendingTransaction) -> SignedTransaction {
		let mut hash = [0u8; 32];
		hash[..20].copy_from_slice(tx.to.as_slice());
		hash[31] = tx.nonce as u8;
		SignedTransaction {
			raw: Bytes::copy_from_slice(tx.to.as_slice()),
			hash: TransactionHash(B256::from(hash)),
		}
	}

	fn signing_account(_key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
		let mut account = MockAccountInterface::new();
		account.expect_address().returning(|| Ok(SENDER));
		account
			.expect_sign_transaction()
			.returning(|tx| Ok(sign(tx)));
		Ok(Box::new(account))
	}

	fn non_signing_account(_key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
		let mut account = MockAccountInterface::new();
		account.expect_address().returning(|| Ok(SENDER));
		account.expect_sign_transaction().never();
		Ok(Box::new(account))
	}

	fn broken_signer(_key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
		let mut account = MockAccountInterface::new();
		account.expect_address().returning(|| Ok(SENDER));
		account
			.expect_sign_transaction()
			.returning(|_| Err(AccountError::SigningFailed("hardware fault".into())));
		Ok(Box::new(account))
	}

	fn unexpected_account(_key: &SecretString) -> Result<Box<dyn AccountInterface>, AccountError> {
		panic!("account must not be loaded")
	}

	fn config(targets: &[(&str, Address)], with_key: bool) -> Config {
		let mut toml = String::from(
			r#"
[checkin]
id = "test-run"
chain_id = 204
explorer_url = "https://opbnb.bscscan.com/tx/"

[network]
rpc_urls = ["http://down", "http://up", "http://spare"]

[confirmation]
timeout_seconds = 60
poll_interval_seconds = 5
"#,
		);
		if with_key {
			toml.push_str(
				"\n[account]\nprivate_key = \"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80\"\n",
			);
		}
		for (name, address) in targets {
			toml.push_str(&format!(
				"\n[[targets]]\nname = \"{}\"\naddress = \"{}\"\ncalldata = \"0x183ff085\"\n",
				name, address
			));
		}
		Config::from_str(&toml).unwrap()
	}

	fn dead_client() -> Arc<dyn DeliveryInterface> {
		let mut client = MockDeliveryInterface::new();
		client
			.expect_chain_id()
			.returning(|| Err(DeliveryError::Network("connection refused".into())));
		Arc::new(client)
	}

	/// First endpoint is down, second serves the fake chain, third is never used.
	fn connector(chain: &Arc<FakeChain>) -> Arc<dyn Connector> {
		let mut connector = MockConnector::new();
		connector
			.expect_connect()
			.with(eq("http://down"))
			.returning(|_| Ok(dead_client()));
		let chain = chain.clone();
		connector
			.expect_connect()
			.with(eq("http://up"))
			.returning(move |_| Ok(chain.clone() as Arc<dyn DeliveryInterface>));
		connector.expect_connect().with(eq("http://spare")).never();
		Arc::new(connector)
	}

	fn engine<F>(config: Config, account_factory: F, connector: Arc<dyn Connector>) -> CheckinEngine
	where
		F: Fn(&SecretString) -> Result<Box<dyn AccountInterface>, AccountError>
			+ Send
			+ Sync
			+ 'static,
	{
		CheckinBuilder::new(config)
			.build(CheckinFactories {
				account_factory,
				connector,
			})
			.unwrap()
	}

	#[tokio::test]
	async fn test_first_reachable_endpoint_and_first_target() {
		let chain = FakeChain::with_claimable(&[
			(TARGET_A, ReceiptStatus::Success),
			(TARGET_B, ReceiptStatus::Success),
		]);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			signing_account,
			connector(&chain),
		);

		let outcome = engine.run().await;

		match outcome {
			RunOutcome::Succeeded { target, tx_hash } => {
				assert_eq!(target, "A");
				assert_eq!(&tx_hash.0[..20], TARGET_A.as_slice());
			}
			other => panic!("unexpected outcome: {:?}", other),
		}
		// B is claimable too but never touched
		assert_eq!(chain.probed(), vec![TARGET_A]);
		assert_eq!(chain.broadcasts(), vec![TARGET_A]);
	}

	#[tokio::test]
	async fn test_reverting_target_is_skipped() {
		let chain = FakeChain::with_claimable(&[(TARGET_B, ReceiptStatus::Success)]);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			signing_account,
			connector(&chain),
		);

		let outcome = engine.run().await;

		assert!(matches!(&outcome, RunOutcome::Succeeded { target, .. } if target == "B"));
		assert_eq!(chain.probed(), vec![TARGET_A, TARGET_B]);
		assert_eq!(chain.broadcasts(), vec![TARGET_B]);
	}

	#[tokio::test]
	async fn test_nothing_claimable_never_signs() {
		let chain = FakeChain::with_claimable(&[]);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			non_signing_account,
			connector(&chain),
		);

		assert_eq!(engine.run().await, RunOutcome::NoneClaimable);
		assert_eq!(chain.probed(), vec![TARGET_A, TARGET_B]);
		assert!(chain.broadcasts().is_empty());
	}

	#[tokio::test]
	async fn test_failed_execution_advances_to_none_claimable() {
		let chain = FakeChain::with_claimable(&[(TARGET_A, ReceiptStatus::Failure)]);
		let engine = engine(config(&[("A", TARGET_A)], true), signing_account, connector(&chain));

		assert_eq!(engine.run().await, RunOutcome::NoneClaimable);
		assert_eq!(chain.broadcasts(), vec![TARGET_A]);
	}

	#[tokio::test]
	async fn test_failed_execution_advances_to_next_target() {
		let chain = FakeChain::with_claimable(&[
			(TARGET_A, ReceiptStatus::Failure),
			(TARGET_B, ReceiptStatus::Success),
		]);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			signing_account,
			connector(&chain),
		);

		let outcome = engine.run().await;

		assert!(matches!(&outcome, RunOutcome::Succeeded { target, .. } if target == "B"));
		assert_eq!(chain.broadcasts(), vec![TARGET_A, TARGET_B]);
	}

	#[tokio::test]
	async fn test_missing_key_aborts_without_network() {
		let mut connector = MockConnector::new();
		connector.expect_connect().never();
		let engine = engine(
			config(&[("A", TARGET_A)], false),
			unexpected_account,
			Arc::new(connector),
		);

		assert_eq!(
			engine.run().await,
			RunOutcome::Aborted(AbortReason::MissingCredentials)
		);
	}

	#[tokio::test]
	async fn test_invalid_key_aborts_without_network() {
		let mut connector = MockConnector::new();
		connector.expect_connect().never();
		let engine = engine(
			config(&[("A", TARGET_A)], true),
			|_: &SecretString| -> Result<Box<dyn AccountInterface>, AccountError> {
				Err(AccountError::InvalidKey("Invalid private key format".into()))
			},
			Arc::new(connector),
		);

		assert!(matches!(
			engine.run().await,
			RunOutcome::Aborted(AbortReason::InvalidCredentials(_))
		));
	}

	#[tokio::test]
	async fn test_no_reachable_endpoint_aborts() {
		let mut connector = MockConnector::new();
		connector
			.expect_connect()
			.times(3)
			.returning(|_| Ok(dead_client()));
		let engine = engine(
			config(&[("A", TARGET_A)], true),
			non_signing_account,
			Arc::new(connector),
		);

		assert_eq!(
			engine.run().await,
			RunOutcome::Aborted(AbortReason::NoReachableEndpoint)
		);
	}

	#[tokio::test]
	async fn test_signing_failure_aborts_run() {
		let chain = FakeChain::with_claimable(&[
			(TARGET_A, ReceiptStatus::Success),
			(TARGET_B, ReceiptStatus::Success),
		]);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			broken_signer,
			connector(&chain),
		);

		assert!(matches!(
			engine.run().await,
			RunOutcome::Aborted(AbortReason::SigningFailed(_))
		));
		assert_eq!(chain.probed(), vec![TARGET_A]);
		assert!(chain.broadcasts().is_empty());
	}

	#[tokio::test]
	async fn test_rejected_broadcast_advances() {
		let chain = FakeChain::with_claimable(&[
			(TARGET_A, ReceiptStatus::Success),
			(TARGET_B, ReceiptStatus::Success),
		]);
		chain.state.lock().unwrap().rejecting.insert(TARGET_A);
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			signing_account,
			connector(&chain),
		);

		let outcome = engine.run().await;

		assert!(matches!(&outcome, RunOutcome::Succeeded { target, .. } if target == "B"));
		// A was broadcast exactly once, never retried
		assert_eq!(chain.broadcasts(), vec![TARGET_A, TARGET_B]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirmation_timeout_advances() {
		let chain = FakeChain::with_claimable(&[
			(TARGET_A, ReceiptStatus::Success),
			(TARGET_B, ReceiptStatus::Success),
		]);
		chain.state.lock().unwrap().withhold_receipts = true;
		let engine = engine(
			config(&[("A", TARGET_A), ("B", TARGET_B)], true),
			signing_account,
			connector(&chain),
		);

		let started = tokio::time::Instant::now();
		assert_eq!(engine.run().await, RunOutcome::NoneClaimable);

		assert_eq!(chain.broadcasts(), vec![TARGET_A, TARGET_B]);
		// The unconfirmed first transaction still holds its nonce
		assert_eq!(chain.state.lock().unwrap().nonces, vec![0, 1]);
		// Each target waits at most its own deadline
		assert!(started.elapsed() < std::time::Duration::from_secs(121));
	}

	#[tokio::test]
	async fn test_second_run_after_claim() {
		let chain = FakeChain::with_claimable(&[(TARGET_A, ReceiptStatus::Success)]);
		let engine = engine(config(&[("A", TARGET_A)], true), signing_account, connector(&chain));

		assert!(engine.run().await.is_success());
		assert_eq!(engine.run().await, RunOutcome::NoneClaimable);
		assert_eq!(chain.probed(), vec![TARGET_A, TARGET_A]);
		assert_eq!(chain.broadcasts(), vec![TARGET_A]);
	}

	#[test]
	fn test_terminal_states() {
		assert!(RunState::Succeeded.is_terminal());
		assert!(RunState::Aborted.is_terminal());
		assert!(!RunState::Advancing.is_terminal());
		assert_eq!(RunState::ProbingTarget.to_string(), "ProbingTarget");
	}
}
