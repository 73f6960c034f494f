//! Alloy-based EVM delivery implementation.
//!
//! Talks JSON-RPC over HTTP to a single endpoint. Every call is wrapped in the
//! configured per-call timeout, so a stalled endpoint surfaces as
//! `DeliveryError::Timeout` for that call only.

use crate::{Connector, DeliveryError, DeliveryInterface};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types::TransactionRequest;
use alloy_transport::{RpcError, TransportResult};
use alloy_transport_http::Http;
use async_trait::async_trait;
use checkin_types::{
	truncate_id, Address, CallRequest, SignedTransaction, TransactionHash, TransactionReceipt,
};
use reqwest::{Client, Url};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

/// Chain client for one HTTP JSON-RPC endpoint.
pub struct AlloyDelivery {
	provider: RootProvider<Http<Client>>,
	request_timeout: Duration,
}

impl AlloyDelivery {
	/// Creates a client for the given URL. No request is made.
	pub fn new(url: &str, request_timeout: Duration) -> Result<Self, DeliveryError> {
		let url: Url = url.parse().map_err(|e| {
			DeliveryError::Configuration(format!("Invalid RPC URL {}: {}", url, e))
		})?;

		let provider = ProviderBuilder::new().on_http(url);

		Ok(Self {
			provider,
			request_timeout,
		})
	}

	/// Runs one RPC call under the per-call timeout.
	async fn timed<F, T>(&self, operation: &str, call: F) -> Result<T, DeliveryError>
	where
		F: IntoFuture<Output = TransportResult<T>>,
	{
		match tokio::time::timeout(self.request_timeout, call.into_future()).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => Err(DeliveryError::Network(format!("{} failed: {}", operation, e))),
			Err(_) => Err(DeliveryError::Timeout(format!(
				"{} after {}s",
				operation,
				self.request_timeout.as_secs()
			))),
		}
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.timed("eth_chainId", self.provider.get_chain_id()).await
	}

	async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, DeliveryError> {
		let request = TransactionRequest::default()
			.from(call.from)
			.to(call.to)
			.value(call.value)
			.input(call.data.clone().into());

		match tokio::time::timeout(self.request_timeout, self.provider.estimate_gas(&request)).await
		{
			Ok(Ok(gas)) => Ok(gas),
			// The node answered with a JSON-RPC error: the simulated call failed
			Ok(Err(RpcError::ErrorResp(payload))) => {
				Err(DeliveryError::Reverted(payload.message.to_string()))
			}
			Ok(Err(e)) => Err(DeliveryError::Network(format!(
				"eth_estimateGas failed: {}",
				e
			))),
			Err(_) => Err(DeliveryError::Timeout(format!(
				"eth_estimateGas after {}s",
				self.request_timeout.as_secs()
			))),
		}
	}

	async fn gas_price(&self) -> Result<u128, DeliveryError> {
		self.timed("eth_gasPrice", self.provider.get_gas_price()).await
	}

	async fn nonce(&self, address: Address) -> Result<u64, DeliveryError> {
		// Pending tag: an unconfirmed transaction from an earlier target
		// already holds the latest nonce
		self.timed(
			"eth_getTransactionCount",
			self.provider.get_transaction_count(address).pending(),
		)
		.await
	}

	async fn send_raw_transaction(
		&self,
		tx: &SignedTransaction,
	) -> Result<TransactionHash, DeliveryError> {
		let pending = match tokio::time::timeout(
			self.request_timeout,
			self.provider.send_raw_transaction(&tx.raw),
		)
		.await
		{
			Ok(Ok(pending)) => pending,
			Ok(Err(e)) => return Err(DeliveryError::Rejected(e.to_string())),
			Err(_) => {
				return Err(DeliveryError::Timeout(format!(
					"eth_sendRawTransaction after {}s",
					self.request_timeout.as_secs()
				)))
			}
		};

		let hash = TransactionHash(*pending.tx_hash());
		tracing::debug!(tx_hash = %truncate_id(&hash.to_string()), "Broadcast accepted");
		Ok(hash)
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.timed(
				"eth_getTransactionReceipt",
				self.provider.get_transaction_receipt(hash.0),
			)
			.await?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			status: receipt.status().into(),
			block_number: receipt.block_number,
		}))
	}
}

/// Connector producing [`AlloyDelivery`] clients.
#[derive(Debug, Clone)]
pub struct AlloyConnector {
	request_timeout: Duration,
}

impl AlloyConnector {
	pub fn new(request_timeout: Duration) -> Self {
		Self { request_timeout }
	}
}

impl Connector for AlloyConnector {
	fn connect(&self, url: &str) -> Result<Arc<dyn DeliveryInterface>, DeliveryError> {
		let delivery = AlloyDelivery::new(url, self.request_timeout)?;
		Ok(Arc::new(delivery))
	}
}
