//! [`FiatPoolClient`], the main entry point for gateway integrations.

use fiat_pool::{
    normalize_symbol, AddLiquidityResult, Pool, PoolError, PoolLedger, PositionView,
    RemoveLiquidityResult, SwapDirection,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::ServiceConfig,
    error::{Error, Result},
    math::simulate_detailed,
    rates::{FiatRate, RateRegistry},
    store::{ServiceSnapshot, SNAPSHOT_VERSION},
    transactions::{TransactionJournal, TransactionKind},
    types::{
        parse_address, AddLiquidityRequest, ApiRequest, ApiResponse, ConvertResponse,
        CreatePoolRequest, DepositRequest, HealthResponse, OwnerCheck, PositionEntry, RateEntry,
        RemoveLiquidityRequest, SetRateRequest, SetStatusRequest, SimulateResult, StatusResponse,
        SwapEthForTokensRequest, SwapEthForTokensResponse, SwapTokensForEthRequest,
        SwapTokensForEthResponse, TransactionReceipt, TransactionsResponse, WithdrawalRequest,
    },
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─── Client ───────────────────────────────────────────────────────────────────

/// Shared-state service over the liquidity ledger, the fiat rate registry and
/// the fiat transaction journal.
///
/// Every method takes `&self`; wrap the client in an `Arc` to share it across
/// threads or tasks. Calls on different currencies run in parallel, calls on
/// the same currency are serialized by the ledger.
///
/// ```rust
/// use fiat_pool_sdk::{AddLiquidityRequest, FiatPoolClient, SwapEthForTokensRequest};
///
/// let client = FiatPoolClient::with_defaults();
/// let lp = "0x00000000000000000000000000000000000000a1";
///
/// client.add_liquidity("USD", AddLiquidityRequest {
///     address: lp.into(), eth_amount: 100, token_amount: 400,
/// }).unwrap();
///
/// let out = client.swap_eth_for_tokens("usd", SwapEthForTokensRequest {
///     address: lp.into(), eth_in: 10, min_out: 0,
/// }).unwrap();
/// assert_eq!(out.token_out, 36);
/// ```
#[derive(Debug)]
pub struct FiatPoolClient {
    config:       ServiceConfig,
    ledger:       PoolLedger,
    rates:        RateRegistry,
    transactions: TransactionJournal,
}

impl FiatPoolClient {
    /// Fresh service: one empty pool per seed currency plus the default rates.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let config = config.validated()?;
        let ledger = PoolLedger::new();
        for currency in &config.seed_currencies {
            ledger.create_pool(currency, config.default_fee_bps)?;
        }
        tracing::info!(
            owner = %config.owner,
            pools = config.seed_currencies.len(),
            "fiat pool service initialized"
        );
        Ok(Self {
            config,
            ledger,
            rates: RateRegistry::with_defaults(),
            transactions: TransactionJournal::new(),
        })
    }

    /// Service with [`ServiceConfig::default`].
    pub fn with_defaults() -> Self {
        let config = ServiceConfig::default();
        Self {
            ledger:       PoolLedger::with_default_pools(),
            rates:        RateRegistry::with_defaults(),
            transactions: TransactionJournal::new(),
            config: ServiceConfig {
                owner: config.owner.to_ascii_lowercase(),
                ..config
            },
        }
    }

    /// Resume from a saved snapshot. Seed currencies are not re-created.
    pub fn from_snapshot(config: ServiceConfig, snapshot: ServiceSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PoolError::CorruptSnapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            ))
            .into());
        }
        let config = config.validated()?;
        let ledger = PoolLedger::from_snapshot(snapshot.ledger)?;
        let rates = RateRegistry::from_entries(snapshot.rates)?;
        let transactions = TransactionJournal::from_records(snapshot.transactions)?;
        tracing::info!(
            pools = ledger.list_pools().len(),
            rates = rates.len(),
            transactions = transactions.len(),
            "fiat pool service restored"
        );
        Ok(Self { config, ledger, rates, transactions })
    }

    /// Consistent per-pool copy of the whole service.
    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            version:      SNAPSHOT_VERSION,
            ledger:       self.ledger.snapshot(),
            rates:        self.rates.entries(),
            transactions: self.transactions.records(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn ledger(&self) -> &PoolLedger {
        &self.ledger
    }

    // ── Pool reads ────────────────────────────────────────────────────────────

    pub fn health(&self) -> HealthResponse {
        let pools = self.ledger.list_pools();
        HealthResponse {
            status:       "ok",
            version:      VERSION,
            active_pools: pools.iter().filter(|p| p.is_active).count(),
            pools:        pools.len(),
            currencies:   self.rates.len(),
            transactions: self.transactions.len(),
        }
    }

    /// Every pool, ordered by currency.
    pub fn pools(&self) -> Vec<Pool> {
        self.ledger.list_pools()
    }

    pub fn pool_info(&self, currency: &str) -> Result<Pool> {
        Ok(self.ledger.get_pool_info(currency)?)
    }

    /// Shares held by `address` in `currency` plus their current reserve
    /// claim. Unknown holders read as zero.
    pub fn position(&self, currency: &str, address: &str) -> Result<PositionView> {
        let address = parse_address(address)?;
        Ok(self.ledger.get_user_position(currency, &address)?)
    }

    /// Non-zero positions of `address` across all pools.
    pub fn positions(&self, address: &str) -> Result<Vec<PositionEntry>> {
        let address = parse_address(address)?;
        Ok(self
            .ledger
            .positions_of(&address)?
            .into_iter()
            .map(|(currency, position)| PositionEntry { currency, position })
            .collect())
    }

    /// Quote a swap without touching the pool.
    pub fn simulate(
        &self,
        currency:  &str,
        direction: SwapDirection,
        amount_in: u128,
    ) -> Result<SimulateResult> {
        let pool = self.ledger.get_pool_info(currency)?;
        simulate_detailed(&pool, direction, amount_in)
    }

    // ── Pool writes ───────────────────────────────────────────────────────────

    pub fn add_liquidity(&self, currency: &str, req: AddLiquidityRequest) -> Result<AddLiquidityResult> {
        let address = parse_address(&req.address)?;
        Ok(self.ledger.add_liquidity(currency, req.eth_amount, req.token_amount, &address)?)
    }

    pub fn remove_liquidity(
        &self,
        currency: &str,
        req: RemoveLiquidityRequest,
    ) -> Result<RemoveLiquidityResult> {
        let address = parse_address(&req.address)?;
        Ok(self.ledger.remove_liquidity(currency, req.share_amount, &address)?)
    }

    pub fn swap_eth_for_tokens(
        &self,
        currency: &str,
        req: SwapEthForTokensRequest,
    ) -> Result<SwapEthForTokensResponse> {
        let address = parse_address(&req.address)?;
        let result = self
            .ledger
            .swap(currency, SwapDirection::EthToToken, req.eth_in, req.min_out, &address)?;
        Ok(SwapEthForTokensResponse { token_out: result.amount_out, pool: result.pool })
    }

    pub fn swap_tokens_for_eth(
        &self,
        currency: &str,
        req: SwapTokensForEthRequest,
    ) -> Result<SwapTokensForEthResponse> {
        let address = parse_address(&req.address)?;
        let result = self
            .ledger
            .swap(currency, SwapDirection::TokenToEth, req.token_in, req.min_out, &address)?;
        Ok(SwapTokensForEthResponse { eth_out: result.amount_out, pool: result.pool })
    }

    // ── Admin ─────────────────────────────────────────────────────────────────

    /// Whether `address` is the configured owner (case-insensitive).
    pub fn check_owner(&self, address: &str) -> bool {
        parse_address(address).map_or(false, |a| a == self.config.owner)
    }

    fn require_owner(&self, caller: &str, action: &'static str) -> Result<()> {
        if self.check_owner(caller) {
            return Ok(());
        }
        tracing::warn!(%caller, action, "rejected non-owner admin call");
        Err(Error::Unauthorized(caller.trim().to_string()))
    }

    /// Owner only. Creates an empty, active pool.
    pub fn create_pool(&self, req: CreatePoolRequest) -> Result<Pool> {
        self.require_owner(&req.caller, "create-pool")?;
        let fee = req.fee_rate_bps.unwrap_or(self.config.default_fee_bps);
        Ok(self.ledger.create_pool(&req.currency, fee)?)
    }

    pub fn rate(&self, currency: &str) -> Result<FiatRate> {
        self.rates.get(currency)
    }

    pub fn rates(&self) -> Vec<RateEntry> {
        self.rates
            .entries()
            .into_iter()
            .map(|(currency, rate)| RateEntry { currency, rate })
            .collect()
    }

    /// Owner only. Inserts or replaces the rate for a currency.
    pub fn set_rate(&self, req: SetRateRequest) -> Result<RateEntry> {
        self.require_owner(&req.caller, "set-rate")?;
        let rate = self.rates.set_rate(&req.currency, req.rate, req.decimals)?;
        Ok(RateEntry { currency: normalize_symbol(&req.currency), rate })
    }

    /// Owner only. Activates or deactivates a currency: its rate and, when
    /// one exists, its pool.
    pub fn set_status(&self, req: SetStatusRequest) -> Result<StatusResponse> {
        self.require_owner(&req.caller, "set-status")?;
        let currency = normalize_symbol(&req.currency);
        self.rates.set_active(&currency, req.is_active)?;
        let pool = match self.ledger.set_pool_active(&currency, req.is_active) {
            Ok(pool) => Some(pool),
            Err(PoolError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(StatusResponse { currency, is_active: req.is_active, pool })
    }

    /// Wei equivalent of `fiat_amount` whole fiat units at the current rate.
    pub fn convert_fiat_to_eth(&self, currency: &str, fiat_amount: u128) -> Result<ConvertResponse> {
        let eth_amount = self.rates.fiat_to_eth(currency, fiat_amount)?;
        let currency = normalize_symbol(currency);
        let rate = self.rates.get(&currency)?;
        tracing::debug!(%currency, fiat_amount = %fiat_amount, eth_amount = %eth_amount, "converted");
        Ok(ConvertResponse { currency, fiat_amount, eth_amount, rate })
    }

    // ── Fiat transactions ─────────────────────────────────────────────────────

    /// Record a completed fiat payment. Replaying the same
    /// `(address, currency, transaction_hash)` returns the original record.
    pub fn record_deposit(&self, req: DepositRequest) -> Result<TransactionReceipt> {
        self.record_transaction(
            TransactionKind::Deposit,
            &req.address,
            &req.currency,
            req.amount,
            &req.transaction_hash,
        )
    }

    /// Record a completed fiat payout. Idempotent like
    /// [`record_deposit`](Self::record_deposit); the amount may not exceed
    /// what the address has deposited in that currency, net of earlier
    /// withdrawals.
    pub fn record_withdrawal(&self, req: WithdrawalRequest) -> Result<TransactionReceipt> {
        self.record_transaction(
            TransactionKind::Withdrawal,
            &req.address,
            &req.currency,
            req.amount,
            &req.transaction_hash,
        )
    }

    /// Deposits minus withdrawals for `address` in `currency`.
    pub fn fiat_balance(&self, address: &str, currency: &str) -> Result<u128> {
        let address = parse_address(address)?;
        self.rates.get(currency)?;
        Ok(self.transactions.balance(&address, currency))
    }

    pub fn transactions(&self, address: &str) -> Result<TransactionsResponse> {
        let address = parse_address(address)?;
        let transactions = self.transactions.for_address(&address);
        Ok(TransactionsResponse { address, transactions })
    }

    fn record_transaction(
        &self,
        kind: TransactionKind,
        address: &str,
        currency: &str,
        amount: u128,
        transaction_hash: &str,
    ) -> Result<TransactionReceipt> {
        let address = parse_address(address)?;
        let rate = self.rates.get(currency)?;
        if !rate.is_active {
            return Err(Error::RateInactive(normalize_symbol(currency)));
        }
        let (transaction, _) =
            self.transactions.record(kind, &address, currency, amount, transaction_hash)?;
        let balance = self.transactions.balance(&address, currency);
        Ok(TransactionReceipt { transaction, balance })
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Execute one tagged request and return its JSON result.
    pub fn dispatch(&self, req: ApiRequest) -> Result<Value> {
        tracing::debug!(op = req.op(), "dispatch");
        match req {
            ApiRequest::Health => to_json(self.health()),
            ApiRequest::ListPools => to_json(self.pools()),
            ApiRequest::PoolInfo { currency } => to_json(self.pool_info(&currency)?),
            ApiRequest::Position { currency, address } => {
                to_json(self.position(&currency, &address)?)
            }
            ApiRequest::Positions { address } => to_json(self.positions(&address)?),
            ApiRequest::AddLiquidity { currency, address, eth_amount, token_amount } => to_json(
                self.add_liquidity(&currency, AddLiquidityRequest { address, eth_amount, token_amount })?,
            ),
            ApiRequest::RemoveLiquidity { currency, address, share_amount } => to_json(
                self.remove_liquidity(&currency, RemoveLiquidityRequest { address, share_amount })?,
            ),
            ApiRequest::SwapEthToToken { currency, address, eth_in, min_out } => to_json(
                self.swap_eth_for_tokens(&currency, SwapEthForTokensRequest { address, eth_in, min_out })?,
            ),
            ApiRequest::SwapTokenToEth { currency, address, token_in, min_out } => to_json(
                self.swap_tokens_for_eth(&currency, SwapTokensForEthRequest { address, token_in, min_out })?,
            ),
            ApiRequest::Simulate { currency, direction, amount_in } => {
                to_json(self.simulate(&currency, direction, amount_in)?)
            }
            ApiRequest::CreatePool { caller, currency, fee_rate_bps } => {
                to_json(self.create_pool(CreatePoolRequest { caller, currency, fee_rate_bps })?)
            }
            ApiRequest::Rates => to_json(self.rates()),
            ApiRequest::Rate { currency } => {
                let rate = self.rate(&currency)?;
                to_json(RateEntry { currency: normalize_symbol(&currency), rate })
            }
            ApiRequest::Convert { currency, fiat_amount } => {
                to_json(self.convert_fiat_to_eth(&currency, fiat_amount)?)
            }
            ApiRequest::CheckOwner { address } => {
                let is_owner = self.check_owner(&address);
                to_json(OwnerCheck { address, is_owner })
            }
            ApiRequest::SetRate { caller, currency, rate, decimals } => {
                to_json(self.set_rate(SetRateRequest { caller, currency, rate, decimals })?)
            }
            ApiRequest::SetStatus { caller, currency, is_active } => {
                to_json(self.set_status(SetStatusRequest { caller, currency, is_active })?)
            }
            ApiRequest::RecordDeposit { address, currency, amount, transaction_hash } => to_json(
                self.record_deposit(DepositRequest { address, currency, amount, transaction_hash })?,
            ),
            ApiRequest::RecordWithdrawal { address, currency, amount, transaction_hash } => to_json(
                self.record_withdrawal(WithdrawalRequest { address, currency, amount, transaction_hash })?,
            ),
            ApiRequest::Transactions { address } => to_json(self.transactions(&address)?),
        }
    }

    /// [`dispatch`](Self::dispatch) folded into a status code and body;
    /// errors become `{ "error", "message" }`.
    pub fn respond(&self, req: ApiRequest) -> ApiResponse {
        let op = req.op();
        match self.dispatch(req) {
            Ok(body) => ApiResponse { status: 200, body },
            Err(err) => {
                tracing::debug!(op, %err, "request failed");
                let body = serde_json::to_value(err.body())
                    .unwrap_or_else(|_| Value::String(err.to_string()));
                ApiResponse { status: err.status_code(), body }
            }
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
