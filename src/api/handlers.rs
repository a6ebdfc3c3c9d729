use std::net::IpAddr;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::blockchain::{
    Address, Block, ChainSnapshot, ConsensusEngine, Ledger, Transaction, TransactionRecord, Wallet,
};

/// Shared ledger state
pub type LedgerData = web::Data<Ledger>;

/// Shared peer list and consensus
pub type ConsensusData = web::Data<ConsensusEngine>;

/// Plain message response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

fn message(text: impl Into<String>) -> MessageResponse {
    MessageResponse {
        message: text.into(),
    }
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    pub message: String,
    pub block_number: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    pub hash: String,
    pub previous_hash: String,
}

/// Mine a new block
///
/// Mines every pending transaction into a new block. This can take a while at
/// higher difficulties.
#[utoipa::path(
    get,
    path = "/mine_block",
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 500, description = "Mining failed", body = MessageResponse)
    )
)]
pub async fn mine_block(ledger: LedgerData) -> impl Responder {
    let miner = ledger.clone();

    match web::block(move || miner.create_block()).await {
        Ok(Ok(block)) => HttpResponse::Ok().json(MineResponse {
            message: "Congratulations, you just mined a block!".to_string(),
            block_number: block.block_number,
            transactions: block.transactions,
            nonce: block.nonce,
            hash: block.hash,
            previous_hash: block.previous_hash,
        }),
        Ok(Err(err)) => {
            error!("Failed to mine block: {}", err);
            HttpResponse::InternalServerError().json(message(format!("Failed to mine block: {}", err)))
        }
        Err(err) => {
            error!("Mining task did not complete: {}", err);
            HttpResponse::InternalServerError().json(message("Mining task did not complete"))
        }
    }
}

/// Get the full blockchain
#[utoipa::path(
    get,
    path = "/get_chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainSnapshot)
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    let ledger = ledger.into_inner();

    match web::block(move || ledger.chain()).await {
        Ok(chain) => HttpResponse::Ok().json(ChainSnapshot::new(chain)),
        Err(err) => {
            error!("Chain read did not complete: {}", err);
            HttpResponse::InternalServerError().json(message("Chain read did not complete"))
        }
    }
}

/// Check if the blockchain is valid
///
/// Replays the whole chain from genesis
#[utoipa::path(
    get,
    path = "/confirm_chain",
    responses(
        (status = 200, description = "Chain is valid", body = MessageResponse),
        (status = 400, description = "Chain is invalid; the message names the first failure", body = MessageResponse)
    )
)]
pub async fn confirm_chain(ledger: LedgerData) -> impl Responder {
    let ledger = ledger.into_inner();

    match web::block(move || ledger.is_valid()).await {
        Ok((true, reason)) => HttpResponse::Ok().json(message(reason)),
        Ok((false, reason)) => HttpResponse::BadRequest().json(message(reason)),
        Err(err) => {
            error!("Chain check did not complete: {}", err);
            HttpResponse::InternalServerError().json(message("Chain check did not complete"))
        }
    }
}

/// Request for the node transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NodeTransactionRequest {
    pub recipient: Option<Address>,
    pub amount: Option<i64>,
}

fn is_local(req: &HttpRequest) -> bool {
    match req.peer_addr().map(|addr| addr.ip()) {
        Some(IpAddr::V4(ip)) => ip.is_loopback(),
        Some(IpAddr::V6(ip)) => ip.to_ipv4_mapped().map_or(ip.is_loopback(), |v4| v4.is_loopback()),
        None => false,
    }
}

/// Send coins from the node's own wallet
///
/// Only accepted from the local machine
#[utoipa::path(
    post,
    path = "/new_transaction_from_node",
    request_body = NodeTransactionRequest,
    responses(
        (status = 200, description = "Transaction added to the pool", body = MessageResponse),
        (status = 400, description = "Missing fields or rejected transaction", body = MessageResponse),
        (status = 403, description = "Request did not come from the local machine", body = MessageResponse)
    )
)]
pub async fn new_transaction_from_node(
    req: HttpRequest,
    ledger: LedgerData,
    body: web::Json<NodeTransactionRequest>,
) -> impl Responder {
    if !is_local(&req) {
        warn!("Rejected node transaction from {:?}", req.peer_addr());
        return HttpResponse::Forbidden().json(message("Access denied"));
    }

    let NodeTransactionRequest { recipient, amount } = body.into_inner();
    let (recipient, amount) = match (recipient, amount) {
        (Some(recipient), Some(amount)) => (recipient, amount),
        _ => return HttpResponse::BadRequest().json(message("Missing fields in transaction data")),
    };

    match ledger.sign_and_submit(recipient, amount) {
        Ok(text) => HttpResponse::Ok().json(message(text)),
        Err(err) => HttpResponse::BadRequest().json(message(err.to_string())),
    }
}

/// Request for the new transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NewTransactionRequest {
    pub sender: Option<Address>,
    pub recipient: Option<Address>,
    pub amount: Option<i64>,
    /// Hex signature over the transaction data
    pub signature: Option<String>,
    /// Sender's public key, x-coordinate only
    pub public_key: Option<String>,
    /// Creation time as signed; now when absent
    pub timestamp: Option<String>,
    pub id: Option<String>,
}

impl NewTransactionRequest {
    fn into_transaction(self) -> Option<Transaction> {
        let record = TransactionRecord {
            sender: self.sender?,
            recipient: self.recipient?,
            amount: self.amount?,
            public_key: self.public_key?,
            signature: Some(self.signature?),
            timestamp: self.timestamp,
            id: self.id,
        };
        Some(Transaction::from(record))
    }
}

/// Submit a signed transaction
#[utoipa::path(
    post,
    path = "/new_transaction",
    request_body = NewTransactionRequest,
    responses(
        (status = 200, description = "Transaction added to the pool", body = MessageResponse),
        (status = 400, description = "Missing fields or rejected transaction", body = MessageResponse)
    )
)]
pub async fn new_transaction(
    ledger: LedgerData,
    body: web::Json<NewTransactionRequest>,
) -> impl Responder {
    let transaction = match body.into_inner().into_transaction() {
        Some(transaction) => transaction,
        None => return HttpResponse::BadRequest().json(message("Missing fields in transaction data")),
    };

    match ledger.add_transaction(transaction) {
        Ok(text) => HttpResponse::Ok().json(message(text)),
        Err(err) => HttpResponse::BadRequest().json(message(err.to_string())),
    }
}

/// Look up where a transaction is
#[utoipa::path(
    get,
    path = "/transaction_status/{id}",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction is pending or confirmed", body = MessageResponse),
        (status = 404, description = "Transaction not found", body = MessageResponse)
    )
)]
pub async fn transaction_status(ledger: LedgerData, id: web::Path<String>) -> impl Responder {
    match ledger.get_transaction_status(&id) {
        Ok(status) => HttpResponse::Ok().json(message(status.to_string())),
        Err(err) => HttpResponse::NotFound().json(message(err.to_string())),
    }
}

/// Remove a pending transaction from the pool
#[utoipa::path(
    delete,
    path = "/cancel_transaction/{id}",
    params(("id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction cancelled", body = MessageResponse),
        (status = 404, description = "Transaction not found in the pool", body = MessageResponse)
    )
)]
pub async fn cancel_transaction(ledger: LedgerData, id: web::Path<String>) -> impl Responder {
    match ledger.cancel_transaction(&id) {
        Ok(_) => HttpResponse::Ok().json(message("Transaction canceled successfully")),
        Err(err) => HttpResponse::NotFound().json(message(err.to_string())),
    }
}

/// Get all pending transactions
#[utoipa::path(
    get,
    path = "/get_transaction_pool",
    responses(
        (status = 200, description = "Pending transactions in admission order", body = Vec<Transaction>)
    )
)]
pub async fn get_transaction_pool(ledger: LedgerData) -> impl Responder {
    HttpResponse::Ok().json(ledger.pending_transactions())
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddressQuery {
    /// Address to look up
    pub address: Option<String>,
}

/// Response for the balance endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub address: Address,
    /// Confirmed balance minus pending outgoing amounts
    pub balance: i64,
}

/// Get the spendable balance of an address
#[utoipa::path(
    get,
    path = "/get_balance",
    params(AddressQuery),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse),
        (status = 400, description = "Address parameter is missing", body = MessageResponse)
    )
)]
pub async fn get_balance(ledger: LedgerData, query: web::Query<AddressQuery>) -> impl Responder {
    let address = match query.into_inner().address.filter(|address| !address.is_empty()) {
        Some(address) => Address::from(address),
        None => return HttpResponse::BadRequest().json(message("Address parameter is missing")),
    };

    let balance = ledger.get_balance(&address);
    HttpResponse::Ok().json(BalanceResponse { address, balance })
}

/// Confirmed transactions sent or received by an address
#[utoipa::path(
    get,
    path = "/get_transaction_history",
    params(AddressQuery),
    responses(
        (status = 200, description = "Confirmed transactions, oldest first", body = Vec<Transaction>),
        (status = 400, description = "Address parameter is missing", body = MessageResponse)
    )
)]
pub async fn get_transaction_history(
    ledger: LedgerData,
    query: web::Query<AddressQuery>,
) -> impl Responder {
    match query.into_inner().address.filter(|address| !address.is_empty()) {
        Some(address) => HttpResponse::Ok().json(ledger.transaction_history(&Address::from(address))),
        None => HttpResponse::BadRequest().json(message("Address parameter is missing")),
    }
}

/// Request for the connect node endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConnectNodeRequest {
    /// Peer URLs such as `http://127.0.0.1:5002`
    pub nodes: Option<Vec<String>>,
}

/// Response for the connect node endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ConnectNodeResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

/// Register peers
#[utoipa::path(
    post,
    path = "/connect_node",
    request_body = ConnectNodeRequest,
    responses(
        (status = 201, description = "Peers registered", body = ConnectNodeResponse),
        (status = 400, description = "No nodes given or a URL has no scheme; nothing is registered", body = MessageResponse)
    )
)]
pub async fn connect_node(
    consensus: ConsensusData,
    body: web::Json<ConnectNodeRequest>,
) -> impl Responder {
    let nodes = match body.into_inner().nodes {
        Some(nodes) => nodes,
        None => return HttpResponse::BadRequest().json(message("No node")),
    };

    if let Err(err) = consensus.add_nodes(nodes.as_slice()) {
        return HttpResponse::BadRequest().json(message(err.to_string()));
    }

    HttpResponse::Created().json(ConnectNodeResponse {
        message: "All the nodes are now connected. The NoahCoin Blockchain now contains the following nodes:"
            .to_string(),
        total_nodes: consensus.nodes(),
    })
}

/// Response for the replace chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReplaceChainResponse {
    pub message: String,
    pub new_chain: Vec<Block>,
}

/// Adopt the longest valid chain among known peers
#[utoipa::path(
    get,
    path = "/replace_chain",
    responses(
        (status = 200, description = "Local chain after consensus", body = ReplaceChainResponse)
    )
)]
pub async fn replace_chain(ledger: LedgerData, consensus: ConsensusData) -> impl Responder {
    let text = if consensus.replace_chain().await {
        "Local chain was replaced by a larger valid chain."
    } else {
        "All good. Local chain is the largest valid chain."
    };

    HttpResponse::Ok().json(ReplaceChainResponse {
        message: text.to_string(),
        new_chain: ledger.chain(),
    })
}

/// Response for the make wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// Hex private key
    pub private_key: String,

    /// Hex public key, x-coordinate only
    pub public_key: String,

    pub noahcoin_address: Address,
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair. The node keeps no copy; the
/// private key must be stored by the caller.
#[utoipa::path(
    get,
    path = "/make_wallet",
    responses(
        (status = 200, description = "Wallet created successfully", body = WalletResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    )
)]
pub async fn make_wallet() -> impl Responder {
    match Wallet::generate() {
        Ok(wallet) => HttpResponse::Ok().json(WalletResponse {
            private_key: wallet.private_key().to_string(),
            public_key: wallet.public_key().to_string(),
            noahcoin_address: wallet.address().clone(),
        }),
        Err(err) => HttpResponse::InternalServerError()
            .json(message(format!("Failed to create wallet: {}", err))),
    }
}
