use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::{ConsensusEngine, HashScheme, HttpPeerFetcher, Ledger, Wallet};
use config::Settings;

/// A minimal proof-of-work ledger node
#[derive(Parser, Debug)]
#[command(name = "noahcoin", version)]
struct Cli {
    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "NOAHCOIN_PORT")]
    port: Option<u16>,

    /// Block hash scheme
    #[arg(long, value_enum)]
    variant: Option<HashScheme>,

    /// Leading zero hex digits required of a block hash
    #[arg(long)]
    difficulty: Option<usize>,
}

impl Cli {
    fn settings(self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;

        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(variant) = self.variant {
            settings.variant = variant;
        }
        if self.difficulty.is_some() {
            settings.difficulty = self.difficulty;
        }

        settings.check()?;
        Ok(settings)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::mine_block,
        api::handlers::get_chain,
        api::handlers::confirm_chain,
        api::handlers::new_transaction_from_node,
        api::handlers::new_transaction,
        api::handlers::transaction_status,
        api::handlers::cancel_transaction,
        api::handlers::get_transaction_pool,
        api::handlers::get_balance,
        api::handlers::get_transaction_history,
        api::handlers::connect_node,
        api::handlers::replace_chain,
        api::handlers::make_wallet
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::TransactionRecord,
            blockchain::Address,
            blockchain::ChainSnapshot,
            api::handlers::MessageResponse,
            api::handlers::MineResponse,
            api::handlers::NodeTransactionRequest,
            api::handlers::NewTransactionRequest,
            api::handlers::BalanceResponse,
            api::handlers::ConnectNodeRequest,
            api::handlers::ConnectNodeResponse,
            api::handlers::ReplaceChainResponse,
            api::handlers::WalletResponse
        )
    ),
    tags(
        (name = "noahcoin", description = "Ledger node endpoints")
    ),
    info(
        title = "NoahCoin API",
        version = "0.1.0",
        description = "A minimal proof-of-work ledger node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Cli::parse().settings()?;

    let wallet = Wallet::generate().context("failed to create node wallet")?;
    let ledger = Arc::new(Ledger::new(settings.proof_of_work(), wallet, &settings.genesis)?);

    let pow = ledger.pow();
    info!(
        "Ledger ready: {:?} hashing at difficulty {}, node wallet {}",
        pow.scheme(),
        pow.difficulty(),
        ledger.wallet().address()
    );

    let consensus = ConsensusEngine::new(
        ledger.clone(),
        Box::new(HttpPeerFetcher::new(settings.peer_timeout())),
    );
    for peer in &settings.bootstrap_peers {
        if let Err(err) = consensus.add_node(peer) {
            warn!("Ignoring bootstrap peer: {}", err);
        }
    }

    let ledger = web::Data::from(ledger);
    let consensus = web::Data::new(consensus);

    info!("Starting HTTP server at http://{}:{}", settings.host, settings.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            .app_data(consensus.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await?;

    Ok(())
}
