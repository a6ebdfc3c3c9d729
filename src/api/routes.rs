use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// Paths sit at the root so peers can fetch `/get_chain` directly.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/mine_block", web::get().to(handlers::mine_block))
        .route("/get_chain", web::get().to(handlers::get_chain))
        .route("/confirm_chain", web::get().to(handlers::confirm_chain))
        .route(
            "/new_transaction_from_node",
            web::post().to(handlers::new_transaction_from_node),
        )
        .route("/new_transaction", web::post().to(handlers::new_transaction))
        .route(
            "/transaction_status/{id}",
            web::get().to(handlers::transaction_status),
        )
        .route(
            "/cancel_transaction/{id}",
            web::delete().to(handlers::cancel_transaction),
        )
        .route(
            "/get_transaction_pool",
            web::get().to(handlers::get_transaction_pool),
        )
        .route("/get_balance", web::get().to(handlers::get_balance))
        .route(
            "/get_transaction_history",
            web::get().to(handlers::get_transaction_history),
        )
        .route("/connect_node", web::post().to(handlers::connect_node))
        .route("/replace_chain", web::get().to(handlers::replace_chain))
        .route("/make_wallet", web::get().to(handlers::make_wallet));
}
