pub mod health;

use axum::{
    routing::{get, put},
    Router,
};

use crate::fsbid::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Bid list (bidders)
        .route("/api/v1/fsbid/bidlist/", get(handlers::handle_bidlist))
        .route("/api/v1/fsbid/bidlist/csv/", get(handlers::handle_bidlist_csv))
        .route(
            "/api/v1/fsbid/bidlist/bid/:position_id/",
            put(handlers::handle_submit_bid),
        )
        .route(
            "/api/v1/fsbid/bidlist/position/:position_id/",
            get(handlers::handle_bid_membership)
                .put(handlers::handle_add_bid)
                .delete(handlers::handle_remove_bid),
        )
        // Bids of a bidder (CDOs and assignment officers)
        .route("/api/v1/fsbid/bids/:user_id/", get(handlers::handle_user_bids))
        // Clients (CDOs)
        .route("/api/v1/fsbid/client/", get(handlers::handle_client_search))
        .route("/api/v1/fsbid/client/csv/", get(handlers::handle_client_csv))
        .route(
            "/api/v1/fsbid/client/:perdet_seq_num/",
            get(handlers::handle_single_client),
        )
        .route(
            "/api/v1/fsbid/client/:perdet_seq_num/suggestions/",
            get(handlers::handle_client_suggestions),
        )
        .route(
            "/api/v1/fsbid/client/:perdet_seq_num/classifications/",
            get(handlers::handle_get_classifications)
                .put(handlers::handle_insert_classifications)
                .delete(handlers::handle_delete_classifications),
        )
        .with_state(state)
}
