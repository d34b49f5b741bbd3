pub mod analysis;
pub mod archive_fetch;
pub mod fake_feed;
pub mod feed;
pub mod form_store;
pub mod http_client;
pub mod odds_api;
pub mod state;
