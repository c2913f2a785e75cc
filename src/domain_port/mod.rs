// provider

mod oauth_provider;

pub use oauth_provider::*;

// store

mod refresh_token_store;

pub use refresh_token_store::*;

// repo

mod repo_error;
mod user_repo;

pub use repo_error::*;
pub use user_repo::*;
