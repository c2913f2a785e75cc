mod kakao_oauth_client;
mod oauth_provider_fake;

pub use kakao_oauth_client::*;
pub use oauth_provider_fake::*;
