mod jwt_token_codec;
mod session_service_impl;
mod user_service_impl;

pub use jwt_token_codec::*;
pub use session_service_impl::*;
pub use user_service_impl::*;
