mod oauth;
mod session;
mod user;

pub use oauth::*;
pub use session::*;
pub use user::*;
