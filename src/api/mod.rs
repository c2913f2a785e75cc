use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub mod v1;

/// Every route under `/api`, errors already turned into replies.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(v1::routes(server))
        .recover(v1::recover_error)
        .with(warp::trace::request())
}
