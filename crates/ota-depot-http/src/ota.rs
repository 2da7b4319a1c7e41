use axum::{
    extract::{ConnectInfo, Path, Request, State, rejection::PathRejection},
    http::Method,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::{AppState, assembler, validator};

/// Update check from a device: `/.ota/<anything>/<family>.bin`
///
/// A path that is missing or does not percent-decode to UTF-8 is handed to
/// the validator as empty, so header checks still answer first.
pub async fn check_update(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    request: Request,
) -> Response {
    let path = path.map(|Path(path)| path).unwrap_or_default();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let update = match validator::validate(request.headers(), &path, peer) {
        Ok(update) => update,
        Err(rejection) => return rejection.into_response(),
    };

    let outcome = state
        .resolver
        .resolve(&update.firmware_family, &update.client_version)
        .await;
    let report_abort = *request.method() != Method::HEAD;
    assembler::assemble(&update.firmware_family, outcome, report_abort).await
}
