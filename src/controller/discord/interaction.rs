use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::shared::structs::AppState;
use crate::shared::structs::discord::interaction::{InteractionRequest, InteractionResponse};
use crate::shared::utility::collect_headers;

pub async fn handle_interaction(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw_body = match String::from_utf8(body.to_vec()) {
        Ok(raw_body) => raw_body,
        Err(e) => {
            let error_msg = format!("Failed to build string from UTF-8 encoded body: {e}");
            tracing::error!("{}", &error_msg);
            return InteractionResponse::error(StatusCode::INTERNAL_SERVER_ERROR, error_msg)
                .into_response();
        }
    };

    let request = InteractionRequest::new(collect_headers(&headers), raw_body);
    app_state.handler.handle(&request).into_response()
}
