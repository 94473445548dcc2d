// Route definitions

use std::convert::Infallible;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use warp::http::Method;
use warp::Filter;

use crate::error::{handle_rejection, ApiError};
use crate::handlers;
use crate::service::ChatService;

/// Largest accepted JSON request body
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

fn with_service(
    service: ChatService,
) -> impl Filter<Extract = (ChatService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Decode a request body the way a lenient JSON body parser does: a body
/// that is empty or not declared as JSON reads as an empty object.
pub(crate) fn parse_json_body<T: DeserializeOwned + Default>(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<T, ApiError> {
    if body.len() as u64 > MAX_BODY_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }

    let is_json = content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false);

    if !is_json || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

fn json_body<T: DeserializeOwned + Default + Send + 'static>(
) -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(|length: Option<u64>| async move {
            match length {
                Some(length) if length > MAX_BODY_BYTES => {
                    Err(warp::Rejection::from(ApiError::PayloadTooLarge))
                }
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::bytes())
        .and_then(|content_type: Option<String>, body: Bytes| async move {
            parse_json_body::<T>(content_type.as_deref(), &body).map_err(warp::Rejection::from)
        })
}

/// REST routes for chats and messages
pub fn chat_routes(
    service: ChatService,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // POST /chats
    let create_chat = warp::path!("chats")
        .and(warp::post())
        .and(json_body())
        .and(with_service(service.clone()))
        .and_then(handlers::create_chat_handler);

    // GET /chats
    let list_chats = warp::path!("chats")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::list_chats_handler);

    // GET /chats/{id}
    let get_chat = warp::path!("chats" / String)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(handlers::get_chat_handler);

    // PUT /chats/{id}
    let update_chat = warp::path!("chats" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_service(service.clone()))
        .and_then(handlers::update_chat_handler);

    // DELETE /chats/{id}
    let delete_chat = warp::path!("chats" / String)
        .and(warp::delete())
        .and(with_service(service.clone()))
        .and_then(handlers::delete_chat_handler);

    // POST /chats/{id}/messages
    let post_message = warp::path!("chats" / String / "messages")
        .and(warp::post())
        .and(json_body())
        .and(with_service(service.clone()))
        .and_then(handlers::post_message_handler);

    // PUT /chats/{chatId}/messages/{messageId}
    let edit_message = warp::path!("chats" / String / "messages" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_service(service))
        .and_then(handlers::edit_message_handler);

    create_chat
        .or(list_chats)
        .or(get_chat)
        .or(update_chat)
        .or(delete_chat)
        .or(post_message)
        .or(edit_message)
}

/// Every route: REST API behind CORS, the event socket, and a health check.
/// All rejections are turned into JSON error responses.
pub fn configure_routes(
    service: ChatService,
    cors_origin: &str,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let cors = warp::cors()
        .allow_origin(cors_origin)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_header("content-type")
        .allow_credentials(true);

    let api = chat_routes(service.clone()).with(cors);

    // GET /ws
    let socket = warp::path!("ws")
        .and(warp::ws())
        .and(with_service(service))
        .map(handlers::socket_handler);

    // GET /health
    let health = warp::path!("health")
        .and(warp::get())
        .and_then(handlers::health_handler);

    health.or(socket).or(api).recover(handle_rejection)
}
