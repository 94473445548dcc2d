// /chats handlers

use tracing::info;
use warp::http::StatusCode;
use warp::Rejection;

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::models::{ChatNamesRequest, StatusMessage};
use crate::service::ChatService;

// POST /chats
pub async fn create_chat_handler(
    request: ChatNamesRequest,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    info!(first_name = ?request.first_name, last_name = ?request.last_name, "POST /chats");

    let chat = service
        .create_chat(request.first_name, request.last_name)
        .await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&chat),
        StatusCode::CREATED,
    ))
}

// GET /chats
pub async fn list_chats_handler(service: ChatService) -> Result<impl warp::Reply, Rejection> {
    let chats = service.list_chats().await?;
    Ok(warp::reply::json(&chats))
}

// GET /chats/{id}
pub async fn get_chat_handler(
    chat_id: String,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    let chat_id = parse_id(&chat_id).ok_or(ApiError::ChatNotFound)?;
    let chat = service.get_chat(chat_id).await?;
    Ok(warp::reply::json(&chat))
}

// PUT /chats/{id}
pub async fn update_chat_handler(
    chat_id: String,
    request: ChatNamesRequest,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    let chat_id = parse_id(&chat_id).ok_or(ApiError::ChatNotFound)?;
    let chat = service
        .update_chat(chat_id, request.first_name, request.last_name)
        .await?;
    Ok(warp::reply::json(&chat))
}

// DELETE /chats/{id}
pub async fn delete_chat_handler(
    chat_id: String,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    let chat_id = parse_id(&chat_id).ok_or(ApiError::ChatNotFound)?;
    service.delete_chat(chat_id).await?;
    Ok(warp::reply::json(&StatusMessage::new(
        "Chat deleted successfully",
    )))
}
