// /chats/{id}/messages handlers

use tracing::info;
use warp::Rejection;

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::models::MessageContentRequest;
use crate::service::ChatService;

// POST /chats/{id}/messages
pub async fn post_message_handler(
    chat_id: String,
    request: MessageContentRequest,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    info!(chat_id = %chat_id, "POST /chats/:id/messages");

    let chat_id = parse_id(&chat_id).ok_or(ApiError::ChatNotFound)?;
    let chat = service.post_message(chat_id, request.content).await?;

    // The auto-reply arrives later over the socket
    Ok(warp::reply::json(&chat))
}

// PUT /chats/{chatId}/messages/{messageId}
pub async fn edit_message_handler(
    chat_id: String,
    message_id: String,
    request: MessageContentRequest,
    service: ChatService,
) -> Result<impl warp::Reply, Rejection> {
    info!(chat_id = %chat_id, message_id = %message_id, "PUT /chats/:chatId/messages/:messageId");

    let chat_id = parse_id(&chat_id).ok_or(ApiError::ChatNotFound)?;
    let Some(message_id) = parse_id(&message_id) else {
        // Report a missing chat before a malformed message id
        service.get_chat(chat_id).await?;
        return Err(ApiError::MessageNotFound.into());
    };

    let chat = service
        .edit_message(chat_id, message_id, request.content)
        .await?;
    Ok(warp::reply::json(&chat))
}
