use crate::core::are_connected;
use crate::errors::ApiError;
use crate::models::{DirectMessage, Entity, Profile};
use crate::routes::context::CurrentUser;
use crate::routes::{entities, AppState};
use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

const ENTITY: &str = "directMessage";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/direct-messages", web::post().to(create_direct_message));
    entities::configure::<DirectMessage>(cfg, "/direct-messages");
}

/// Send a message from the caller's profile
///
/// POST /api/direct-messages
///
/// The sender is always the caller's profile. The recipient must be a
/// profile the caller shares an accepted invitation with, in either
/// direction.
async fn create_direct_message(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<DirectMessage>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let mut message = body.into_inner();
    tracing::debug!("REST request to save direct message from user {}", user.user_id);

    message
        .validate()
        .map_err(|e| ApiError::invalid_body(ENTITY, &e))?;

    if message.id.is_some() {
        return Err(ApiError::conflict(
            ENTITY,
            "idexists",
            "A new directMessage cannot already have an ID",
        ));
    }

    let recipient_id = message.recipient_id.ok_or_else(|| {
        ApiError::validation(ENTITY, "recipientisnull", "A new directMessage must have a recipient")
    })?;

    if state.postgres.find_one::<Profile>(recipient_id).await?.is_none() {
        return Err(ApiError::validation(
            ENTITY,
            "recipientIdInvalid",
            format!("Recipient profile {} does not exist", recipient_id),
        ));
    }

    let sender_id = state
        .postgres
        .find_profile_by_user(user.user_id)
        .await?
        .and_then(|profile| profile.id)
        .ok_or_else(|| {
            ApiError::validation(
                ENTITY,
                "profileNotFound",
                format!("User {} has no profile", user.user_id),
            )
        })?;

    let invitations = state.postgres.accepted_invitations(sender_id).await?;
    if !are_connected(sender_id, recipient_id, &invitations) {
        tracing::info!(
            "Rejected direct message from profile {} to non-connection {}",
            sender_id,
            recipient_id
        );
        return Err(ApiError::domain_rule(
            ENTITY,
            "noFriendWithRecipient",
            "The recipient is not a connection",
        ));
    }

    message.sender_id = Some(sender_id);
    message.prepare_insert(chrono::Utc::now());
    let saved = state.postgres.insert(&message).await?;

    Ok(entities::created(&req, saved))
}
