use crate::core::{find_near, GeoPoint};
use crate::errors::ApiError;
use crate::models::{Entity, LocationQuery, Profile};
use crate::routes::context::CurrentUser;
use crate::routes::{entities, AppState};
use actix_web::{web, HttpResponse};
use validator::Validate;

/// Configure profile routes that go beyond plain CRUD
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/profiles/by-location", web::get().to(profiles_by_location))
        .route("/my-profile", web::get().to(get_my_profile))
        .route("/my-profile", web::put().to(update_my_profile));
}

/// Profiles near a point
///
/// GET /api/profiles/by-location?lat=51.5&long=-0.12&d=10
///
/// Returns `[{"profile": {...}, "distance": 1.2}]`, nearest first, with
/// `distance` in kilometers. Profiles without a location are left out.
async fn profiles_by_location(
    state: web::Data<AppState>,
    query: web::Query<LocationQuery>,
) -> Result<HttpResponse, ApiError> {
    query
        .validate()
        .map_err(|e| ApiError::invalid_body(Profile::schema().entity, &e))?;

    let center = GeoPoint::new(query.lat, query.long);
    tracing::debug!(
        "REST request to get profiles within {}km of ({}, {})",
        query.d,
        center.latitude,
        center.longitude
    );

    let profiles = state.postgres.list_profiles().await?;
    let scanned = profiles.len();
    let results = find_near(center, query.d, profiles);

    tracing::debug!("{} of {} profiles within {}km", results.len(), scanned, query.d);

    Ok(HttpResponse::Ok().json(results))
}

async fn get_my_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    tracing::debug!("REST request to get profile of user {}", user.user_id);

    let profile = find_current_profile(&state, user).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Overwrite the caller's profile. The body's id and userId are replaced
/// with the caller's own.
async fn update_my_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<Profile>,
) -> Result<HttpResponse, ApiError> {
    let mut profile = body.into_inner();
    profile
        .validate()
        .map_err(|e| ApiError::invalid_body(Profile::schema().entity, &e))?;

    let current = find_current_profile(&state, user).await?;
    profile.id = current.id;
    profile.user_id = Some(user.user_id);

    let id = current
        .id
        .ok_or_else(|| ApiError::validation("profile", "idnull", "Invalid id"))?;
    tracing::debug!("REST request to update profile {} of user {}", id, user.user_id);

    match state.postgres.update(id, &profile).await? {
        Some(updated) => Ok(HttpResponse::Ok().json(updated)),
        None => Err(profile_not_exist(user)),
    }
}

async fn find_current_profile(state: &AppState, user: CurrentUser) -> Result<Profile, ApiError> {
    state
        .postgres
        .find_profile_by_user(user.user_id)
        .await?
        .ok_or_else(|| profile_not_exist(user))
}

fn profile_not_exist(user: CurrentUser) -> ApiError {
    ApiError::NotFound {
        entity: "profile",
        key: "profileNotExist",
        message: format!("No profile for user {}", user.user_id),
    }
}

/// Register every profile route
pub fn configure_all(cfg: &mut web::ServiceConfig) {
    configure(cfg);
    cfg.route("/profiles", web::post().to(entities::create::<Profile>));
    entities::configure::<Profile>(cfg, "/profiles");
}
