//! CRUD and criteria listing, shared by every entity.

use crate::core::{build, parse_criteria, parse_page};
use crate::errors::ApiError;
use crate::models::Entity;
use crate::routes::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

/// Register list, count, get, update and delete under `base`.
///
/// Create is registered separately so entities with their own creation
/// rules can supply a handler. Routes more specific than `{base}/{id}` must
/// be registered before this is called.
pub fn configure<E: Entity>(cfg: &mut web::ServiceConfig, base: &str) {
    cfg.route(base, web::get().to(list::<E>))
        .route(base, web::put().to(update::<E>))
        .route(&format!("{base}/count"), web::get().to(count::<E>))
        .route(&format!("{base}/{{id}}"), web::get().to(get::<E>))
        .route(&format!("{base}/{{id}}"), web::delete().to(delete::<E>));
}

/// `GET {base}?attr.op=value&page=&size=&sort=`
pub async fn list<E: Entity>(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, ApiError> {
    let schema = E::schema();
    let pairs = query.into_inner();

    let criteria =
        parse_criteria(schema, &pairs).map_err(|e| ApiError::from_params(schema.entity, e))?;
    let page = parse_page(
        schema,
        &pairs,
        state.pagination.default_page_size,
        state.pagination.max_page_size,
    )
    .map_err(|e| ApiError::from_params(schema.entity, e))?;

    tracing::debug!("REST request to get {} by criteria: {:?}", schema.entity, criteria);

    let predicate = build(&criteria);
    let total = state.postgres.count_by_criteria::<E>(&predicate).await?;
    let items = state.postgres.find_by_criteria::<E>(&predicate, &page).await?;

    Ok(HttpResponse::Ok()
        .insert_header(("X-Total-Count", total.to_string()))
        .json(items))
}

/// `GET {base}/count?attr.op=value`
pub async fn count<E: Entity>(
    state: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, ApiError> {
    let schema = E::schema();
    let criteria = parse_criteria(schema, &query)
        .map_err(|e| ApiError::from_params(schema.entity, e))?;

    tracing::debug!("REST request to count {} by criteria: {:?}", schema.entity, criteria);

    let total = state.postgres.count_by_criteria::<E>(&build(&criteria)).await?;
    Ok(HttpResponse::Ok().json(total))
}

pub async fn get<E: Entity>(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let entity = E::schema().entity;
    tracing::debug!("REST request to get {} : {}", entity, id);

    match state.postgres.find_one::<E>(id).await? {
        Some(found) => Ok(HttpResponse::Ok().json(found)),
        None => Err(ApiError::not_found(entity, format!("{} {} not found", entity, id))),
    }
}

/// `POST {base}`. The body must not carry an id.
pub async fn create<E: Entity>(
    state: web::Data<AppState>,
    body: web::Json<E>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let mut entity = body.into_inner();
    let name = E::schema().entity;
    tracing::debug!("REST request to save {}", name);

    entity.validate().map_err(|e| ApiError::invalid_body(name, &e))?;
    if entity.id().is_some() {
        return Err(ApiError::conflict(
            name,
            "idexists",
            format!("A new {} cannot already have an ID", name),
        ));
    }

    entity.prepare_insert(chrono::Utc::now());
    let saved = state.postgres.insert(&entity).await?;

    Ok(created(&req, saved))
}

/// 201 with a `Location` header pointing at the new row
pub fn created<E: Entity>(req: &HttpRequest, saved: E) -> HttpResponse {
    let mut response = HttpResponse::Created();
    if let Some(id) = saved.id() {
        response.insert_header(("Location", format!("{}/{}", req.path(), id)));
    }
    response.json(saved)
}

/// `PUT {base}`. The body must carry the id of an existing row.
pub async fn update<E: Entity>(
    state: web::Data<AppState>,
    body: web::Json<E>,
) -> Result<HttpResponse, ApiError> {
    let entity = body.into_inner();
    let name = E::schema().entity;

    entity.validate().map_err(|e| ApiError::invalid_body(name, &e))?;
    let id = entity
        .id()
        .ok_or_else(|| ApiError::validation(name, "idnull", "Invalid id"))?;

    tracing::debug!("REST request to update {} : {}", name, id);

    match state.postgres.update(id, &entity).await? {
        Some(updated) => Ok(HttpResponse::Ok().json(updated)),
        None => Err(ApiError::not_found(name, format!("{} {} not found", name, id))),
    }
}

pub async fn delete<E: Entity>(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let name = E::schema().entity;
    tracing::debug!("REST request to delete {} : {}", name, id);

    if state.postgres.delete::<E>(id).await? {
        Ok(HttpResponse::Ok().finish())
    } else {
        Err(ApiError::not_found(name, format!("{} {} not found", name, id)))
    }
}
