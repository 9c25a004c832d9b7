// Route exports
pub mod context;
pub mod direct_messages;
pub mod entities;
pub mod health;
pub mod profiles;

use crate::config::PaginationSettings;
use crate::models::{Entity, Gender, Invitation, Location, Relationship};
use crate::services::PostgresClient;
use actix_web::web;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub pagination: PaginationSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(health::configure)
            .configure(profiles::configure_all)
            .configure(direct_messages::configure)
            .configure(|cfg| crud::<Location>(cfg, "/locations"))
            .configure(|cfg| crud::<Invitation>(cfg, "/invitations"))
            .configure(|cfg| crud::<Relationship>(cfg, "/relationships"))
            .configure(|cfg| crud::<Gender>(cfg, "/genders")),
    );
}

fn crud<E: Entity>(cfg: &mut web::ServiceConfig, base: &str) {
    cfg.route(base, web::post().to(entities::create::<E>));
    entities::configure::<E>(cfg, base);
}
