use actix_web::{get, web, HttpResponse, Responder};

use crate::apis::images_api::schemas::MessageResponse;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(root).service(ping);
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, body = MessageResponse))
)]
#[get("/")]
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(MessageResponse { message: "API is running".into() })
}

#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, body = MessageResponse))
)]
#[get("/ping")]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(MessageResponse { message: "pong".into() })
}
