use actix_web::HttpResponse;

/// `GET /health_check`
///
/// Used by the deployment platform's liveness probe. Does not touch the
/// mailing-list provider.
pub async fn health_check() -> HttpResponse { HttpResponse::Ok().finish() }
