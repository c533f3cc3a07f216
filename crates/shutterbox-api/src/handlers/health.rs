#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = String)
    )
)]
pub async fn health() -> &'static str {
    "OK"
}
