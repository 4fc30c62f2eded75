use crate::app::dto::ApiResponse;

pub async fn health() -> ApiResponse<()> {
    ApiResponse::message("ok")
}
