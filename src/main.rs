use auth_service::app;
use auth_service::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    app::run().await
}
