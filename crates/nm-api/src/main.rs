#[tokio::main]
async fn main() {
    if let Err(err) = nm_api::run().await {
        tracing::error!(error = %err, "nm-api failed");
        std::process::exit(1);
    }
}
