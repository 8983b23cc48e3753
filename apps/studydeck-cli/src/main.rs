#[tokio::main]
async fn main() -> anyhow::Result<()> {
    studydeck_cli::run().await
}
