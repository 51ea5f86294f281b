#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    stagerun::cli::run().await
}
