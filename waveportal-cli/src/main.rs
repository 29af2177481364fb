use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    waveportal_cli::run().await?;
    Ok(())
}
