use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dialog_cli::main_entry().await
}
