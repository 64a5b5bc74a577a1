#[tokio::main]
async fn main() -> anyhow::Result<()> {
    batch_processor::start(std::env::args()).await
}
