#[tokio::main]
async fn main() -> anyhow::Result<()> {
    webhook_gateway::start(std::env::args()).await
}
