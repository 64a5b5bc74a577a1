#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sender_worker::start(std::env::args()).await
}
