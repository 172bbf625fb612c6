#[tokio::main]
async fn main() -> anyhow::Result<()> {
    exercise_backend::run().await
}
