use agent::runtime::{boot, cycle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (state, orchestrator) = boot::boot().await?;
    cycle::run(state, orchestrator).await
}
