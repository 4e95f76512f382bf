use std::sync::Arc;

use atp_server::{
    serve, AgentRegistry, Generator, LoggingGenerator, MockGenerator, ModelAgent, OpenAiGenerator,
    ServerConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atp_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    let generator: Arc<dyn Generator> = match &config.openai_api_key {
        Some(key) => {
            tracing::info!(model = %config.model, base_url = %config.openai_base_url, "using OpenAI-compatible generator");
            Arc::new(OpenAiGenerator::new(key.clone(), config.model.clone(), &config.openai_base_url)?)
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; falling back to the mock generator");
            Arc::new(MockGenerator)
        }
    };

    let agent = ModelAgent::new(
        config.agent_id.clone(),
        config.agent_name.clone(),
        config.profile.profile(),
        Arc::new(LoggingGenerator::new(generator)),
    )
    .with_url(config.public_url.clone());

    let agents = AgentRegistry::new().with(Arc::new(agent));
    serve(agents, &config.bind_addr()).await?;
    Ok(())
}
