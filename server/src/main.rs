use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use backend_client::{CoquiClient, VieNeuClient};
use dual_tts_core::{
    Availability, DualTts, PiperEnglish, PrimaryCapability, SecondaryCapability, VoiceCatalog,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use server::config::{EnglishBackend, ServerConfig};
use server::{build_app, AppState};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    info!("Starting dual TTS server...");
    let config = ServerConfig::from_env();

    // Backend clients are blocking, so build them before entering the runtime
    // and drop them after it has shut down.
    let tts = Arc::new(build_engine(&config)?);

    let voices = VoiceCatalog::from_mapfile(&config.voices_map).unwrap_or_else(|e| {
        warn!("Could not load {}: {e:#}, no preset voices.", config.voices_map.display());
        VoiceCatalog::default()
    });
    info!("Loaded {} preset voice(s)", voices.len());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let result = runtime.block_on(serve(AppState::new(tts.clone(), voices, config)));
    drop(runtime);
    drop(tts);
    result
}

fn build_engine(config: &ServerConfig) -> anyhow::Result<DualTts> {
    info!("Vietnamese backend: VieNeu-TTS at {}", config.vieneu_url);
    let primary: Arc<dyn PrimaryCapability> = Arc::new(VieNeuClient::new(&config.vieneu_url)?);

    let secondary: Availability<Arc<dyn SecondaryCapability>> = match &config.english_backend {
        EnglishBackend::Piper(cfg_path) => {
            info!("English backend: Piper voice {}", cfg_path.display());
            PiperEnglish::probe(cfg_path)
        }
        EnglishBackend::Coqui { url, speaker } => {
            info!("English backend: Coqui tts-server at {url} ({})", config.tts.secondary_model);
            CoquiClient::probe(url, speaker.as_deref())
        }
        EnglishBackend::Disabled => Availability::Unavailable("disabled by ENGLISH_BACKEND".into()),
    };

    Ok(DualTts::new(config.tts.clone(), primary, secondary))
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let config = state.config.clone();
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, max_text_chars={}, sample_rate={}, reference_dir={}",
        config.port,
        config.rate_limit_per_minute,
        config.max_text_chars,
        config.tts.sample_rate,
        config.reference_dir.display()
    );

    let app = build_app(state)?;
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
