use anyhow::{Context, Result};
use parking_lot::Mutex;
use sahayak::emergency::{EmergencyFlow, SystemLauncher, UnavailableLocation};
use sahayak::integration::{
    AppConfig, ConversationOrchestrator, Session, SessionCommand,
};
use sahayak::llm::{GeminiClient, PromptComposer};
use sahayak::preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences,
};
use sahayak::speech::{CommandSpeechEngine, NativeSpeechBridge};
use sahayak::ui::TerminalRenderer;
use sahayak::utils::SessionChannels;
use std::sync::Arc;
use std::thread;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so the conversation on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sahayak=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Sahayak assistant");

    let config_path = AppConfig::path_from_args(std::env::args().skip(1));
    let config = AppConfig::resolve(config_path).context("loading configuration")?;
    if config.api.key().is_none() {
        warn!("GEMINI_API_KEY is not set; answers will fail until it is configured");
    }

    let store: Box<dyn PreferenceStore> = match config.preferences_path() {
        Some(path) => Box::new(FilePreferenceStore::open(path)),
        None => {
            warn!("No config directory found; preferences will not be saved");
            Box::new(MemoryPreferenceStore::new())
        }
    };
    let preferences = Arc::new(Mutex::new(Preferences::load(store, config.display.clone())));

    let channels = SessionChannels::new();

    let engine = CommandSpeechEngine::from_config(&config.speech);
    let speech = NativeSpeechBridge::new(engine, config.speech.clone(), channels.speech_tx.clone());
    let client = GeminiClient::new(config.api.clone()).context("creating completion client")?;

    let orchestrator = ConversationOrchestrator::builder(Arc::new(client))
        .with_composer(PromptComposer::new(config.prompts.clone()))
        .with_speech(Box::new(speech))
        .with_preferences(preferences)
        .with_channels(&channels)
        .build();

    let emergency = EmergencyFlow::new(
        config.emergency.clone(),
        Arc::new(UnavailableLocation),
        Arc::new(SystemLauncher::default()),
    );

    let session = Arc::new(Session::new(orchestrator, emergency));

    let event_rx = channels.event_rx.clone();
    let renderer = thread::spawn(move || {
        TerminalRenderer::new(std::io::stdout()).run(event_rx);
    });

    // Bridge callbacks arrive on engine threads; hand them to the event loop
    let (speech_tx, mut speech_rx) = mpsc::unbounded_channel();
    let speech_events = channels.speech_rx.clone();
    thread::spawn(move || {
        for event in speech_events.iter() {
            if speech_tx.send(event).is_err() {
                break;
            }
        }
    });

    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading input")? else {
                    session.execute(SessionCommand::Quit).await;
                    break;
                };

                let command = match SessionCommand::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        session.notify(e.to_string());
                        continue;
                    }
                };

                if command == SessionCommand::Quit {
                    session.execute(command).await;
                    break;
                }

                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.execute(command).await;
                });
            }
            Some(event) = speech_rx.recv() => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.handle_speech_event(event).await;
                });
            }
        }
    }

    if renderer.join().is_err() {
        warn!("Renderer thread panicked");
    }
    info!("Sahayak stopped");
    Ok(())
}
