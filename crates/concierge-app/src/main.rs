//! Concierge terminal runner - composition root.
//!
//! Stands in for the browser presentation layer:
//! 1. Load configuration from TOML
//! 2. Fetch the FAQ document once (degrade on failure, never abort)
//! 3. Build the timeline and widget controller
//! 4. Render widget events from the broadcast channel
//! 5. Drive the controller from a line-oriented stdin loop
//!
//! Commands: `/open`, `/close`, `/ask <n>` (select the n-th suggested
//! question), `/quit`. Any other non-empty line is submitted as a question.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use concierge_chat::knowledge;
use concierge_chat::{Timeline, WidgetController};
use concierge_core::config::ConciergeConfig;
use concierge_core::events::WidgetEvent;
use concierge_core::types::{KnowledgeBase, Role};

#[derive(Parser, Debug)]
#[command(name = "concierge", about = "Headless runner for the Concierge FAQ widget")]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "concierge.toml")]
    config: PathBuf,

    /// Override the knowledge base document path from the config.
    #[arg(long)]
    knowledge: Option<PathBuf>,
}

/// Render widget events as terminal lines until the channel closes.
async fn render_events(mut rx: tokio::sync::broadcast::Receiver<WidgetEvent>) {
    loop {
        match rx.recv().await {
            Ok(WidgetEvent::MessageAppended { message }) => match message.role {
                Role::User => println!("you> {}", message.text),
                Role::Bot if message.is_greeting => println!("bot* {}", message.text),
                Role::Bot => println!("bot> {}", message.text),
            },
            Ok(WidgetEvent::TypingShown) => println!("bot is typing..."),
            Ok(WidgetEvent::TypingHidden) => {}
            Ok(WidgetEvent::TemplateQuestionsShown { questions }) => {
                println!("suggested questions:");
                for (i, q) in questions.iter().enumerate() {
                    println!("  [{}] {}", i + 1, q);
                }
            }
            Ok(WidgetEvent::PanelOpened) => println!("-- panel open --"),
            Ok(WidgetEvent::PanelClosed) => println!("-- panel closed --"),
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Renderer lagged behind event channel");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config first; its log level seeds the default filter.
    let config = ConciergeConfig::load_or_default(&args.config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Concierge v{}", env!("CARGO_PKG_VERSION"));

    // Single fetch attempt. On failure the widget stays up and answers
    // every query with the fixed loading message for the session.
    let kb_path = args
        .knowledge
        .unwrap_or_else(|| PathBuf::from(&config.knowledge.path));
    let kb: Option<Arc<KnowledgeBase>> = match knowledge::load(&kb_path).await {
        Ok(kb) => Some(Arc::new(kb)),
        Err(e) => {
            tracing::warn!(path = %kb_path.display(), error = %e, "Knowledge base unavailable; running degraded");
            None
        }
    };
    let template_questions: Vec<String> = kb
        .as_ref()
        .map(|kb| kb.template_questions.clone())
        .unwrap_or_default();

    let timeline = Arc::new(Mutex::new(Timeline::new(config.widget.event_capacity)));
    let controller = WidgetController::new(
        kb,
        Arc::clone(&timeline),
        Duration::from_millis(config.widget.typing_delay_ms),
    );

    let events = match timeline.lock() {
        Ok(tl) => tl.subscribe(),
        Err(poisoned) => poisoned.into_inner().subscribe(),
    };
    let renderer = tokio::spawn(render_events(events));

    println!("Concierge FAQ widget. /open /close /ask <n> /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/open" => controller.open(),
            "/close" => controller.close(),
            cmd if cmd.starts_with("/ask ") => {
                let picked = cmd
                    .strip_prefix("/ask ")
                    .and_then(|n| n.trim().parse::<usize>().ok())
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| template_questions.get(i));
                match picked {
                    Some(question) => {
                        let _ = controller.select_template_question(question);
                    }
                    None => println!("no such suggested question"),
                }
            }
            text => {
                // Empty input is a silent no-op, same as the widget's guard.
                let _ = controller.submit(text);
            }
        }
    }

    drop(controller);
    drop(timeline);
    let _ = renderer.await;

    tracing::info!("Concierge shut down");
    Ok(())
}
