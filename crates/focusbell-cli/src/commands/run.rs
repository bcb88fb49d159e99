//! `run`: host one engine over stdin/stdout.
//!
//! Each stdin line is one JSON command, each stdout line one JSON event.
//! Malformed lines are answered with a LOG event and never reach the engine.
//! EOF on stdin closes the command channel; the process exits once the
//! engine has drained its queue.

use std::error::Error;

use focusbell_core::channel::codec;
use focusbell_core::storage::{open_store, SettingsStore};
use focusbell_core::{Config, CoreError, EngineConfig, Event, Supervisor};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::{debug, info, warn};

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let engine_config = config.engine_config()?;
    let store = open_store(config.storage.backend)?;
    info!(backend = ?config.storage.backend, "starting engine host");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(store, engine_config))
}

async fn serve(store: Box<dyn SettingsStore>, config: EngineConfig) -> Result<(), Box<dyn Error>> {
    let mut supervisor = Supervisor::new();
    let engine = supervisor.spawn(store, config).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match engine.send_json(&line) {
                    Ok(()) => {}
                    Err(CoreError::Protocol(e)) => {
                        warn!(error = %e, "rejected input line");
                        write_event(&mut stdout, &Event::log(format!("rejected command: {e}"))).await?;
                    }
                    Err(e) => return Err(e.into()),
                },
                None => {
                    debug!("stdin closed");
                    engine.close_input();
                    input_open = false;
                }
            },
            event = engine.recv() => match event {
                Some(event) => write_event(&mut stdout, &event).await?,
                None => break,
            },
        }
    }

    supervisor.teardown().await;
    info!("engine host stopped");
    Ok(())
}

async fn write_event(out: &mut Stdout, event: &Event) -> Result<(), Box<dyn Error>> {
    let mut line = codec::encode_event(event)?;
    line.push('\n');
    out.write_all(line.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
