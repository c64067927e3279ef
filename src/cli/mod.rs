//! CLI mode for camsync - talking to the camera from a terminal.

mod progress;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar};
use tokio::sync::broadcast;

use crate::{Bridge, CameraConfig, Error, SessionEvent};

use progress::{describe_event, make_batch_bar, make_progress_bar, print_catalog, print_summary};

/// How long the shutter stays pressed.
const SHUTTER_HOLD: Duration = Duration::from_millis(200);

/// A parsed command line action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Supervise the connection and print every change until interrupted.
    Watch,
    List,
    Download {
        reduced: bool,
        /// Identifiers to fetch; empty together with `all` means everything.
        ids: Vec<String>,
        all: bool,
    },
    Power(bool),
    Mode(String),
    Shutter,
}

impl Command {
    /// Parses the words following the global options.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let (name, rest) = args.split_first().ok_or("missing command")?;
        match name.as_str() {
            "watch" => Ok(Self::Watch),
            "list" => Ok(Self::List),
            "download" => {
                let mut reduced = false;
                let mut all = false;
                let mut ids = Vec::new();
                for arg in rest {
                    match arg.as_str() {
                        "--reduced" | "-r" => reduced = true,
                        "--all" | "-a" => all = true,
                        flag if flag.starts_with('-') => {
                            return Err(format!("unknown download option: {flag}"));
                        }
                        id => ids.push(id.to_string()),
                    }
                }
                if !all && ids.is_empty() {
                    return Err("download needs --all or at least one identifier".to_string());
                }
                Ok(Self::Download { reduced, ids, all })
            }
            "power" => match rest.first().map(String::as_str) {
                Some("on") => Ok(Self::Power(true)),
                Some("off") => Ok(Self::Power(false)),
                _ => Err("power needs 'on' or 'off'".to_string()),
            },
            "mode" => rest
                .first()
                .map(|mode| Self::Mode(mode.clone()))
                .ok_or_else(|| "mode needs one of rec, play, shutter, standalone".to_string()),
            "shutter" => Ok(Self::Shutter),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Probes the camera once, then waits for the catalog sync that follows.
async fn connect(
    bridge: &Bridge,
    events: &mut broadcast::Receiver<SessionEvent>,
    wait_for_catalog: bool,
) -> crate::Result<()> {
    println!("Connecting to {}...", bridge.config().host);
    bridge.connect().await.map_err(std::io::Error::other)?;
    let state = bridge.session().state().await;
    if !state.connected {
        return Err(Error::Protocol(format!(
            "no camera answering at {}",
            bridge.config().host
        )));
    }
    println!("Connected to {}{}", state.model, if state.opc { " (OPC)" } else { "" });

    if wait_for_catalog {
        let wait = async {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::CountChanged(_)) | Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                    _ => {}
                }
            }
        };
        if tokio::time::timeout(bridge.config().poll_interval, wait)
            .await
            .is_err()
        {
            log::warn!("Camera did not provide a file listing");
        }
    }
    Ok(())
}

/// Prints session events until Ctrl-C.
async fn watch(bridge: &Bridge, mut events: broadcast::Receiver<SessionEvent>) -> crate::Result<()> {
    let supervisor = bridge.start();
    println!("Watching {} (Ctrl-C to stop)", bridge.config().host);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        println!("{line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("Missed {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    supervisor.abort();
    Ok(())
}

/// Drives per-file progress bars from transfer events.
async fn show_progress(mut events: broadcast::Receiver<SessionEvent>, sizes: HashMap<String, (u64, String)>) {
    let progress = MultiProgress::new();
    let batch = progress.add(make_batch_bar(sizes.len()));
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();

    loop {
        match events.recv().await {
            Ok(SessionEvent::TransferProgress { id, bytes }) => {
                let bar = bars.entry(id.clone()).or_insert_with(|| {
                    let (size, name) = sizes.get(&id).cloned().unwrap_or_default();
                    let bar = progress.insert_before(&batch, make_progress_bar(size, &name));
                    bar.enable_steady_tick(Duration::from_millis(250));
                    bar
                });
                bar.set_position(bytes);
            }
            Ok(SessionEvent::EntryUpdated(entry)) if !entry.downloading => {
                if let Some(bar) = bars.remove(&entry.id) {
                    if entry.downloaded {
                        bar.finish_and_clear();
                        let _ = progress.println(format!("  {} done", entry.file_name));
                    } else {
                        bar.abandon();
                    }
                }
                batch.inc(1);
            }
            Ok(SessionEvent::DownloadingChanged(false)) | Err(broadcast::error::RecvError::Closed) => {
                break;
            }
            _ => {}
        }
    }
    batch.finish_and_clear();
    progress.clear().ok();
}

async fn download(
    bridge: &Bridge,
    reduced: bool,
    ids: Vec<String>,
    all: bool,
) -> crate::Result<()> {
    let catalog = bridge.session().catalog().await;
    let wanted: Vec<String> = if all {
        catalog.entries().iter().map(|e| e.id.clone()).collect()
    } else {
        ids
    };
    for id in &wanted {
        if catalog.get(id).is_none() {
            eprintln!("Unknown identifier: {id}");
            continue;
        }
        bridge
            .set_selected(id.clone(), true)
            .await
            .map_err(std::io::Error::other)?;
    }

    let selected = bridge.session().catalog().await;
    let sizes: HashMap<String, (u64, String)> = selected
        .entries()
        .iter()
        .filter(|e| e.selected)
        .map(|e| (e.id.clone(), (e.size, e.file_name.clone())))
        .collect();

    let started = Instant::now();
    let printer = tokio::spawn(show_progress(bridge.subscribe(), sizes));
    let summary = bridge
        .download_selected(reduced)
        .await
        .map_err(std::io::Error::other)?;
    let _ = printer.await;

    print_summary(&summary, started.elapsed());
    println!("Saved under {}", bridge.session().download_root().display());
    Ok(())
}

/// Runs one command against the camera.
///
/// # Errors
///
/// Returns an error if the camera cannot be reached or the client cannot be built.
pub async fn run(
    command: Command,
    config: CameraConfig,
    download_root: std::path::PathBuf,
) -> crate::Result<()> {
    let bridge = Bridge::new(config, download_root)?;
    let mut events = bridge.subscribe();

    match command {
        Command::Watch => return watch(&bridge, events).await,
        Command::List => {
            connect(&bridge, &mut events, true).await?;
            print_catalog(&bridge.session().catalog().await);
        }
        Command::Download { reduced, ids, all } => {
            connect(&bridge, &mut events, true).await?;
            download(&bridge, reduced, ids, all).await?;
        }
        Command::Power(on) => {
            // a powered-off camera does not answer probes, so do not require one
            let _ = bridge.connect().await;
            bridge.switch_power(on).await.map_err(std::io::Error::other)?;
            let state = bridge.session().state().await;
            println!(
                "Power {}: camera {}",
                if on { "on" } else { "off" },
                if state.connected { "reachable" } else { "not reachable" }
            );
        }
        Command::Mode(mode) => {
            connect(&bridge, &mut events, false).await?;
            bridge
                .switch_mode(mode.clone())
                .await
                .map_err(std::io::Error::other)?;
            println!("Mode switch to {mode} sent");
        }
        Command::Shutter => {
            connect(&bridge, &mut events, false).await?;
            bridge.shutter(true).await.map_err(std::io::Error::other)?;
            tokio::time::sleep(SHUTTER_HOLD).await;
            bridge.shutter(false).await.map_err(std::io::Error::other)?;
            println!("Shutter released");
        }
    }
    Ok(())
}
