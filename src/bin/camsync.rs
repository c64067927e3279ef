use std::env;
use std::path::PathBuf;

use camsync::{CameraConfig, Settings};

fn print_usage() {
    eprintln!("Usage: camsync [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  watch                          Supervise the connection and print changes");
    eprintln!("  list                           List the files on the camera");
    eprintln!("  download [--reduced] --all     Download every file");
    eprintln!("  download [--reduced] <ID>...   Download the given files");
    eprintln!("  power on|off                   Switch the camera on or off");
    eprintln!("  mode <MODE>                    Switch to rec, play, shutter or standalone");
    eprintln!("  shutter                        Take a picture");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --host <HOST>       Camera address (default: 192.168.0.10)");
    eprintln!("  --folder <DIR>      Remote folder (default: /DCIM/100OLYMP)");
    eprintln!("  -o, --output <DIR>  Download directory (remembered for next time)");
    eprintln!("  -h, --help          Show this help");
}

fn required(args: &[String], i: usize, flag: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("Error: {flag} requires a value");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() -> camsync::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = CameraConfig::default();
    let mut output: Option<PathBuf> = None;
    let mut rest = Vec::new();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" if rest.is_empty() => {
                print_usage();
                std::process::exit(0);
            }
            "--host" if rest.is_empty() => {
                i += 1;
                config = config.with_host(required(&args, i, "--host"));
            }
            "--folder" if rest.is_empty() => {
                i += 1;
                config = config.with_remote_folder(required(&args, i, "--folder"));
            }
            "-o" | "--output" if rest.is_empty() => {
                i += 1;
                output = Some(PathBuf::from(required(&args, i, "--output")));
            }
            _ => rest.push(args[i].clone()),
        }
        i += 1;
    }

    let command = match camsync::cli::Command::parse(&rest) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let settings_path = Settings::default_path();
    let mut settings = Settings::load(&settings_path)?;
    if let Some(output) = output {
        settings.download_path = output;
    }
    log::debug!("Settings at {}", settings_path.display());

    let result = camsync::cli::run(command, config, settings.download_path.clone()).await;

    if let Err(e) = settings.save(&settings_path) {
        log::warn!("Could not save settings: {e}");
    }
    result
}
