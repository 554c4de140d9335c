use clap::Parser;
use log::{info, warn};
use place_client::model::{ClientModel, ModelEvent};
use place_shared::{Color, COOLDOWN_MS, DEFAULT_PORT};
use rand::Rng;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Name to log in with
    #[arg(short, long)]
    username: String,

    /// Paint random cells instead of reading commands from stdin
    #[arg(long)]
    bot: bool,
}

/// One line of console input
#[derive(Debug, PartialEq)]
enum Command {
    Paint { row: u32, col: u32, color: Color },
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() == Some(&"-1") {
        return Ok(Command::Quit);
    }
    if parts.len() != 3 {
        return Err("expected: <row> <col> <color>, or -1 to quit".to_string());
    }

    let row = parts[0]
        .parse()
        .map_err(|_| format!("invalid row: {}", parts[0]))?;
    let col = parts[1]
        .parse()
        .map_err(|_| format!("invalid column: {}", parts[1]))?;
    let color = match parts[2].parse::<u8>() {
        Ok(id) => Color::from_id(id),
        Err(_) => Color::from_name(parts[2]),
    }
    .ok_or_else(|| format!("unknown colour: {}", parts[2]))?;

    Ok(Command::Paint { row, col, color })
}

async fn print_changes(model: &ClientModel) {
    let mut events = model.subscribe();
    println!("{}", model.board().await);

    loop {
        match events.recv().await {
            Ok(ModelEvent::TileChanged(tile)) => {
                println!(
                    "{} painted ({}, {}) {}",
                    tile.owner, tile.row, tile.col, tile.color
                );
                println!("{}", model.board().await);
            }
            Ok(ModelEvent::Closed { reason }) => {
                println!("{}", reason);
                return;
            }
            Err(RecvError::Lagged(skipped)) => warn!("Skipped {} board updates", skipped),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn run_console(model: &ClientModel) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Enter <row> <col> <color> to paint a cell, -1 to quit");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Paint { row, col, color }) => {
                if let Err(e) = model.change_tile(row, col, color).await {
                    println!("{}", e);
                    if model.is_closed() {
                        break;
                    }
                    continue;
                }
                tokio::time::sleep(Duration::from_millis(COOLDOWN_MS)).await;
            }
            Err(message) => println!("{}", message),
        }
    }

    Ok(())
}

async fn run_bot(model: &ClientModel) -> Result<(), Box<dyn std::error::Error>> {
    let dim = model.board().await.dim();
    if dim == 0 {
        return Err("server sent an empty board".into());
    }
    info!("Bot painting a {}x{} board every {}ms", dim, dim, COOLDOWN_MS);

    while !model.is_closed() {
        let (row, col, color) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(0..dim),
                rng.gen_range(0..dim),
                Color::ALL[rng.gen_range(0..Color::ALL.len())],
            )
        };

        if let Err(e) = model.change_tile(row, col, color).await {
            warn!("Bot stopped: {}", e);
            break;
        }
        tokio::time::sleep(Duration::from_millis(COOLDOWN_MS)).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    info!("Connecting to {} as {}", addr, args.username);

    let model = ClientModel::connect(&addr, &args.username).await?;

    let result = tokio::select! {
        result = async {
            if args.bot {
                run_bot(&model).await
            } else {
                run_console(&model).await
            }
        } => result,
        _ = print_changes(&model) => Ok(()),
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, disconnecting");
            Ok(())
        }
    };

    model.close();
    result
}
