use clap::Parser;
use client::{Client, ClientView};
use log::info;
use shared::{NetError, Packet, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless netpong client")]
struct Args {
    /// Server IP address to connect to
    #[arg(default_value = "127.0.0.1")]
    address: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Connecting to {}", args.address);

    let mut client = Client::connect(&args.address, DEFAULT_PORT)?;
    let mut view = ClientView::new();

    loop {
        let packet = match client.next_packet() {
            Ok(packet) => packet,
            Err(NetError::Disconnected) => {
                info!("Server closed the connection");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        view.apply(&packet);
        match packet {
            Packet::PlayerAssignment { player } => info!("Assigned player slot {}", player),
            Packet::GameStart => info!("Match started"),
            Packet::GameEnd => info!("Match ended"),
            Packet::ScoreUpdate { player1, player2 } => {
                info!("Score: {} - {}", player1, player2)
            }
            _ => {}
        }
    }
}
