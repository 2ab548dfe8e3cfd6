use clap::Parser;
use log::info;
use server::network::Server;
use shared::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative netpong game server")]
struct Args {
    /// IP address to bind the listening socket to
    #[arg(default_value = "127.0.0.1")]
    address: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Binding to {}", args.address);

    let mut server = Server::bind(&args.address, DEFAULT_PORT)?;
    server.run()?;
    Ok(())
}
