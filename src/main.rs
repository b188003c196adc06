// Copyright (C) 2026 The serlink authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Serial link-layer test client: one open → transfer → close cycle.

use std::time::Duration;

use clap::{Parser, Subcommand};

use serlink::{LinkConfig, LinkSession, Role};

#[derive(Parser)]
#[command(name = "serlink")]
#[command(about = "Stop-and-wait ARQ link layer over a serial line", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Inter-byte read timeout in milliseconds
    #[arg(long, default_value = "500", value_name = "MS")]
    read_timeout: u64,

    /// Delay before an unacknowledged frame is resent, in milliseconds
    #[arg(long, default_value = "3000", value_name = "MS")]
    retransmit_interval: u64,

    /// Total transmissions of a frame before giving up
    #[arg(long, default_value = "3", value_name = "N")]
    max_retries: u32,

    /// Largest payload per frame, in bytes
    #[arg(long, default_value = "1024", value_name = "BYTES")]
    max_payload: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect as initiator and send one message
    Send {
        /// Message to transmit in a single frame
        message: String,
    },
    /// Connect as responder and receive one message
    Receive,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let config = LinkConfig {
        max_payload_size: cli.max_payload,
        read_timeout: Duration::from_millis(cli.read_timeout),
        retransmit_interval: Duration::from_millis(cli.retransmit_interval),
        max_retransmissions: cli.max_retries,
    };

    println!("Opening serial port: {} at {} baud", cli.port, cli.baud);

    let result = match cli.command {
        Commands::Send { message } => send_message(&cli.port, cli.baud, config, &message),
        Commands::Receive => receive_message(&cli.port, cli.baud, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn send_message(
    port: &str,
    baud: u32,
    config: LinkConfig,
    message: &str,
) -> serlink::Result<()> {
    let mut session = LinkSession::open_device(port, baud, Role::Initiator, config)?;
    println!("Connected");

    session.write(message.as_bytes())?;
    println!("Sent {} bytes", message.len());

    session.close()?;
    println!("Disconnected");
    Ok(())
}

fn receive_message(port: &str, baud: u32, config: LinkConfig) -> serlink::Result<()> {
    let mut session = LinkSession::open_device(port, baud, Role::Responder, config)?;
    println!("Connected");

    let mut payload = Vec::new();
    let len = session.read(&mut payload)?;
    println!("Received {} bytes: {}", len, String::from_utf8_lossy(&payload));

    session.close()?;
    println!("Disconnected");
    Ok(())
}
