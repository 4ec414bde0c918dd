//! Scripted bot: logs in, downloads the map, says something and prints
//! whatever comes back for a few seconds.

use clap::Parser;
use flate2::read::GzDecoder;
use shared::packets::{ChatMessage, Kick, MapChunk, MapEnd, ServerHandshake};
use shared::validation::verification_token;
use shared::{OpCode, Packet, PacketReader, PacketWriter};
use std::io::Read;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:25565")]
    server: String,
    /// Player name to log in as
    #[clap(short, long, default_value = "TestBot")]
    name: String,
    /// Server salt, used to compute the verification token
    #[clap(long)]
    salt: String,
    /// Chat line to send after joining
    #[clap(short, long, default_value = "Hello from the test client!")]
    message: String,
    /// Seconds to keep listening after joining
    #[clap(long, default_value = "5")]
    linger: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    println!("Connected to {}", args.server);
    let (read_half, write_half) = stream.into_split();
    let mut reader = PacketReader::new(read_half);
    let mut writer = PacketWriter::new(write_half);

    let token = verification_token(&args.salt, &args.name);
    writer
        .write_packet(&Packet::client_handshake(&args.name, &token)?)
        .await?;
    writer.flush().await?;

    let mut compressed = Vec::new();
    loop {
        let opcode = reader.read_opcode().await?;
        match opcode {
            OpCode::Handshake => {
                let handshake: ServerHandshake = reader.read_body(opcode).await?;
                println!(
                    "Joined \"{}\" ({}), operator: {}",
                    handshake.server_name,
                    handshake.motd,
                    handshake.user_type == shared::USER_TYPE_OP
                );
            }
            OpCode::MapChunk => {
                let chunk: MapChunk = reader.read_body(opcode).await?;
                compressed.extend_from_slice(chunk.payload());
                println!("Map {}%", chunk.progress);
            }
            OpCode::MapEnd => {
                let end: MapEnd = reader.read_body(opcode).await?;
                let mut raw = Vec::new();
                GzDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;
                println!(
                    "Map {}x{}x{}: {} compressed bytes, {} blocks",
                    end.width,
                    end.height,
                    end.length,
                    compressed.len(),
                    raw.len().saturating_sub(4)
                );
                break;
            }
            OpCode::Kick => {
                let kick: Kick = reader.read_body(opcode).await?;
                println!("Kicked during login: {}", kick.reason);
                return Ok(());
            }
            other => reader.skip_body(other).await?,
        }
    }

    writer.write_packet(&Packet::message(-1, &args.message)?).await?;
    writer.flush().await?;

    let deadline = Instant::now() + Duration::from_secs(args.linger);
    while let Ok(opcode) = tokio::time::timeout_at(deadline, reader.read_opcode()).await {
        let opcode = opcode?;
        match opcode {
            OpCode::Message => {
                let message: ChatMessage = reader.read_body(opcode).await?;
                println!("Chat: {}", message.message);
            }
            OpCode::Kick => {
                let kick: Kick = reader.read_body(opcode).await?;
                println!("Kicked: {}", kick.reason);
                return Ok(());
            }
            other => reader.skip_body(other).await?,
        }
    }

    println!("Disconnecting");
    Ok(())
}
