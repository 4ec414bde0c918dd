//! Integration tests for the session engine
//!
//! Each test drives real sessions over in-memory duplex streams, talking the
//! wire protocol from the client side.

use flate2::read::GzDecoder;
use server::access_lists::{BanList, NameList};
use server::commands::DefaultCommands;
use server::config::Config;
use server::network::{kick_all, spawn_session};
use server::player_registry::PlayerRegistry;
use server::session::SessionHandle;
use server::world::{Map, World};
use server::ServerContext;
use shared::packets::{
    AddEntity, ChatMessage, Kick, MapChunk, MapEnd, ServerHandshake, SetBlockServer, Teleport,
};
use shared::validation::verification_token;
use shared::{Block, OpCode, Packet, PacketReader, Position, ProtocolError, SELF_ID};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

const SALT: &str = "integration-salt";
const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Received {
    Message(String),
    Kick(String),
    SetBlock(SetBlockServer),
    Teleport(Teleport),
    Other(OpCode),
}

struct Joined {
    handshake: ServerHandshake,
    compressed: Vec<u8>,
    chunks: Vec<MapChunk>,
    end: MapEnd,
    spawn: Position,
}

struct TestClient {
    reader: PacketReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    handle: Arc<SessionHandle>,
    task: JoinHandle<()>,
}

impl TestClient {
    fn connect(ctx: &Arc<ServerContext>, addr: &str) -> Self {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let addr: SocketAddr = addr.parse().unwrap();
        let (handle, task) = spawn_session(server_io, addr, Arc::clone(ctx));
        let (read_half, write_half) = tokio::io::split(client_io);
        TestClient {
            reader: PacketReader::new(read_half),
            writer: write_half,
            handle,
            task,
        }
    }

    async fn send(&mut self, packet: Packet) {
        self.send_raw(packet.bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        assert_ok!(self.writer.write_all(bytes).await);
        assert_ok!(self.writer.flush().await);
    }

    async fn handshake(&mut self, name: &str) {
        let token = verification_token(SALT, name);
        self.send(Packet::client_handshake(name, &token).unwrap()).await;
    }

    async fn recv(&mut self) -> Received {
        tokio::time::timeout(WAIT, self.recv_inner())
            .await
            .expect("timed out waiting for a packet")
    }

    async fn recv_inner(&mut self) -> Received {
        let opcode = self.reader.read_opcode().await.unwrap();
        match opcode {
            OpCode::Message => {
                let body: ChatMessage = self.reader.read_body(opcode).await.unwrap();
                Received::Message(body.message.into_inner())
            }
            OpCode::Kick => {
                let body: Kick = self.reader.read_body(opcode).await.unwrap();
                Received::Kick(body.reason.into_inner())
            }
            OpCode::SetBlockServer => Received::SetBlock(self.reader.read_body(opcode).await.unwrap()),
            OpCode::Teleport => Received::Teleport(self.reader.read_body(opcode).await.unwrap()),
            other => {
                self.reader.skip_body(other).await.unwrap();
                Received::Other(other)
            }
        }
    }

    /// Next chat line, skipping anything else.
    async fn next_message(&mut self) -> String {
        loop {
            match self.recv().await {
                Received::Message(text) => return text,
                Received::Kick(reason) => panic!("Kicked while waiting for chat: {}", reason),
                _ => {}
            }
        }
    }

    /// Next kick reason, skipping anything else.
    async fn expect_kick(&mut self) -> String {
        loop {
            if let Received::Kick(reason) = self.recv().await {
                return reason;
            }
        }
    }

    async fn expect_closed(&mut self) {
        let result = tokio::time::timeout(WAIT, self.reader.read_opcode())
            .await
            .expect("connection was not closed");
        match result {
            Err(err) => assert!(err.is_disconnect(), "unexpected error {:?}", err),
            Ok(opcode) => panic!("Expected end of stream, got {}", opcode),
        }
    }

    /// Reads everything the server sends on a successful login.
    async fn read_join(&mut self) -> Joined {
        let mut handshake = None;
        let mut chunks = Vec::new();
        let mut compressed = Vec::new();
        let end = loop {
            match tokio::time::timeout(WAIT, self.reader.read_opcode())
                .await
                .unwrap()
                .unwrap()
            {
                OpCode::Handshake => {
                    handshake = Some(self.reader.read_body(OpCode::Handshake).await.unwrap())
                }
                OpCode::MapBegin => self.reader.skip_body(OpCode::MapBegin).await.unwrap(),
                OpCode::MapChunk => {
                    let chunk: MapChunk = self.reader.read_body(OpCode::MapChunk).await.unwrap();
                    compressed.extend_from_slice(chunk.payload());
                    chunks.push(chunk);
                }
                OpCode::MapEnd => break self.reader.read_body(OpCode::MapEnd).await.unwrap(),
                OpCode::Kick => {
                    let kick: Kick = self.reader.read_body(OpCode::Kick).await.unwrap();
                    panic!("Kicked during login: {}", kick.reason);
                }
                other => panic!("Unexpected {} during map transfer", other),
            }
        };

        assert_eq!(self.reader.read_opcode().await.unwrap(), OpCode::AddEntity);
        let entity: AddEntity = self.reader.read_body(OpCode::AddEntity).await.unwrap();
        assert_eq!(entity.player_id, SELF_ID);
        assert_eq!(Some(entity.name.as_str()), self.handle.name());
        let position = entity.position;

        assert_eq!(self.reader.read_opcode().await.unwrap(), OpCode::Teleport);
        let teleport: Teleport = self.reader.read_body(OpCode::Teleport).await.unwrap();
        assert_eq!(teleport.player_id, SELF_ID);
        assert_eq!(teleport.position, position);

        Joined {
            handshake: handshake.expect("no server handshake"),
            compressed,
            chunks,
            end,
            spawn: position,
        }
    }

    async fn login(ctx: &Arc<ServerContext>, name: &str, addr: &str) -> (Self, Joined) {
        let mut client = Self::connect(ctx, addr);
        client.handshake(name).await;
        let joined = client.read_join().await;
        (client, joined)
    }

    async fn chat(&mut self, text: &str) {
        self.send(Packet::message(SELF_ID, text).unwrap()).await;
    }

    async fn move_to(&mut self, position: Position) {
        self.send(Packet::teleport(SELF_ID, position).unwrap()).await;
    }

    async fn place(&mut self, x: i16, y: i16, z: i16, block: u8) {
        self.send(Packet::client_set_block(x, y, z, true, block).unwrap())
            .await;
    }

    async fn finished(self) {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("session did not end")
            .unwrap();
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.salt = Some(SALT.to_string());
    config.width = 32;
    config.height = 32;
    config.length = 32;
    config
}

fn context_with(config: Config) -> Arc<ServerContext> {
    Arc::new(ServerContext::from_config(config).unwrap())
}

fn test_context() -> Arc<ServerContext> {
    context_with(test_config())
}

/// Flat map spawn is block (16, 17, 16); these coordinates are in reach.
const NEAR: (i16, i16, i16) = (16, 18, 16);

/// LOGIN AND MAP TRANSFER
mod login_tests {
    use super::*;

    #[tokio::test]
    async fn login_streams_full_map() {
        let config = test_config();
        let map = Map::new(40, 24, 40).unwrap();
        for x in 0..40 {
            for y in 0..24 {
                for z in 0..40 {
                    let id = ((x as u32 * 31 + y as u32 * 17 + z as u32 * 7) % 50) as u8;
                    map.set_block(x, y, z, Block::from_id(id).unwrap());
                }
            }
        }
        let world: Arc<dyn World> = Arc::new(map);
        let ctx = Arc::new(ServerContext {
            salt: SALT.to_string(),
            world: Arc::clone(&world),
            directory: Arc::new(PlayerRegistry::new(config.max_players)),
            bans: Arc::new(BanList::default()),
            operators: Arc::new(NameList::with_names(["Builder"])),
            commands: Arc::new(DefaultCommands),
            config,
        });

        let (client, joined) = TestClient::login(&ctx, "Builder", "127.0.0.1:50001").await;

        assert_eq!(joined.handshake.protocol_version, shared::PROTOCOL_VERSION);
        assert_eq!(joined.handshake.server_name.as_str(), ctx.config.server_name);
        assert_eq!(joined.handshake.motd.as_str(), ctx.config.motd);
        assert_eq!(joined.handshake.user_type, shared::USER_TYPE_OP);
        assert_eq!(
            (joined.end.width, joined.end.height, joined.end.length),
            (40, 24, 40)
        );
        assert_eq!(joined.spawn, world.spawn());

        assert!(joined.chunks.len() > 1);
        let mut last_progress = 0;
        for chunk in &joined.chunks {
            assert!(chunk.progress >= last_progress);
            assert!(chunk.progress < 100);
            last_progress = chunk.progress;
        }
        assert_eq!(joined.chunks[0].progress, 0);
        for chunk in &joined.chunks[..joined.chunks.len() - 1] {
            assert_eq!(chunk.length, 1024);
        }

        let mut raw = Vec::new();
        GzDecoder::new(joined.compressed.as_slice())
            .read_to_end(&mut raw)
            .unwrap();
        let volume = 40 * 24 * 40;
        assert_eq!(&raw[..4], &(volume as i32).to_be_bytes());
        assert_eq!(&raw[4..], &world.blocks()[..]);

        assert!(client.handle.is_online());
        assert!(client.handle.is_op());
        assert!(ctx.directory.find("builder").is_some());
    }

    #[tokio::test]
    async fn bad_token_is_kicked() {
        let ctx = test_context();
        let mut client = TestClient::connect(&ctx, "127.0.0.1:50002");
        client
            .send(Packet::client_handshake("Mallory", "0123456789abcdef").unwrap())
            .await;
        assert_eq!(client.expect_kick().await, "Could not verify player name.");
        client.expect_closed().await;
        assert!(ctx.directory.online().is_empty());
    }

    #[tokio::test]
    async fn token_check_is_case_insensitive() {
        let ctx = test_context();
        let mut client = TestClient::connect(&ctx, "127.0.0.1:50003");
        let token = verification_token(SALT, "Carol").to_uppercase();
        client
            .send(Packet::client_handshake("Carol", &token).unwrap())
            .await;
        client.read_join().await;
    }

    #[tokio::test]
    async fn invalid_name_is_kicked() {
        let ctx = test_context();
        let mut client = TestClient::connect(&ctx, "127.0.0.1:50004");
        client.handshake("no spaces").await;
        assert_eq!(client.expect_kick().await, "Unacceptible player name.");
        client.expect_closed().await;
    }

    #[tokio::test]
    async fn banned_name_is_kicked_even_when_verified() {
        let mut config = test_config();
        config.banned_names = vec!["griefer".to_string()];
        let ctx = context_with(config);

        let mut client = TestClient::connect(&ctx, "127.0.0.1:50005");
        client.handshake("Griefer").await;
        assert_eq!(client.expect_kick().await, "You are banned!");
        client.expect_closed().await;
        assert!(ctx.directory.find("Griefer").is_none());
    }

    #[tokio::test]
    async fn banned_address_is_kicked() {
        let mut config = test_config();
        config.banned_addresses = vec!["10.1.2.3".parse().unwrap()];
        let ctx = context_with(config);

        let mut client = TestClient::connect(&ctx, "10.1.2.3:50006");
        client.handshake("Innocent").await;
        assert_eq!(client.expect_kick().await, "Your IP address is banned!");
        client.finished().await;
    }

    #[tokio::test]
    async fn wrong_protocol_version_closes_silently() {
        let ctx = test_context();
        let mut client = TestClient::connect(&ctx, "127.0.0.1:50007");
        let mut bytes = vec![0x00, 0x06];
        bytes.extend(std::iter::repeat(b' ').take(129));
        client.send_raw(&bytes).await;
        client.expect_closed().await;
    }

    #[tokio::test]
    async fn non_handshake_opener_closes_silently() {
        let ctx = test_context();
        let mut client = TestClient::connect(&ctx, "127.0.0.1:50008");
        client.send(Packet::ping().unwrap()).await;
        client.expect_closed().await;
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let ctx = test_context();
        let (_alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50009").await;

        let mut again = TestClient::connect(&ctx, "127.0.0.1:50010");
        again.handshake("Alice").await;
        assert_eq!(again.expect_kick().await, "Already logged in.");
        again.finished().await;
        assert_eq!(ctx.directory.online().len(), 1);
    }

    #[tokio::test]
    async fn full_server_rejects_login() {
        let mut config = test_config();
        config.max_players = 1;
        let ctx = context_with(config);
        let (_alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50011").await;

        let mut bob = TestClient::connect(&ctx, "127.0.0.1:50012");
        bob.handshake("Bob").await;
        assert_eq!(bob.expect_kick().await, "Server is full!");
        bob.finished().await;
    }
}

/// STEADY-STATE LOOP
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_opcode_is_kicked() {
        let ctx = test_context();
        let (mut client, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50101").await;
        client.send_raw(&[0x02]).await;
        assert_eq!(client.expect_kick().await, "Unknown packet opcode 2");
        client.expect_closed().await;
    }

    #[tokio::test]
    async fn undefined_opcode_is_kicked() {
        let ctx = test_context();
        let (mut client, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50102").await;
        client.send_raw(&[0x42]).await;
        assert_eq!(client.expect_kick().await, "Unknown packet opcode 66");
        let handle = Arc::clone(&client.handle);
        client.finished().await;
        assert!(!handle.is_online());
        assert!(ctx.directory.online().is_empty());
    }

    #[tokio::test]
    async fn ping_is_ignored() {
        let ctx = test_context();
        let (mut client, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50103").await;
        client.send(Packet::ping().unwrap()).await;
        client.chat("still here").await;
        assert_eq!(client.next_message().await, "&FAlice: still here");
    }

    #[tokio::test]
    async fn async_kick_flushes_then_closes() {
        let ctx = test_context();
        let (mut client, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50104").await;
        client.handle.message("before");
        client.handle.kick("Bye!");
        client.handle.message("after");

        assert_eq!(client.next_message().await, "&Ebefore");
        assert_eq!(client.expect_kick().await, "Bye!");
        client.expect_closed().await;
        client.finished().await;
        assert!(ctx.directory.online().is_empty());
    }

    #[tokio::test]
    async fn synchronous_kick_frees_the_name() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50105").await;
        let (mut bob, _) = TestClient::login(&ctx, "Bob", "127.0.0.1:50106").await;

        kick_all(&ctx, "Server shutting down.").await;
        assert!(ctx.directory.online().is_empty());
        assert!(!alice.handle.is_registered());

        assert_eq!(alice.expect_kick().await, "Server shutting down.");
        assert_eq!(bob.expect_kick().await, "Server shutting down.");
        alice.finished().await;
        bob.finished().await;

        let (again, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50107").await;
        assert!(again.handle.is_online());
    }

    #[tokio::test]
    async fn disconnect_announces_departure() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50108").await;
        let (bob, _) = TestClient::login(&ctx, "Bob", "127.0.0.1:50109").await;

        assert_eq!(alice.next_message().await, "&EPlayer Bob connected.");
        let TestClient {
            reader,
            writer,
            task,
            ..
        } = bob;
        drop(reader);
        drop(writer);
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

        assert_eq!(alice.next_message().await, "&EPlayer Bob left.");
        assert!(ctx.directory.find("Bob").is_none());
    }
}

/// CHAT
mod chat_tests {
    use super::*;

    #[tokio::test]
    async fn chat_reaches_everyone() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50201").await;
        let (mut bob, _) = TestClient::login(&ctx, "Bob", "127.0.0.1:50202").await;

        assert_eq!(alice.next_message().await, "&EPlayer Bob connected.");
        alice.chat("hello there").await;
        assert_eq!(alice.next_message().await, "&FAlice: hello there");
        assert_eq!(bob.next_message().await, "&FAlice: hello there");
    }

    #[tokio::test]
    async fn partial_messages_are_joined() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50203").await;

        alice.chat("hello /").await;
        assert_eq!(alice.next_message().await, "&EPartial: &Fhello");
        alice.chat("world").await;
        assert_eq!(alice.next_message().await, "&FAlice: hello world");

        alice.chat("/nvm").await;
        assert_eq!(alice.next_message().await, "&ENo partial message to cancel.");
    }

    #[tokio::test]
    async fn commands_go_to_the_dispatcher() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50204").await;
        alice.chat("/tp Bob").await;
        assert_eq!(alice.next_message().await, "&EUnknown command: tp");
        alice.chat("/").await;
        assert_eq!(alice.next_message().await, "&ECannot parse message.");
        alice.chat("//tp is a command").await;
        assert_eq!(alice.next_message().await, "&FAlice: /tp is a command");
    }

    #[tokio::test]
    async fn wom_identification_is_dropped() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50205").await;
        alice.chat("/womid WoMClient-2.0.8").await;
        alice.chat("visible").await;
        assert_eq!(alice.next_message().await, "&FAlice: visible");
    }

    #[tokio::test]
    async fn colour_codes_are_hacking() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50206").await;
        alice.chat("&cred text").await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        alice.expect_closed().await;
    }

    #[tokio::test]
    async fn high_bytes_are_hacking() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50208").await;
        let mut raw = Packet::message(SELF_ID, "caf").unwrap().bytes().to_vec();
        // opcode, player id, then the text field
        raw[2 + 3] = 0xE9;
        alice.send_raw(&raw).await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        alice.expect_closed().await;
    }

    #[tokio::test]
    async fn partial_line_flood_is_kicked() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50209").await;
        let line = format!("{} /", "a".repeat(60));
        for _ in 0..4 {
            alice.chat(&line).await;
        }
        assert_eq!(alice.expect_kick().await, "Kicked for chat spam!");
        alice.finished().await;
    }

    #[tokio::test]
    async fn chat_spam_is_kicked() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50207").await;
        for i in 0..4 {
            alice.chat(&format!("spam {}", i)).await;
        }
        for i in 0..3 {
            assert_eq!(alice.next_message().await, format!("&FAlice: spam {}", i));
        }
        assert_eq!(alice.expect_kick().await, "Kicked for chat spam!");
        alice.finished().await;
        assert!(ctx.directory.online().is_empty());
    }
}

/// MOVEMENT
mod movement_tests {
    use super::*;

    #[tokio::test]
    async fn second_fast_move_rolls_back() {
        let ctx = test_context();
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50301").await;
        let spawn = joined.spawn;

        let mut far = spawn;
        far.x += 64;
        alice.move_to(far).await;
        let mut farther = far;
        farther.x += 64;
        alice.move_to(farther).await;

        match alice.recv().await {
            Received::Teleport(teleport) => {
                assert_eq!(teleport.player_id, SELF_ID);
                assert_eq!(teleport.position, spawn);
            }
            other => panic!("Expected rollback teleport, got {:?}", other),
        }
        assert_eq!(
            alice.next_message().await,
            "&E&WYou are not allowed to speedhack."
        );
    }

    #[tokio::test]
    async fn single_fast_move_is_tolerated() {
        let ctx = test_context();
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50302").await;

        let mut pushed = joined.spawn;
        pushed.z += 48;
        alice.move_to(pushed).await;
        let mut walked = pushed;
        walked.z += 4;
        alice.move_to(walked).await;

        alice.chat("ok").await;
        match alice.recv().await {
            Received::Message(text) => assert_eq!(text, "&FAlice: ok"),
            other => panic!("Expected chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn speed_checks_can_be_disabled() {
        let mut config = test_config();
        config.allow_speed_hack = true;
        let ctx = context_with(config);
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50303").await;

        let mut position = joined.spawn;
        for _ in 0..3 {
            position.x += 100;
            alice.move_to(position).await;
        }
        alice.chat("no rollback").await;
        match alice.recv().await {
            Received::Message(text) => assert_eq!(text, "&FAlice: no rollback"),
            other => panic!("Expected chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn movement_flood_rolls_back() {
        let ctx = test_context();
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50304").await;

        let mut position = joined.spawn;
        for i in 0..201i16 {
            // Never zero: unchanged packets are not counted.
            position.x = joined.spawn.x + 1 - i % 2;
            alice.move_to(position).await;
        }
        match alice.recv().await {
            Received::Teleport(teleport) => assert_eq!(teleport.player_id, SELF_ID),
            other => panic!("Expected rollback teleport, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unchanged_positions_are_not_counted() {
        let ctx = test_context();
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50306").await;
        let idle_since = alice.handle.last_active();

        for _ in 0..300 {
            alice.move_to(joined.spawn).await;
        }
        let mut stepped = joined.spawn;
        stepped.x += 1;
        alice.move_to(stepped).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(alice.handle.last_active(), idle_since);

        alice.chat("not flooding").await;
        match alice.recv().await {
            Received::Message(text) => assert_eq!(text, "&FAlice: not flooding"),
            other => panic!("Expected chat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_turning_counts_as_activity() {
        let ctx = test_context();
        let (mut alice, joined) = TestClient::login(&ctx, "Alice", "127.0.0.1:50305").await;
        let idle_since = alice.handle.last_active();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut shifted = joined.spawn;
        shifted.x += 1;
        alice.move_to(shifted).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(alice.handle.last_active(), idle_since);

        shifted.yaw = shifted.yaw.wrapping_add(10);
        alice.move_to(shifted).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(alice.handle.last_active() > idle_since);
    }
}

/// BLOCK PLACEMENT
mod block_tests {
    use super::*;

    fn op_context() -> Arc<ServerContext> {
        let mut config = test_config();
        config.ops = vec!["Admin".to_string()];
        context_with(config)
    }

    #[tokio::test]
    async fn placement_reaches_others_but_not_sender() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50401").await;
        let (mut bob, _) = TestClient::login(&ctx, "Bob", "127.0.0.1:50402").await;
        assert_eq!(alice.next_message().await, "&EPlayer Bob connected.");

        let (x, y, z) = NEAR;
        alice.place(x, y, z, Block::Glass.id()).await;
        match bob.recv().await {
            Received::SetBlock(update) => {
                assert_eq!((update.x, update.y, update.z), NEAR);
                assert_eq!(update.block, Block::Glass.id());
            }
            other => panic!("Expected block update, got {:?}", other),
        }
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Glass));

        alice.chat("done").await;
        match alice.recv().await {
            Received::Message(text) => assert_eq!(text, "&FAlice: done"),
            other => panic!("Sender got {:?} before its chat echo", other),
        }
    }

    #[tokio::test]
    async fn deleting_places_air() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50403").await;
        let (x, y, z) = (16, 15, 16);
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Grass));

        alice
            .send(Packet::client_set_block(x, y, z, false, Block::Grass.id()).unwrap())
            .await;
        match alice.recv().await {
            Received::SetBlock(update) => assert_eq!(update.block, Block::Air.id()),
            other => panic!("Expected air correction, got {:?}", other),
        }
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Air));
    }

    #[tokio::test]
    async fn out_of_bounds_click_is_ignored() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50404").await;
        let before = ctx.world.blocks();

        alice.place(-1, 18, 16, Block::Stone.id()).await;
        alice.place(16, 32, 16, Block::Stone.id()).await;
        alice.chat("alive").await;
        assert_eq!(alice.next_message().await, "&FAlice: alive");
        assert_eq!(ctx.world.blocks(), before);
    }

    #[tokio::test]
    async fn invalid_block_type_is_hacking() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50405").await;
        let (x, y, z) = NEAR;
        alice.place(x, y, z, 50).await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
    }

    #[tokio::test]
    async fn far_placement_is_hacking() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50406").await;
        alice.place(2, 18, 16, Block::Stone.id()).await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        assert_eq!(ctx.world.get_block(2, 18, 16), Some(Block::Air));
    }

    #[tokio::test]
    async fn restricted_block_needs_op() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50407").await;
        let (x, y, z) = NEAR;
        alice.place(x, y, z, Block::Water.id()).await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Air));
    }

    #[tokio::test]
    async fn admincrete_cannot_be_replaced_by_players() {
        let ctx = test_context();
        let (x, y, z) = NEAR;
        ctx.world.set_block(x, y, z, Block::Admincrete);
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50408").await;
        alice
            .send(Packet::client_set_block(x, y, z, false, Block::Admincrete.id()).unwrap())
            .await;
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Admincrete));
    }

    #[tokio::test]
    async fn water_toggle_substitutes_and_corrects_sender() {
        let ctx = op_context();
        let (mut admin, _) = TestClient::login(&ctx, "Admin", "127.0.0.1:50409").await;
        let (mut bob, _) = TestClient::login(&ctx, "Bob", "127.0.0.1:50410").await;
        admin.handle.place_water.store(true, Ordering::Relaxed);

        let (x, y, z) = NEAR;
        admin.place(x, y, z, Block::Blue.id()).await;
        for client in [&mut admin, &mut bob] {
            loop {
                match client.recv().await {
                    Received::SetBlock(update) => {
                        assert_eq!(update.block, Block::Water.id());
                        break;
                    }
                    Received::Message(_) => {}
                    other => panic!("Expected block correction, got {:?}", other),
                }
            }
        }
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Water));
    }

    #[tokio::test]
    async fn lava_toggle_places_lava() {
        let ctx = op_context();
        let (mut admin, _) = TestClient::login(&ctx, "Admin", "127.0.0.1:50411").await;
        admin.handle.place_lava.store(true, Ordering::Relaxed);

        let (x, y, z) = NEAR;
        admin.place(x, y, z, Block::Red.id()).await;
        match admin.recv().await {
            Received::SetBlock(update) => assert_eq!(update.block, Block::Lava.id()),
            other => panic!("Expected block correction, got {:?}", other),
        }
        assert_eq!(ctx.world.get_block(x, y, z), Some(Block::Lava));
    }

    #[tokio::test]
    async fn block_flood_is_kicked_on_48th() {
        let ctx = test_context();
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50412").await;
        for i in 0..48i16 {
            alice.place(10 + i % 12, 20, 10 + i / 12, Block::Stone.id()).await;
        }
        assert_eq!(alice.expect_kick().await, "Hacking detected.");
        // The 48th placement was refused.
        assert_eq!(ctx.world.get_block(21, 20, 13), Some(Block::Air));
        assert_eq!(ctx.world.get_block(20, 20, 13), Some(Block::Stone));
    }

    #[tokio::test]
    async fn click_rate_limit_can_be_disabled() {
        let mut config = test_config();
        config.limit_click_rate = false;
        let ctx = context_with(config);
        let (mut alice, _) = TestClient::login(&ctx, "Alice", "127.0.0.1:50413").await;
        for i in 0..60i16 {
            alice.place(10 + i % 12, 20, 10 + i / 12, Block::Stone.id()).await;
        }
        alice.chat("all placed").await;
        assert_eq!(alice.next_message().await, "&FAlice: all placed");
        assert_eq!(ctx.world.get_block(10 + 59 % 12, 20, 10 + 59 / 12), Some(Block::Stone));
    }
}

#[tokio::test]
async fn protocol_errors_report_disconnects() {
    let (client, server) = tokio::io::duplex(8);
    drop(server);
    let mut reader = PacketReader::new(client);
    let err: ProtocolError = tokio_test::assert_err!(reader.read_opcode().await);
    assert!(err.is_disconnect());
}
