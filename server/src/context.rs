use crate::access_lists::{BanList, BanStore, NameList, OperatorStore};
use crate::commands::{CommandDispatcher, DefaultCommands};
use crate::config::Config;
use crate::player_registry::{PlayerRegistry, SessionDirectory};
use crate::world::{Map, MapError, World};
use log::info;
use std::sync::Arc;

/// Everything a session shares with the rest of the server.
///
/// Each collaborator sits behind a trait object so tests and embedders can
/// swap in their own.
pub struct ServerContext {
    pub config: Config,
    /// Salt for name verification tokens.
    pub salt: String,
    pub world: Arc<dyn World>,
    pub directory: Arc<dyn SessionDirectory>,
    pub bans: Arc<dyn BanStore>,
    pub operators: Arc<dyn OperatorStore>,
    pub commands: Arc<dyn CommandDispatcher>,
}

impl ServerContext {
    /// Builds the default in-memory collaborators: a flat map, a player
    /// registry capped at `max_players`, and the configured bans and ops.
    pub fn from_config(config: Config) -> Result<Self, MapError> {
        let world = Map::flat(config.width, config.height, config.length)?;
        info!(
            "Created {}x{}x{} map",
            config.width, config.height, config.length
        );

        let salt = config.resolve_salt();
        info!("Name verification salt: {}", salt);

        Ok(ServerContext {
            salt,
            world: Arc::new(world),
            directory: Arc::new(PlayerRegistry::new(config.max_players)),
            bans: Arc::new(BanList::new(&config.banned_names, &config.banned_addresses)),
            operators: Arc::new(NameList::with_names(&config.ops)),
            commands: Arc::new(DefaultCommands),
            config,
        })
    }
}
