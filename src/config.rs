use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the application
#[derive(Parser, Debug)]
#[clap(name = "portico", about = "Generic CRUD REST API over a document store")]
pub struct CliArgs {
    /// Address the server listens on
    #[clap(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// MongoDB connection string
    #[clap(long, env = "DATABASE_URL", default_value = "mongodb://localhost:27017")]
    pub database_url: String,

    /// Database to open on the server
    #[clap(long, env = "DATABASE_NAME", default_value = "portico")]
    pub database_name: String,

    /// Directory uploaded images are stored under (and served from)
    #[clap(long, env = "IMAGE_ROOT", default_value = ".")]
    pub image_root: PathBuf,
}

/// Configuration for the Portico application
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_name: String,
    pub image_root: PathBuf,
}

impl From<CliArgs> for Config {
    fn from(args: CliArgs) -> Self {
        Self {
            bind_addr: args.bind_addr,
            database_url: args.database_url,
            database_name: args.database_name,
            image_root: args.image_root,
        }
    }
}
