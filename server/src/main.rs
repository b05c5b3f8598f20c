// Copyright 2015-2019 Capital One Services, LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#[macro_use]
extern crate log;

use pcbook_server::{seed_users, InMemoryUserStore, PcbookServer, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structopt::clap::AppSettings;
use structopt::StructOpt;
use tokio::net::TcpListener;

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    global_settings(&[AppSettings::ColoredHelp, AppSettings::VersionlessSubcommands]),
    name = "pcbook-server",
    about = "pcbook is a laptop catalog with role-based access control")]
struct Cli {
    #[structopt(flatten)]
    command: CliCommand,
}

#[derive(Debug, Clone, StructOpt)]
struct CliCommand {
    /// Port to listen on
    #[structopt(short = "p", long = "port", default_value = "8080")]
    port: u16,

    /// Secret used to sign access tokens
    #[structopt(long = "secret", env = "PCBOOK_SECRET", default_value = "secret", hide_env_values = true)]
    secret: String,

    /// Lifetime of an access token, in seconds
    #[structopt(long = "token-duration", default_value = "900")]
    token_duration: u64,

    /// Directory uploaded images are written to
    #[structopt(long = "image-dir", default_value = "img", parse(from_os_str))]
    image_dir: PathBuf,

    /// Largest accepted image, in bytes
    #[structopt(long = "max-image-size", default_value = "1048576")]
    max_image_size: usize,
}

async fn handle_command(cmd: CliCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    let config = ServerConfig {
        secret: cmd.secret,
        token_duration: Duration::from_secs(cmd.token_duration),
        image_dir: cmd.image_dir,
        max_image_size: cmd.max_image_size,
    };

    let users = Arc::new(InMemoryUserStore::new());
    seed_users(users.as_ref(), bcrypt::DEFAULT_COST)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], cmd.port));
    let listener = TcpListener::bind(addr).await?;
    let server = PcbookServer::new(&config, users);

    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("cannot listen for shutdown signal: {}", e);
            }
            info!("shutting down");
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn ::std::error::Error>> {
    let args = Cli::from_args();
    let cmd = args.command;
    env_logger::init();

    match handle_command(cmd).await {
        Ok(_) => {}
        Err(e) => {
            println!("Command line failure: {}", e);
        }
    }
    Ok(())
}
