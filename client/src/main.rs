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

use pcbook_protocol as protocol;
use pcbookclient::{Client, ConnectionConfiguration, Filter, Laptop};
use protocol::catalog::{memory::Unit, Memory};
use std::io::Read;
use std::io::{self, Write};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use structopt::clap::AppSettings;
use structopt::StructOpt;
use term_table::row::Row;
use term_table::table_cell::{Alignment, TableCell};
use text_io::read;

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    global_settings(&[AppSettings::ColoredHelp, AppSettings::VersionlessSubcommands]),
    name = "pcbook",
    about = "A command line utility for the pcbook laptop catalog")]
struct Cli {
    #[structopt(flatten)]
    command: CliCommand,
}

#[derive(Debug, Clone, StructOpt)]
enum CliCommand {
    /// Adds a laptop to the catalog
    #[structopt(name = "create")]
    Create(CreateCommand),
    /// Searches the catalog
    #[structopt(name = "search")]
    Search(SearchCommand),
    /// Uploads an image of a laptop
    #[structopt(name = "upload")]
    Upload(UploadCommand),
    /// Rates one or more laptops
    #[structopt(name = "rate")]
    Rate(RateCommand),
    /// Stores connection information to a pcbook server
    Login,
    /// Removes stored connection information, if it exists
    Logout,
}

#[derive(Debug, Clone, StructOpt)]
struct CreateCommand {
    /// YAML or JSON document describing the laptop
    #[structopt(short = "f", long = "file", parse(from_os_str))]
    file: PathBuf,
}

#[derive(Debug, Clone, StructOpt)]
struct SearchCommand {
    /// Highest price in USD
    #[structopt(long = "max-price")]
    max_price: Option<f64>,

    /// Fewest CPU cores
    #[structopt(long = "min-cores", default_value = "0")]
    min_cores: u32,

    /// Lowest CPU base clock in GHz
    #[structopt(long = "min-ghz", default_value = "0")]
    min_ghz: f64,

    /// Least RAM in gigabytes
    #[structopt(long = "min-ram", default_value = "0")]
    min_ram: u64,
}

#[derive(Debug, Clone, StructOpt)]
struct UploadCommand {
    /// ID of the laptop the image shows
    #[structopt(short = "l", long = "laptop")]
    laptop_id: String,

    /// Path to the image
    #[structopt(short = "i", long = "image", parse(from_os_str))]
    image_path: PathBuf,
}

#[derive(Debug, Clone, StructOpt)]
struct RateCommand {
    /// Laptop to rate. Repeat for several laptops.
    #[structopt(short = "l", long = "laptop", required = true)]
    laptop_ids: Vec<String>,

    /// Score for the laptop in the same position
    #[structopt(short = "s", long = "score", required = true)]
    scores: Vec<f64>,
}

async fn handle_command(cmd: CliCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    match cmd {
        CliCommand::Create(create_cmd) => create(create_cmd).await,
        CliCommand::Search(search_cmd) => search(search_cmd).await,
        CliCommand::Upload(upload_cmd) => upload(upload_cmd).await,
        CliCommand::Rate(rate_cmd) => rate(rate_cmd).await,
        CliCommand::Login => login(),
        CliCommand::Logout => logout(),
    }
}

async fn create(cmd: CreateCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    let mut file = File::open(&cmd.file)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let laptop: Laptop = serde_yaml::from_slice(&buf)?;

    let client = client().await?;
    let result = client.create_laptop(laptop).await;
    client.shutdown().await;
    println!("Laptop {} created.", result?);
    Ok(())
}

async fn search(cmd: SearchCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    let filter = Filter {
        max_price_usd: cmd.max_price.unwrap_or(f64::MAX),
        min_cpu_cores: cmd.min_cores,
        min_cpu_ghz: cmd.min_ghz,
        min_ram: Some(Memory {
            value: cmd.min_ram,
            unit: Unit::Gigabyte as i32,
        }),
    };
    let client = client().await?;
    let result = client.search_laptop(filter).await;
    client.shutdown().await;
    let laptops = result?;
    if laptops.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let mut table = term_table::Table::new();
    table.max_column_width = 40;
    table.style = term_table::TableStyle::extended();
    table.add_row(Row::new(vec![TableCell::new_with_alignment(
        "pcbook Search Results",
        4,
        Alignment::Center,
    )]));
    table.add_row(Row::new(vec![
        TableCell::new_with_alignment("ID", 1, Alignment::Center),
        TableCell::new_with_alignment("Laptop", 1, Alignment::Center),
        TableCell::new_with_alignment("CPU / RAM", 1, Alignment::Center),
        TableCell::new_with_alignment("Price (USD)", 1, Alignment::Center),
    ]));
    for laptop in laptops {
        table.add_row(Row::new(vec![
            TableCell::new(&laptop.id),
            TableCell::new(format!("{} {}", laptop.brand, laptop.name)),
            TableCell::new(format!("{}\n{}", describe_cpu(&laptop), describe_ram(&laptop))),
            TableCell::new_with_alignment(format!("{:.2}", laptop.price_usd), 1, Alignment::Right),
        ]));
    }
    println!("{}", table.render());
    Ok(())
}

fn describe_cpu(laptop: &Laptop) -> String {
    match &laptop.cpu {
        Some(cpu) => format!(
            "{} {} ({} cores, {:.1}-{:.1} GHz)",
            cpu.brand, cpu.name, cpu.number_cores, cpu.min_ghz, cpu.max_ghz
        ),
        None => "-".to_string(),
    }
}

fn describe_ram(laptop: &Laptop) -> String {
    match &laptop.ram {
        Some(ram) => format!("{} {:?}", ram.value, ram.unit()),
        None => "-".to_string(),
    }
}

async fn upload(cmd: UploadCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    use indicatif::{ProgressBar, ProgressStyle};

    let file = File::open(&cmd.image_path)?;
    let image_type = cmd
        .image_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    println!("Uploading {}", cmd.image_path.display());

    let pb = ProgressBar::new(file.metadata()?.len());
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .progress_chars("#>-"));

    let client = client().await?;
    let progress = pb.clone();
    let result = client
        .laptops()
        .upload_image(&cmd.laptop_id, &image_type, file, move |n| progress.inc(n as u64))
        .await;
    client.shutdown().await;

    let response = result?;
    pb.finish_with_message("uploaded");
    println!("Image {} uploaded ({} bytes).", response.id, response.size);
    Ok(())
}

async fn rate(cmd: RateCommand) -> Result<(), Box<dyn ::std::error::Error>> {
    let client = client().await?;
    let result = client.rate_laptop(&cmd.laptop_ids, &cmd.scores).await;
    client.shutdown().await;

    for res in result? {
        println!(
            "Laptop {} rated {} times, average score {:.2}",
            res.laptop_id, res.rated_count, res.average_score
        );
    }
    Ok(())
}

fn config_path() -> Result<PathBuf, Box<dyn ::std::error::Error>> {
    let home = dirs::home_dir().ok_or("cannot find home directory")?;
    Ok(Path::join(&home, ".pcbook/config.yaml"))
}

fn get_config() -> Result<ConnectionConfiguration, Box<dyn ::std::error::Error>> {
    let mut file = File::open(config_path()?)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let config: ConnectionConfiguration = serde_yaml::from_slice(&buf)?;
    Ok(config)
}

async fn client() -> Result<Client, Box<dyn ::std::error::Error>> {
    let config = match get_config() {
        Ok(c) => c,
        Err(_) => ConnectionConfiguration::default(),
    };
    Ok(Client::connect(&config).await?)
}

fn logout() -> Result<(), Box<dyn ::std::error::Error>> {
    match ::std::fs::remove_file(config_path()?) {
        Ok(_) => {
            println!("Connection information removed.");
            Ok(())
        }
        Err(e) => Err(format!("Failed to delete configuration: {}", e).into()),
    }
}

fn prompt(label: &str) -> Result<String, Box<dyn ::std::error::Error>> {
    print!("{}", label);
    io::stdout().flush()?;
    let value: String = read!("{}\n");
    Ok(value.trim().to_string())
}

fn login() -> Result<(), Box<dyn ::std::error::Error>> {
    let defaults = ConnectionConfiguration::default();
    let server_url = prompt(&format!("Enter the server URL [{}]: ", defaults.server_url))?;
    let username = prompt("Enter the username: ")?;
    let password = prompt("Enter the password: ")?;

    let config = ConnectionConfiguration {
        server_url: if server_url.is_empty() {
            defaults.server_url
        } else {
            server_url
        },
        username,
        password,
        refresh_interval_secs: defaults.refresh_interval_secs,
    };
    let yaml = serde_yaml::to_vec(&config)?;
    let file_path = config_path()?;
    if let Some(dir_path) = file_path.parent() {
        ::std::fs::create_dir_all(dir_path)?;
    }
    let mut file = File::create(file_path)?;
    file.write_all(&yaml)?;

    println!("Credentials stored.");

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
