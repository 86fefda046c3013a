use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use dotenv::dotenv;
use log::{debug, info, initialize_logger};
use structopt::StructOpt;

use petmatch::config::get_variable;
use petmatch::db::{LocalRepository, Repository};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "seed-local",
    about = "Bootstrap local animal storage and print what it holds"
)]
struct Opt {
    /// The storage directory (defaults to BACKEND_LOCAL_STORAGE_DIR)
    #[structopt(parse(from_os_str))]
    directory: Option<PathBuf>,

    /// Only print animals of this type
    #[structopt(short, long)]
    tipo: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = Arc::new(initialize_logger());

    let directory = opt
        .directory
        .unwrap_or_else(|| PathBuf::from(get_variable("BACKEND_LOCAL_STORAGE_DIR")));

    info!(logger, "Bootstrapping local storage..."; "directory" => %directory.display());
    let repository = LocalRepository::open(logger.clone(), directory).await?;
    debug!(logger, "Storage is ready"; "path" => %repository.path().display());

    let animals = match &opt.tipo {
        Some(tipo) => repository.list_by_type(tipo).await?,
        None => repository.list().await?,
    };

    info!(logger, "Found {} animals", animals.len());
    println!("{}", serde_json::to_string_pretty(&animals)?);

    Ok(())
}
