use clap::Parser;
use log::debug;
use recipe_extract::{
    validate_url, ExtractConfig, ExtractError, FetchStrategy, OutputSchema, Progress,
    QuantityPolicy, RecipePipeline, UnknownUnitQuantity,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "recipe-extract")]
#[command(about = "Extracts a recipe from a web page", long_about = None)]
struct Cli {
    /// A URL to a web page which contains a recipe
    recipe_url: String,

    /// Render the page in headless Chrome before extracting
    #[arg(long)]
    rendered: bool,

    /// JSON shape requested from the model (custom or schema-org)
    #[arg(long)]
    schema: Option<OutputSchema>,

    /// Keep decimal quantities instead of rounding to whole numbers
    #[arg(long)]
    fractional: bool,

    /// Discard quantities whose unit is neither mass nor volume
    #[arg(long)]
    drop_unknown_quantities: bool,

    /// SQLite database to store the extracted recipe in
    #[arg(long)]
    database: Option<PathBuf>,

    /// Configuration file (default: recipe-extract.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = validate_url(&cli.recipe_url) {
        eprintln!("{e}");
        return ExitCode::from(2);
    }

    match run(cli).await {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("{e:?}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String, ExtractError> {
    let mut config = ExtractConfig::load(cli.config.as_deref())?;
    if cli.rendered {
        config.fetch.strategy = FetchStrategy::Rendered;
    }
    if let Some(schema) = cli.schema {
        config.schema = schema;
    }
    if cli.fractional {
        config.normalization.quantity = QuantityPolicy::Fractional;
    }
    if cli.drop_unknown_quantities {
        config.normalization.unknown_unit_quantity = UnknownUnitQuantity::Drop;
    }
    if cli.database.is_some() {
        config.storage.database = cli.database;
    }

    let extraction = RecipePipeline::builder()
        .config(config)
        .on_progress(|progress| match progress {
            Progress::Fetching(url) => eprintln!("Getting recipe content from: {url}"),
            Progress::Generating => eprintln!("Generating..."),
        })
        .build()?
        .run(&cli.recipe_url)
        .await?;

    if let Some(id) = extraction.stored_id {
        eprintln!("Stored recipe #{id}");
    }
    Ok(extraction.document.to_pretty_json()?)
}
