use std::path::{Path, PathBuf};
use std::process;

use log::{error, info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use structopt::StructOpt;

use sentidex::loader::{self, TsvTokenSource};
use sentidex::{IndexingConfig, Indexer, CONFIG_FILE, SENTIDEX_VERSION};
use sentidex_common::{Result, SentimentLexicon};

#[derive(StructOpt, Debug)]
#[structopt(name = "sentidex")]
struct CliArgs {
    #[structopt(parse(from_os_str), help = "Documents to index, one `doc id <TAB> text` line each")]
    tokens_file_path: PathBuf,
    #[structopt(parse(from_os_str))]
    output_folder_path: PathBuf,
    #[structopt(short, long, parse(from_os_str), help = "Indexing configuration, defaults to sentidex.json in the output folder")]
    config_file_path: Option<PathBuf>,
    #[structopt(short, long, parse(from_os_str), help = "Sentiment lexicon, one `term <TAB> score` line each")]
    sentiment_lexicon_path: Option<PathBuf>,
    #[structopt(long, parse(from_os_str), help = "Folder for temporary blocks, defaults to the output folder")]
    construction_dir: Option<PathBuf>,
    #[structopt(short, long)]
    verbose: bool,
    #[structopt(long, hidden = true)]
    perf: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level));

    match config {
        Ok(config) => {
            if let Err(err) = log4rs::init_config(config) {
                eprintln!("Failed to initialise logging: {}", err);
            }
        }
        Err(err) => eprintln!("Invalid logging configuration: {}", err),
    }
}

fn load_config(args: &CliArgs) -> Result<IndexingConfig> {
    let config_file_path = args
        .config_file_path
        .clone()
        .unwrap_or_else(|| args.output_folder_path.join(CONFIG_FILE));

    if config_file_path.is_file() {
        info!("Using configuration {}", config_file_path.display());
        IndexingConfig::from_json_file(&config_file_path)
    } else {
        if args.config_file_path.is_some() {
            warn!("Configuration {} not found, using defaults", config_file_path.display());
        }
        Ok(IndexingConfig::default())
    }
}

fn load_lexicon(path: Option<&Path>) -> Result<SentimentLexicon> {
    match path {
        Some(path) => {
            let lexicon = loader::load_sentiment_lexicon_file(path)?;
            info!("Loaded {} sentiment scores from {}", lexicon.len(), path.display());
            Ok(lexicon)
        }
        None => {
            warn!("No sentiment lexicon given, every term gets a sentiment of 0");
            Ok(SentimentLexicon::default())
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = load_config(&args)?;
    let lexicon = load_lexicon(args.sentiment_lexicon_path.as_deref())?;
    let construction_dir = args.construction_dir.clone().unwrap_or_else(|| args.output_folder_path.clone());

    let indexer = Indexer::new(config, &construction_dir, &args.output_folder_path, lexicon)?.with_perf_logging(args.perf);

    let mut source = TsvTokenSource::open(&args.tokens_file_path)?;
    let summary = indexer.index(&mut source)?;
    if let Some(err) = source.take_error() {
        // The index was built from the documents read before the failure
        return Err(err.into());
    }

    println!(
        "{} documents, {} terms -> {}",
        summary.doc_count,
        summary.term_count,
        summary.output_dir.join(&summary.index_name).display(),
    );

    Ok(())
}

fn main() {
    let args: CliArgs = CliArgs::from_args();
    init_logging(args.verbose);

    info!("sentidex {}", SENTIDEX_VERSION);

    if let Err(err) = run(args) {
        error!("Indexing failed: {}", err);
        process::exit(1);
    }
}
