use std::path::PathBuf;
use std::{env, fs, io, process};

use adfilter::{report, ContentType, Request, RuleSet};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Check requests against AdGuard/AdBlock filter lists.
#[derive(Parser)]
#[command(name = "adfilter")]
struct Cli {
    /// Filter list files
    #[arg(required = true)]
    lists: Vec<PathBuf>,

    /// URL of the checked request
    #[arg(long, required_unless_present = "summary")]
    url: Option<String>,

    /// URL of the page which sent the request
    #[arg(long)]
    referrer: Option<String>,

    /// Request content type, like `script` or `image`, detected from the URL if omitted
    #[arg(long = "content-type", value_parser = parse_content_type)]
    content_types: Vec<ContentType>,

    /// Print the number of rules of each kind instead of matching a request
    #[arg(long)]
    summary: bool,
}

fn main() {
    // Setup logging.
    let directives = env::var("RUST_LOG").unwrap_or("warn,adfilter=info".into());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    FmtSubscriber::builder()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    // Parse all filter lists.
    let mut rules = RuleSet::default();
    for path in &cli.lists {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                eprintln!("Invalid input file {path:?}: {err}");
                process::exit(1);
            },
        };

        rules.extend_from_text(&content);
    }
    info!("Loaded {} rules from {} filter lists", rules.len(), cli.lists.len());

    let url = match cli.url {
        Some(url) if !cli.summary => url,
        _ => {
            println!("{}", rules.summary());
            return;
        },
    };

    let mut request = Request::new(&url, cli.referrer.as_deref());
    if !cli.content_types.is_empty() {
        let content_types = cli.content_types.iter().fold(ContentType::NONE, |acc, ty| acc | *ty);
        request = request.with_content_types(content_types);
    }

    // Write the match report to STDOUT.
    let matches = rules.matching_url_rules(&request);
    if let Err(err) = report::write_json(&mut io::stdout(), &request, &matches) {
        eprintln!("Match report failed: {err}");
        process::exit(2);
    }
}

fn parse_content_type(name: &str) -> Result<ContentType, String> {
    ContentType::from_option(name).ok_or_else(|| format!("unknown content type {name:?}"))
}
