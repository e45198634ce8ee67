use anyhow::Result;
use std::path::PathBuf;

use lightbox::analysis::AnalysisCoordinator;
use lightbox::config::Config;
use lightbox::facets::FacetCache;
use lightbox::filter::{filter_photos, FilterCriteria};
use lightbox::import::import_directory;
use lightbox::logging;
use lightbox::store::PhotoStore;

struct CliArgs {
    config_path: Option<PathBuf>,
    directory: PathBuf,
    criteria: FilterCriteria,
    show_facets: bool,
    analyze: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = None;
    let mut directory = None;
    let mut criteria = FilterCriteria::default();
    let mut show_facets = false;
    let mut analyze = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("lightbox {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(required_value(&args, i, "--config")));
                i += 1;
            }
            "--folder" => {
                criteria.folder_prefix = Some(required_value(&args, i, "--folder"));
                i += 1;
            }
            "--tag" => {
                criteria.required_tags.push(required_value(&args, i, "--tag"));
                i += 1;
            }
            "--min-rating" => {
                let value = required_value(&args, i, "--min-rating");
                criteria.min_rating = match value.parse::<u8>() {
                    Ok(n) if n <= 5 => n,
                    _ => {
                        eprintln!("Error: --min-rating expects a number from 0 to 5");
                        std::process::exit(1);
                    }
                };
                i += 1;
            }
            "--search" => {
                criteria.search_text = required_value(&args, i, "--search");
                i += 1;
            }
            "--facets" => show_facets = true,
            "--analyze" => analyze = true,
            other if !other.starts_with('-') && directory.is_none() => {
                directory = Some(PathBuf::from(other));
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let directory = match directory {
        Some(dir) => dir,
        None => {
            eprintln!("Error: a directory to import is required");
            print_help();
            std::process::exit(1);
        }
    };

    CliArgs {
        config_path,
        directory,
        criteria,
        show_facets,
        analyze,
    }
}

fn required_value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i + 1) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"lightbox - photo library browser with AI-assisted tagging

USAGE:
    lightbox [OPTIONS] DIRECTORY

OPTIONS:
    --config, -c PATH   Path to config file
    --folder PREFIX     Only photos whose relative path starts with PREFIX
    --tag TAG           Require TAG (repeat the flag to require several)
    --min-rating N      Only photos rated N or higher (0-5)
    --search TEXT       Match TEXT against filenames and tags
    --facets            Print folder and tag facets before the listing
    --analyze           Run AI analysis on the visible photos
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    GEMINI_API_KEY      Vision service credential (config file fallback)
    LIGHTBOX_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/lightbox/config.toml"#
    );
}

fn print_listing(store: &PhotoStore, criteria: &FilterCriteria) {
    let visible = filter_photos(store.records(), criteria);
    println!(
        "Showing {} of {} photo{}",
        visible.len(),
        store.len(),
        if store.len() == 1 { "" } else { "s" }
    );

    for photo in &visible {
        let rating = if photo.rating == 0 {
            "-".to_string()
        } else {
            "*".repeat(photo.rating as usize)
        };
        let mut line = format!("  {:<40} {:<5} [{}]", photo.metadata.path, rating, photo.tags.join(", "));
        if let Some(description) = &photo.ai_description {
            line.push_str("  ");
            line.push_str(description);
        }
        println!("{}", line.trim_end());
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = logging::init(None);

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let mut store = PhotoStore::new();
    store.append(import_directory(&args.directory, &config.import)?);

    if args.show_facets {
        let mut facets = FacetCache::new();
        let summary = facets.summary(&store);
        println!("Folders:");
        for folder in &summary.folders {
            println!("  /{}", folder);
        }
        println!("Tags:");
        for (tag, count) in &summary.tag_counts {
            println!("  {} ({})", tag, count);
        }
    }

    print_listing(&store, &args.criteria);

    if args.analyze {
        let mut coordinator = AnalysisCoordinator::from_config(&config.analysis);
        if !coordinator.available() {
            eprintln!("API key missing. AI features disabled.");
            return Ok(());
        }

        let visible: Vec<_> = filter_photos(store.records(), &args.criteria)
            .iter()
            .map(|p| p.id)
            .collect();
        println!("Analyzing {} photo(s)...", visible.len());

        for id in visible {
            coordinator.request(&mut store, id)?;
        }
        for event in coordinator.wait_all(&mut store) {
            if !event.success {
                eprintln!("{}", event.message);
            }
        }

        print_listing(&store, &args.criteria);
    }

    Ok(())
}
