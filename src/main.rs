use clap::{Parser, Subcommand};
use std::path::PathBuf;
use szyslak::assets::RustBackend;
use szyslak::walk::CancelFlag;
use szyslak::{config, output, pipeline};

#[derive(Parser)]
#[command(name = "szyslak")]
#[command(about = "Static site builder: templates, data, front matter and assets")]
#[command(long_about = "\
Static site builder: templates, data, front matter and assets

Your source directory mirrors the site. HTML files are rendered through
Tera with their YAML front matter and the global data; SCSS is compiled,
CSS and JavaScript are minified, and everything else is copied.

Source structure:

  src/
  ├── data/                 # site.json, nav.yaml ... → {{ site }}, {{ nav }}
  ├── templates/            # layout.html wraps every page; others are includable
  ├── vendor/               # third-party files, mirrored per szyslak.toml
  ├── index.html            # page: front matter + Tera body
  ├── blog/
  │   ├── index.html        # needs_children: true → {{ children }}
  │   └── first-post/
  │       └── index.html
  ├── css/
  │   ├── _colors.scss      # partial, only imported
  │   └── site.scss         # → css/site.css (compiled + minified)
  └── js/app.js             # → js/app.js (minified)

Context precedence (later wins): page meta → global data → front matter.

Run 'szyslak gen-config' to generate a documented szyslak.toml.")]
#[command(version)]
struct Cli {
    /// Source directory
    #[arg(long, default_value = "src", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(
        long,
        short = 't',
        visible_alias = "target",
        default_value = "dist",
        global = true
    )]
    output: PathBuf,

    /// Config file [default: szyslak.toml beside the source directory]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: data + templates + vendor → pages + assets
    Build,
    /// Load config, data and templates and plan the build without writing
    Check,
    /// Remove the output directory
    Clean,
    /// Print a stock szyslak.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| pipeline::default_config_path(&cli.source));

    match cli.command {
        Command::Build => {
            let site_config = config::load_config(&config_path)?;
            init_thread_pool(&site_config.processing);

            let cancel = CancelFlag::new();
            let handler_flag = cancel.clone();
            ctrlc::set_handler(move || handler_flag.cancel())?;

            println!(
                "==> Building {} → {}",
                cli.source.display(),
                cli.output.display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = pipeline::build(
                &cli.source,
                &cli.output,
                &site_config,
                &RustBackend::new(),
                &cancel,
                Some(&tx),
            );
            drop(tx);
            printer.join().map_err(|_| "output thread panicked")?;

            let summary = result?;
            output::print_build_summary(&summary);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let site_config = config::load_config(&config_path)?;
            println!("==> Checking {}", cli.source.display());
            let report = pipeline::check(&cli.source, &cli.output, &site_config)?;
            output::print_check_output(
                &report,
                &cli.source,
                &cli.output,
                &site_config.render.layout,
            );
            println!("==> Site is valid");
        }
        Command::Clean => {
            if pipeline::clean(&cli.output)? {
                println!("==> Removed {}", cli.output.display());
            } else {
                println!("==> Nothing to clean at {}", cli.output.display());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
