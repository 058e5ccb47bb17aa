use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trellis::config::{self, Overrides, SiteConfig};
use trellis::generate;
use trellis::{output, resolve, scan};

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Static site generator with metadata-driven dynamic routes")]
#[command(long_about = "\
Static site generator with metadata-driven dynamic routes

The content directory is mirrored into the site. Markdown and HTML files
become pages, everything else is copied as-is, and a [name] segment in a
path expands into one page per value of `name` in the file's front matter.

Project structure:

  my-site/
  ├── config.toml                  # Optional, see 'trellis gen-config'
  ├── content/
  │   ├── index.md                 # → /
  │   ├── about.html               # → /about
  │   ├── blog/
  │   │   ├── index.md             # → /blog
  │   │   └── hello.md             # → /blog/hello
  │   ├── tags/
  │   │   └── [tag].html           # → /tags/<each value of `tag`>
  │   └── static/logo.png          # → /static/logo.png (copied)
  ├── partials/nav.html            # {% include \"nav.html\" %}
  └── templates/base.html          # template: base.html

Front matter values starting with {{ are expressions, evaluated against
the page's metadata, `self` and `allRoutes`:

  ---
  tag: \"{{ allRoutes | filter_href(pattern='/blog/*') | meta_values(key='tag') }}\"
  ---")]
#[command(version)]
struct Cli {
    /// Project directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Content directory, relative to --project (overrides config.toml)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Output directory, relative to --project (overrides config.toml)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: scan → resolve → generate
    Build,
    /// Scan and resolve, then print the route tree without writing anything
    Routes,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build => {
            let site = load_site(&cli)?;
            let source = site.content_path(&cli.project);
            let render = site.render_config(&cli.project);

            println!("==> Stage 1: Scanning {}", source.display());
            let mut tree = scan::load_routes(&source)?;

            println!("==> Stage 2: Resolving routes");
            let iterations = resolve::resolve(&mut tree, site.resolve.max_iterations)?;
            output::print_route_tree(&tree);
            println!("Resolved in {iterations} iteration(s)");

            println!(
                "==> Stage 3: Generating site → {}",
                render.output_dir.display()
            );
            let generated = generate::generate(&tree, &render)?;
            output::print_generate_output(&generated, &render.output_dir);

            println!("==> Build complete: {}", render.output_dir.display());
        }
        Command::Routes => {
            let site = load_site(&cli)?;
            let source = site.content_path(&cli.project);
            println!("==> Resolving {}", source.display());
            let mut tree = scan::load_routes(&source)?;
            let iterations = resolve::resolve(&mut tree, site.resolve.max_iterations)?;
            output::print_route_tree(&tree);
            println!("Resolved in {iterations} iteration(s)");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` still applies; each `-v` lowers
/// the default threshold one level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// `config.toml` with the command-line directory overrides applied.
fn load_site(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let overrides = Overrides {
        content_dir: cli.source.clone(),
        output_dir: cli.output.clone(),
    };
    config::load_config(&cli.project)?.with_overrides(&overrides)
}
