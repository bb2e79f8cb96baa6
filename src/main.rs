use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use steprule::flow::graph::compile;
use steprule::flow::loader::RuleLoader;
use steprule::flow::selector::resolve;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a step map into a flow graph
    Graph {
        /// Path to the step map (YAML or JSON)
        #[arg(short, long)]
        file: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Resolve a selector against field values
    Resolve {
        /// Path to the selector (YAML or JSON)
        #[arg(short, long)]
        file: String,

        /// Path to the field values (YAML or JSON)
        #[arg(short, long)]
        values: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Json,
    Dot,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    print!("{}", run(args)?);
    Ok(())
}

/// Execute a subcommand and return what it prints
fn run(args: Args) -> anyhow::Result<String> {
    let loader = RuleLoader::new();

    let output = match args.command {
        Commands::Graph { file, format } => {
            let steps = loader
                .load_steps(&file)
                .with_context(|| format!("Failed to load steps from {}", file))?;
            log::info!("Compiling {} steps from {}", steps.len(), file);

            let compilation = compile(&steps);
            if !compilation.diagnostics.is_empty() {
                log::info!(
                    "{} branch(es) could not be drawn",
                    compilation.diagnostics.len()
                );
            }

            match format {
                Format::Json => format!("{}\n", serde_json::to_string_pretty(&compilation.graph)?),
                Format::Dot => compilation.graph.to_dot(),
            }
        }
        Commands::Resolve { file, values } => {
            let selector = loader
                .load_selector(&file)
                .with_context(|| format!("Failed to load selector from {}", file))?;
            let fields = loader
                .load_values(&values)
                .with_context(|| format!("Failed to load values from {}", values))?;
            log::info!("Resolving {} against {} field values", file, fields.len());

            match resolve(&selector, &fields, &()) {
                Some(key) => format!("{}\n", key),
                None => "(none)\n".to_string(),
            }
        }
    };

    Ok(output)
}
