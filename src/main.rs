use anyhow::Context as _;
use cacao_conditions::condition::{evaluate, resolve_variable, validate_condition};
use cacao_conditions::{CaseAccessor, Context, FixtureCaseAccessor};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a condition, exiting 0 when true and 1 when false
    Eval {
        /// The condition to evaluate
        #[arg(short, long)]
        condition: String,

        #[command(flatten)]
        sources: Sources,
    },
    /// Check the shape of a condition without evaluating it
    Validate {
        /// The condition to validate
        #[arg(short, long)]
        condition: String,
    },
    /// Print the values a variable reference resolves to
    Resolve {
        /// Variable reference, e.g. `$$host$$:ips[*]`
        #[arg(short, long)]
        variable: String,

        #[command(flatten)]
        sources: Sources,
    },
    /// Check that every context variable fits its declared type
    CheckContext {
        /// Path to the context file (YAML or JSON)
        #[arg(long)]
        context: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
struct Sources {
    /// Path to the context file (YAML or JSON)
    #[arg(long)]
    context: Option<PathBuf>,

    /// Path to a case fixture file (YAML or JSON)
    #[arg(long)]
    cases: Option<PathBuf>,

    /// Case the condition runs against
    #[arg(long)]
    case_id: Option<String>,
}

impl Sources {
    fn load(&self) -> anyhow::Result<(Context, Option<FixtureCaseAccessor>)> {
        let context = match &self.context {
            Some(path) => {
                log::info!("Loading context from {}", path.display());
                let context = Context::load(path)
                    .with_context(|| format!("Failed to load context {}", path.display()))?;
                context.check()?;
                context
            }
            None => Context::new(),
        };

        let cases = match &self.cases {
            Some(path) => {
                log::info!("Loading cases from {}", path.display());
                Some(
                    FixtureCaseAccessor::load(path)
                        .with_context(|| format!("Failed to load cases {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok((context, cases))
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> anyhow::Result<bool> {
    match args.command {
        Commands::Eval { condition, sources } => {
            let (context, cases) = sources.load()?;
            let accessor = cases.as_ref().map(|c| c as &dyn CaseAccessor);

            let result = evaluate(&condition, &context, sources.case_id.as_deref(), accessor)?;
            log::info!("Condition evaluated to {}", result);
            println!("{}", result);
            Ok(result)
        }
        Commands::Validate { condition } => {
            validate_condition(&condition)?;
            println!("valid");
            Ok(true)
        }
        Commands::Resolve { variable, sources } => {
            let (context, cases) = sources.load()?;
            let accessor = cases.as_ref().map(|c| c as &dyn CaseAccessor);

            let values =
                resolve_variable(&variable, &context, sources.case_id.as_deref(), accessor)?;
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(true)
        }
        Commands::CheckContext { context } => {
            let loaded = Context::load(&context)
                .with_context(|| format!("Failed to load context {}", context.display()))?;
            loaded.check()?;
            println!("{} variable(s) ok", loaded.len());
            Ok(true)
        }
    }
}
