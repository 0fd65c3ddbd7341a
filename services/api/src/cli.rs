use crate::demo::{
    print_standard_catalog, print_template_catalog, print_workflow_graph, run_demo, DemoArgs,
    TemplateImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use expediente::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Expediente",
    about = "Run and demonstrate the immigration case-file checklist service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk a sample case file through the workflow and print its checklist
    Demo(DemoArgs),
    /// Inspect requirement template catalogs
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },
    /// Inspect the status workflow
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// Validate a CSV template catalog and print its entries
    Import(TemplateImportArgs),
    /// Print the built-in catalog grouped by trigger status
    Standard,
}

#[derive(Subcommand, Debug)]
enum WorkflowCommand {
    /// Print the allowed status transitions
    Graph,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Templates {
            command: TemplatesCommand::Import(args),
        } => print_template_catalog(args),
        Command::Templates {
            command: TemplatesCommand::Standard,
        } => {
            print_standard_catalog();
            Ok(())
        }
        Command::Workflow {
            command: WorkflowCommand::Graph,
        } => {
            print_workflow_graph();
            Ok(())
        }
    }
}
