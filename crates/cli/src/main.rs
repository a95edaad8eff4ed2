mod cmd;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// assetpack - content-addressed static asset packer
#[derive(Parser)]
#[command(name = "assetpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the build steps and write the fingerprinted bundle
  Build(BuildArgs),

  /// Print the forward manifest of a built bundle
  Manifest {
    /// Bundle directory (default: assets/dist)
    #[arg(long, default_value = "assets/dist")]
    dist: PathBuf,

    /// File name of the manifest inside the bundle
    #[arg(long, default_value = assetpack_lib::consts::DEFAULT_MANIFEST_NAME)]
    manifest_name: String,

    /// Print as reverse (fingerprinted name to logical name)
    #[arg(long)]
    reverse: bool,
  },

  /// Invoke a callback on a running build's bridge
  Call {
    /// Callback name
    #[arg(required_unless_present = "list")]
    name: Option<String>,

    /// Arguments; JSON values are decoded, anything else is passed as a string
    args: Vec<String>,

    /// Socket path (default: $ASSETPACK_SOCK)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// List the registered callbacks instead of calling one
    #[arg(long, conflicts_with = "args")]
    list: bool,
  },

  /// Scaffold an assets directory with a starter step script
  Init {
    /// Assets directory to create (default: assets)
    #[arg(default_value = "assets")]
    path: PathBuf,
  },
}

#[derive(Args)]
pub struct BuildArgs {
  /// Working directory
  #[arg(short = 'C', long, default_value = ".")]
  pub wd: PathBuf,

  /// Assets directory (default: <wd>/assets)
  #[arg(long)]
  pub assets: Option<PathBuf>,

  /// Step script (default: <assets>/assets.lua)
  #[arg(long)]
  pub script: Option<PathBuf>,

  /// Bundle output directory (default: <assets>/dist)
  #[arg(long)]
  pub dist: Option<PathBuf>,

  /// Number of parallel tool invocations per step
  #[arg(short = 'j', long)]
  pub workers: Option<usize>,

  /// Manifest file name inside the bundle
  #[arg(long)]
  pub manifest_name: Option<String>,

  /// URL prefix returned by the asset callback
  #[arg(long)]
  pub prefix: Option<String>,

  /// Embeddable listing file (default: <assets>/assets.rs)
  #[arg(long)]
  pub embed_file: Option<PathBuf>,

  /// Identifier of the generated asset table
  #[arg(long)]
  pub embed_ident: Option<String>,

  /// Translate function name used in templates
  #[arg(long = "trans")]
  pub trans_func_name: Option<String>,

  /// Output format
  #[arg(short, long, value_enum, default_value_t)]
  pub output: OutputFormat,
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(args, cli.verbose),
    Commands::Manifest {
      dist,
      manifest_name,
      reverse,
    } => cmd::cmd_manifest(&dist, &manifest_name, reverse),
    Commands::Call {
      name,
      args,
      socket,
      list,
    } => cmd::cmd_call(name.as_deref(), &args, socket, list),
    Commands::Init { path } => cmd::cmd_init(&path),
  };

  if let Err(e) = result {
    output::print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}
