use std::path::PathBuf;

use build_engine::BlockPos;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "blockwright",
    version,
    about = "Generate block structures from a text description",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Config directory (default: platform config dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a structure and place it or save it as a schematic.
    Generate(GenerateArgs),

    /// Show name, size and block counts of a .schem or .json file.
    Inspect(InspectArgs),

    /// Print the system instruction sent with every request.
    Prompt,

    /// Write a default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Save a schematic instead of placing blocks.
    #[arg(long)]
    pub save: bool,

    /// Replay a saved structure document instead of calling the service.
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,

    /// Also write the raw generated document to PATH.
    #[arg(long, value_name = "PATH")]
    pub dump_json: Option<PathBuf>,

    /// Placement origin as X,Y,Z.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_origin, default_value = "0,0,0")]
    pub origin: BlockPos,

    /// Building description.
    #[arg(trailing_var_arg = true, num_args = 0..)]
    pub description: Vec<String>,
}

impl GenerateArgs {
    pub fn description(&self) -> String {
        join_description(&self.description)
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Schematic (.schem) or structure document (.json).
    pub path: PathBuf,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Join words with spaces and strip one pair of surrounding quotes
pub fn join_description(words: &[String]) -> String {
    let joined = words.join(" ");
    let trimmed = joined.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

pub fn parse_origin(raw: &str) -> Result<BlockPos, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected X,Y,Z, got '{}'", raw));
    };
    let coord = |value: &str| {
        value
            .parse::<i32>()
            .map_err(|e| format!("bad coordinate '{}': {}", value, e))
    };
    Ok(BlockPos::new(coord(x)?, coord(y)?, coord(z)?))
}
