use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use db5_codec::ReadConfig;

#[derive(Parser)]
#[command(
    name = "db5",
    about = "Inspect and edit BRL-CAD v5 database files",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Refuse objects whose declared length exceeds this many bytes
    #[arg(long, global = true)]
    pub max_object_size: Option<u64>,

    /// Do not require the database identity header
    #[arg(long, global = true)]
    pub no_ident: bool,
}

impl Cli {
    pub fn read_config(&self, include_free: bool) -> ReadConfig {
        let defaults = ReadConfig::default();
        ReadConfig {
            max_object_len: self.max_object_size.unwrap_or(defaults.max_object_len),
            require_identity: !self.no_ident,
            include_free,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Verify the identity header and every object
    Check(CheckArgs),
    /// List objects
    Ls(LsArgs),
    /// Print the attributes of one object
    Attrs(AttrsArgs),
    /// Create a new, empty database
    Init(InitArgs),
    /// Copy a database, setting attributes on one object
    SetAttr(SetAttrArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct LsArgs {
    pub file: PathBuf,
    /// Include header and free-storage objects
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Args)]
pub struct AttrsArgs {
    pub file: PathBuf,
    pub object: String,
}

#[derive(Args)]
pub struct InitArgs {
    pub file: PathBuf,
    #[arg(long, default_value = "Untitled v5 BRL-CAD Database")]
    pub title: String,
    /// Millimetres per local unit
    #[arg(long, default_value = "1.0")]
    pub units_mm: f64,
}

#[derive(Args)]
pub struct SetAttrArgs {
    pub file: PathBuf,
    pub object: String,
    /// Attributes as name=value
    #[arg(required = true, value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,
    #[arg(short, long)]
    pub output: PathBuf,
}

fn parse_attribute(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["db5", "check", "model.g"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("model.g"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_ls_all() {
        let cli = Cli::try_parse_from(["db5", "ls", "--all", "model.g"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert!(args.all);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_init_defaults() {
        let cli = Cli::try_parse_from(["db5", "init", "new.g"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.title, "Untitled v5 BRL-CAD Database");
            assert_eq!(args.units_mm, 1.0);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_set_attr() {
        let cli = Cli::try_parse_from([
            "db5", "set-attr", "in.g", "ell.s", "color=0/0/255", "note=a=b", "-o", "out.g",
        ])
        .unwrap();
        if let Command::SetAttr(args) = cli.command {
            assert_eq!(args.object, "ell.s");
            assert_eq!(
                args.attributes,
                vec![
                    ("color".to_string(), "0/0/255".to_string()),
                    ("note".to_string(), "a=b".to_string()),
                ]
            );
            assert_eq!(args.output, PathBuf::from("out.g"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn set_attr_rejects_bare_word() {
        assert!(
            Cli::try_parse_from(["db5", "set-attr", "in.g", "x", "oops", "-o", "o.g"]).is_err()
        );
    }

    #[test]
    fn read_config_from_flags() {
        let cli = Cli::try_parse_from([
            "db5", "--no-ident", "--max-object-size", "4096", "check", "model.g",
        ])
        .unwrap();
        let config = cli.read_config(true);
        assert_eq!(config.max_object_len, 4096);
        assert!(!config.require_identity);
        assert!(config.include_free);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["db5", "--format", "json", "check", "model.g"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
