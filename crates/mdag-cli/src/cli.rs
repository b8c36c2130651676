use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mdag_crypto::HashKind;
use mdag_dag::Tag;

#[derive(Parser)]
#[command(
    name = "mdag",
    about = "Content-addressed Merkle DAG for file trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Object store directory
    #[arg(long, global = true, default_value = ".mdag")]
    pub store: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a file or directory into the store and print its root hash
    Add(AddArgs),
    /// Write a file from a stored tree to stdout
    Cat(CatArgs),
    /// Show one stored object
    Inspect(InspectArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub path: PathBuf,
    /// Hash algorithm, overriding the configuration
    #[arg(long)]
    pub hash: Option<HashKind>,
}

#[derive(Args)]
pub struct CatArgs {
    /// Root tree hash (hex)
    pub root: String,
    /// Path inside the tree, e.g. `docs/readme.md`
    pub path: String,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Object hash (hex)
    pub hash: String,
    /// What the object is expected to be
    #[arg(long, default_value = "tree")]
    pub kind: ObjectKind,
}

#[derive(Args)]
pub struct ConfigArgs {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ObjectKind {
    Blob,
    List,
    Tree,
}

impl From<ObjectKind> for Tag {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Blob => Tag::Blob,
            ObjectKind::List => Tag::List,
            ObjectKind::Tree => Tag::Tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_add() {
        let cli = Cli::try_parse_from(["mdag", "add", "src"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("src"));
            assert_eq!(args.hash, None);
        } else { panic!("wrong command"); }
        assert_eq!(cli.store, PathBuf::from(".mdag"));
    }

    #[test]
    fn parse_add_with_hash() {
        let cli = Cli::try_parse_from(["mdag", "add", "--hash", "blake3", "."]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.hash, Some(HashKind::Blake3));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_add_rejects_unknown_hash() {
        assert!(Cli::try_parse_from(["mdag", "add", "--hash", "md5", "."]).is_err());
    }

    #[test]
    fn parse_cat() {
        let cli = Cli::try_parse_from(["mdag", "cat", "abcd", "/a/b.txt"]).unwrap();
        if let Command::Cat(args) = cli.command {
            assert_eq!(args.root, "abcd");
            assert_eq!(args.path, "/a/b.txt");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_inspect_kind() {
        let cli = Cli::try_parse_from(["mdag", "inspect", "ff", "--kind", "list"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.kind, ObjectKind::List);
            assert_eq!(Tag::from(args.kind), Tag::List);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_inspect_defaults_to_tree() {
        let cli = Cli::try_parse_from(["mdag", "inspect", "ff"]).unwrap();
        if let Command::Inspect(args) = cli.command {
            assert_eq!(args.kind, ObjectKind::Tree);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "mdag", "config", "--verbose", "--store", "/tmp/objs", "-c", "mdag.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.store, PathBuf::from("/tmp/objs"));
        assert_eq!(cli.config, Some(PathBuf::from("mdag.toml")));
        assert!(matches!(cli.command, Command::Config(_)));
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["mdag", "--format", "json", "config"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["mdag"]).is_err());
    }
}
