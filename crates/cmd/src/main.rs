//! nest: drive a host-directory-backed filesystem from the command line.
//!
//! The store location comes from --store, then $NESTFS_STORE, then
//! ./nest-store. All operations run through the warden layer; --scope
//! restricts an invocation to paths under a prefix.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nestfs::{Fs, HostDirStorage};
use warden::{Grant, PermissionChecker, ScopedFs};

#[derive(Parser)]
#[command(name = "nest", about = "A scoped virtual filesystem over key-value storage")]
struct Cli {
    /// Storage directory; defaults to $NESTFS_STORE, then ./nest-store.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Restrict this invocation to paths under the given prefix.
    #[arg(long)]
    scope: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the store and seed the initial tree.
    Init,
    /// Create a directory, including missing parents.
    Mkdir { path: String },
    /// List a directory.
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file as text.
    Cat { path: String },
    /// Write text to a file, creating parents as needed.
    Write { path: String, text: String },
    /// Delete a file.
    Rm { path: String },
    /// Remove an empty directory.
    Rmdir { path: String },
    /// Move or rename a file or directory.
    Mv { old: String, new: String },
    /// Deep-copy a file or directory.
    Cp { src: String, dest: String },
    /// Show metadata for a path.
    Stat { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init_diagnostics();
    let cli = Cli::parse();

    let store = cli
        .store
        .or_else(|| std::env::var_os("NESTFS_STORE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("nest-store"));

    let storage = HostDirStorage::open(&store)
        .await
        .with_context(|| format!("opening store {}", store.display()))?;
    let fs = Fs::open(Arc::new(storage))
        .await
        .context("opening filesystem")?;

    let checker = Arc::new(PermissionChecker::new());
    let prefix = cli.scope.as_deref().unwrap_or("/");
    checker.register_caller("cli", vec![Grant::readwrite(prefix)], vec![])?;
    let scoped = ScopedFs::new(fs, checker, "cli");

    run(&scoped, cli.command).await
}

async fn run(fs: &ScopedFs, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            // Opening the store already seeded it on first use.
            println!("store ready");
        }
        Command::Mkdir { path } => {
            fs.mkdir(&path).await?;
        }
        Command::Ls { path } => {
            for entry in fs.readdir(&path).await? {
                let marker = if entry.is_directory { "d" } else { "-" };
                println!("{} {:>8}  {}", marker, entry.size, entry.name);
            }
        }
        Command::Cat { path } => {
            print!("{}", fs.read_text_file(&path).await?);
        }
        Command::Write { path, text } => {
            fs.write_text_file(&path, &text).await?;
        }
        Command::Rm { path } => {
            fs.delete_file(&path).await?;
        }
        Command::Rmdir { path } => {
            fs.rmdir(&path).await?;
        }
        Command::Mv { old, new } => {
            fs.rename(&old, &new).await?;
        }
        Command::Cp { src, dest } => {
            fs.copy(&src, &dest).await?;
        }
        Command::Stat { path } => {
            let stat = fs.stat(&path).await?;
            let kind = if stat.is_directory { "directory" } else { "file" };
            println!("path:     {}", stat.path);
            println!("kind:     {}", kind);
            println!("size:     {}", stat.size);
            if let Some(mime) = &stat.mime_type {
                println!("mime:     {}", mime);
            }
            println!("created:  {}", stat.created_at);
            println!("updated:  {}", stat.updated_at);
        }
    }
    Ok(())
}
