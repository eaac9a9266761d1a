use std::process::{Command, ExitCode};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask", about = "Development tasks for checklist")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo fmt --check
    Fmt,
    /// Run cargo check
    Check,
    /// Run cargo clippy
    Clippy,
    /// Run cargo test
    Test {
        /// Only test this package
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Build documentation with warnings denied
    Doc,
    /// Run all CI checks (fmt, check, clippy, test, doc)
    Ci,
    /// Install the checklist binary with cargo install
    Install,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Fmt => cmd_fmt(),
        Commands::Check => cmd_check(),
        Commands::Clippy => cmd_clippy(),
        Commands::Test { package } => cmd_test(package.as_deref()),
        Commands::Doc => cmd_doc(),
        Commands::Ci => cmd_ci(),
        Commands::Install => cmd_install(),
    }
}

fn cmd_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--check"], &[])
}

fn cmd_check() -> Result<()> {
    cargo(&["check", "--workspace", "--all-targets"], &[])
}

fn cmd_clippy() -> Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        &[],
    )
}

fn cmd_test(package: Option<&str>) -> Result<()> {
    match package {
        Some(package) => cargo(&["test", "-p", package], &[]),
        None => cargo(&["test", "--workspace"], &[]),
    }
}

fn cmd_doc() -> Result<()> {
    cargo(
        &["doc", "--workspace", "--no-deps"],
        &[("RUSTDOCFLAGS", "-D warnings")],
    )
}

fn cmd_ci() -> Result<()> {
    cmd_fmt()?;
    cmd_check()?;
    cmd_clippy()?;
    cmd_test(None)?;
    cmd_doc()?;
    Ok(())
}

fn cmd_install() -> Result<()> {
    cargo(&["install", "--path", "crates/checklist", "--locked"], &[])
}

fn cargo(args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
    exec("cargo", args, envs)
}

fn exec(program: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
    let cmd_line = format!("{program} {}", args.join(" "));
    eprintln!("$ {cmd_line}");

    let status = Command::new(program)
        .args(args)
        .envs(envs.iter().copied())
        .status()
        .with_context(|| format!("Failed to execute: {cmd_line}"))?;

    if !status.success() {
        let code_info = match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        bail!("{cmd_line}: {code_info}");
    }
    Ok(())
}
