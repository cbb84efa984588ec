use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for meshview")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy and tests on every tier, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy {
        #[arg(long, value_enum, default_value_t = TierArg::All)]
        tier: TierArg,
    },
    /// Run all tests
    Test {
        #[arg(long, value_enum, default_value_t = TierArg::All)]
        tier: TierArg,
    },
    /// Build rustdoc for the workspace
    Doc,
    /// Build the viewer
    Build {
        #[arg(long, value_enum, default_value_t = TierArg::Gl4)]
        tier: TierArg,
        #[arg(long)]
        release: bool,
    },
}

/// OpenGL capability tier to build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TierArg {
    /// OpenGL 4.3 core (default features)
    Gl4,
    /// OpenGL ES 3.0 (`gles3` feature)
    Gles3,
    /// Both tiers, one after the other
    All,
}

impl TierArg {
    fn tiers(self) -> &'static [TierArg] {
        match self {
            TierArg::Gl4 => &[TierArg::Gl4],
            TierArg::Gles3 => &[TierArg::Gles3],
            TierArg::All => &[TierArg::Gl4, TierArg::Gles3],
        }
    }

    /// Extra cargo arguments selecting this tier.
    fn feature_args(self) -> &'static [&'static str] {
        match self {
            TierArg::Gles3 => &["--features", "meshview-desktop/gles3"],
            _ => &[],
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy(TierArg::All)?;
            run_tests(TierArg::All)?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy { tier } => run_clippy(tier)?,
        Commands::Test { tier } => run_tests(tier)?,
        Commands::Doc => run_doc()?,
        Commands::Build { tier, release } => run_build(tier, release)?,
    }

    Ok(())
}

fn cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy(tier: TierArg) -> Result<()> {
    for tier in tier.tiers() {
        let mut args = vec!["clippy", "--workspace", "--all-targets"];
        args.extend(tier.feature_args());
        args.extend(["--", "-D", "warnings"]);
        cargo(&format!("cargo clippy ({tier:?})"), &args)?;
    }
    Ok(())
}

fn run_tests(tier: TierArg) -> Result<()> {
    for tier in tier.tiers() {
        let mut args = vec!["test", "--workspace"];
        args.extend(tier.feature_args());
        cargo(&format!("cargo test ({tier:?})"), &args)?;
    }
    Ok(())
}

fn run_doc() -> Result<()> {
    cargo("cargo doc", &["doc", "--workspace", "--no-deps"])
}

fn run_build(tier: TierArg, release: bool) -> Result<()> {
    for tier in tier.tiers() {
        let mut args = vec!["build", "-p", "meshview-desktop"];
        args.extend(tier.feature_args());
        if release {
            args.push("--release");
        }
        cargo(&format!("cargo build ({tier:?})"), &args)?;
    }
    Ok(())
}
