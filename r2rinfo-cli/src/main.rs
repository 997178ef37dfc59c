use anyhow::Result;
use clap::{Parser, Subcommand};
use r2rinfo_core::NativeImage;

/// Simple ReadyToRun introspection CLI
#[derive(Parser)]
#[command(
    name = "r2rinfo",
    about = "Inspect ReadyToRun headers of precompiled .NET images",
    version,
    author
)]
struct Cli {
    /// Path to a ReadyToRun PE image
    #[arg(required = true)]
    path: std::path::PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the decoded ReadyToRun header
    Header,
    /// List the section directory entries
    Sections,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let image = NativeImage::open(&cli.path)?;
    log::info!(
        "decoded {} byte header with {} sections from {}",
        image.header.size,
        image.header.sections.len(),
        image.path
    );

    match cli.command {
        Command::Header => {
            print!("{}", image.header);
        }

        Command::Sections => {
            if image.header.sections.is_empty() {
                println!("No entries in the ReadyToRun section directory.");
            } else {
                println!(
                    "{:<28} {:<8} {:<14} {:<10}",
                    "Section", "Code", "RVA", "Size"
                );
                println!("{}", "-".repeat(64));
                let mut sections: Vec<_> = image.header.sections.values().collect();
                sections.sort_by_key(|s| s.kind.code());
                for s in sections {
                    println!(
                        "{:<28} {:<8} 0x{:<12x} 0x{:<8x}",
                        s.kind.to_string(),
                        s.kind.code(),
                        s.rva,
                        s.size
                    );
                }
            }
        }
    }

    Ok(())
}
