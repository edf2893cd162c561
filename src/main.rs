use std::path::PathBuf;

use clap::Parser as ClapParser;

/// `path` is optional even though the language always requires one: clap
/// would otherwise print its own usage error and exit before
/// "txt file required as argument" ever gets a chance to print.
#[derive(ClapParser)]
#[command(name = "the-language", about = "Tree-walking interpreter for the Language")]
struct Cli {
    path: Option<PathBuf>,
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let Some(path) = cli.path else {
        println!("txt file required as argument");
        std::process::exit(0);
    };

    if !path.exists() {
        println!("{} not found", path.display());
        std::process::exit(0);
    }

    langi::driver::run_file(&path)?;
    std::process::exit(0);
}
