//! Build script rendering the `sms-gateway(1)` manual page from the CLI
//! definition.

use std::{fs, io, path::Path};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

const MAN_DIR: &str = "target/generated-man";

fn render_man_page(cmd: clap::Command) -> io::Result<Vec<u8>> {
    let mut page = Vec::new();
    Man::new(cmd).section("1").render(&mut page)?;
    Ok(page)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let cmd = cli::Cli::command();
    let file_name = format!("{}.1", cmd.get_name());
    let page = render_man_page(cmd)?;

    let out_dir = Path::new(MAN_DIR);
    fs::create_dir_all(out_dir)?;
    fs::write(out_dir.join(file_name), page)?;

    Ok(())
}
