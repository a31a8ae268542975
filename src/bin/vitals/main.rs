use std::io::Write;

use anyhow::{Context, Result};

use vitals::gpu::Resolver;
use vitals::info::SystemInfo;

mod view;

fn main() -> Result<()> {
    vitals::init_logging("warn");

    // On linux, nvidia-smi knows more about the card than lspci does.
    let resolver = Resolver::new().prefer_nvidia(true);
    let info = SystemInfo::collect(&resolver).context("could not collect system information")?;

    let mut stdout = std::io::stdout().lock();
    view::write_report(&mut stdout, &info).context("could not write the report")?;
    stdout.flush()?;
    Ok(())
}
