use anyhow::Result;
use log::debug;
use tfwrap::common::logging;
use tfwrap::runner::{self, Settings};

fn main() -> Result<()> {
    let settings = Settings::from_env();
    logging::init(settings.debug)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    debug!("Settings: {:?}", settings);
    debug!("Command line arguments: {:?}", args);

    let exit_code = runner::wrap(&args, &settings)?;

    std::process::exit(exit_code);
}
