use clap::Parser;

use embersh::core::config::{Config, ConfigPaths};
use embersh::error::ShellError;
use embersh::flags::Flags;
use embersh::logging::init_logging;
use embersh::shell::Shell;

fn main() -> Result<(), ShellError> {
    let flags = Flags::parse();
    init_logging(flags.debug);

    let mut paths = ConfigPaths::new()?;
    if let Some(rc_path) = &flags.config {
        paths = paths.with_rc_path(rc_path.clone());
    }
    let config = flags.apply(Config::load_from(&paths, flags.config.is_some())?);

    let mut shell = Shell::new(&config, &paths)?;
    shell.run()
}
