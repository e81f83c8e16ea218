use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::CliError;
use crate::locator::Locator;
use crate::window::PANE_COUNT;

pub const USAGE: &str = "\
multiview: play up to three videos side by side

USAGE:
    multiview [OPTIONS] [LOCATOR]...

ARGS:
    <LOCATOR>...    File paths or URLs for panes 1 to 3

OPTIONS:
    -c, --config <FILE>        Config file (default: <config dir>/multiview/config.toml)
        --runtime-dir <DIR>    Directory holding the native media runtime
    -h, --help                 Print this help
";

#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    pub help: bool,
    pub config: Option<PathBuf>,
    pub runtime_dir: Option<PathBuf>,
    pub locators: Vec<Locator>,
}

pub fn parse(args: Vec<OsString>) -> Result<CliArgs, CliError> {
    let mut args = pico_args::Arguments::from_vec(args);

    let help = args.contains(["-h", "--help"]);
    let config = args.opt_value_from_str(["-c", "--config"])?;
    let runtime_dir = args.opt_value_from_str("--runtime-dir")?;

    let rest = args.finish();
    let unknown: Vec<String> = rest
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .filter(|a| a.starts_with('-') && a.len() > 1)
        .collect();
    if !unknown.is_empty() {
        return Err(pico_args::Error::UnusedArgsLeft(unknown).into());
    }

    let mut locators = Vec::new();
    for arg in &rest {
        if let Some(locator) = Locator::parse(&arg.to_string_lossy())? {
            locators.push(locator);
        }
    }
    if locators.len() > PANE_COUNT {
        return Err(CliError::TooManyLocators(locators.len()));
    }

    Ok(CliArgs {
        help,
        config,
        runtime_dir,
        locators,
    })
}
