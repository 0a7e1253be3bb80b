//! Run command - evaluate a script file.

use anyhow::{Context as _, Result};
use clap::Args;
use jsbridge::BridgeContext;
use std::path::PathBuf;
use std::rc::Rc;

use super::console::{self, Console};
use crate::config::Config;

#[derive(Args)]
pub struct RunCommand {
    /// File to evaluate
    pub entry: PathBuf,

    /// Do not print the completion value of the script
    #[arg(long, short)]
    pub quiet: bool,
}

impl RunCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let source = std::fs::read_to_string(&self.entry)
            .with_context(|| format!("Failed to read {}", self.entry.display()))?;

        let result = evaluate_with_console(&source, &self.source_name(), config, Rc::new(Console::new()))?;
        if !self.quiet && result != "undefined" {
            println!("{}", result);
        }
        Ok(())
    }

    fn source_name(&self) -> String {
        self.entry.display().to_string()
    }
}

/// Create a context, bind `console`, and evaluate `source`
pub fn evaluate_with_console(
    source: &str,
    source_name: &str,
    config: &Config,
    console: Rc<Console>,
) -> Result<String> {
    let ctx = BridgeContext::with_config(config.runtime.clone())?;
    ctx.bind("console", console, console::METHODS)?;
    Ok(ctx.evaluate(source, source_name)?)
}
