//! Call command - evaluate a script, then call one of its methods.

use anyhow::{Context as _, Result};
use clap::Args;
use jsbridge::{BridgeContext, HostType, HostValue, MethodSignature};
use std::path::PathBuf;
use std::rc::Rc;

use super::console::{self, Console};
use crate::config::Config;

#[derive(Args)]
pub struct CallCommand {
    /// File defining the target global
    pub entry: PathBuf,

    /// Global object to call into
    pub global: String,

    /// Method to call on the global
    pub method: String,

    /// Arguments, each a JSON value
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CallCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let source = std::fs::read_to_string(&self.entry)
            .with_context(|| format!("Failed to read {}", self.entry.display()))?;
        let args = parse_args(&self.args)?;

        let result = call_global(
            &source,
            &self.entry.display().to_string(),
            &self.global,
            &self.method,
            args,
            config,
        )?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}

fn parse_args(raw: &[String]) -> Result<Vec<serde_json::Value>> {
    raw.iter()
        .map(|arg| {
            serde_json::from_str(arg).with_context(|| format!("Argument is not valid JSON: {}", arg))
        })
        .collect()
}

/// Evaluate `source`, proxy `global`, and call `method` with JSON arguments
pub fn call_global(
    source: &str,
    source_name: &str,
    global: &str,
    method: &str,
    args: Vec<serde_json::Value>,
    config: &Config,
) -> Result<serde_json::Value> {
    let ctx = BridgeContext::with_config(config.runtime.clone())?;
    ctx.bind("console", Rc::new(Console::new()), console::METHODS)?;
    ctx.evaluate(source, source_name)?;

    let handle = ctx.proxy(global, &[method])?;
    let signature = args
        .iter()
        .fold(MethodSignature::new(method), |sig, _| sig.param(HostType::Json))
        .returns(HostType::Json);
    let args: Vec<HostValue> = args.into_iter().map(HostValue::from).collect();

    match ctx.call(handle, &signature, &args)? {
        HostValue::Json(json) => Ok(json),
        _ => Ok(serde_json::Value::Null),
    }
}
