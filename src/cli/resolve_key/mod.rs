//! Resolve-key command - shows the key and group a template produces

use anyhow::{anyhow, Context};
use axum::http::Method;
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{KeyResolver, KeyTemplate, RequestContext};
use crate::infrastructure::logging::{init_logging, LoggingConfig};

#[derive(Debug, Args)]
pub struct ResolveKeyArgs {
    /// Key template, e.g. `teams:$params.id`
    #[arg(long)]
    pub template: String,

    /// HTTP method of the request
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Path parameter as `name=value`; repeatable
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// Raw query string, e.g. `page=2&sort=name`
    #[arg(long, default_value = "")]
    pub query: String,

    /// Positional argument as JSON; repeatable, in order
    #[arg(long = "arg", value_name = "JSON")]
    pub args: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ResolvedOutput {
    pub key: Option<String>,
    pub group: Option<String>,
    pub cacheable: bool,
}

pub fn run(args: ResolveKeyArgs) -> anyhow::Result<()> {
    init_logging(&LoggingConfig {
        level: "warn".to_string(),
        ..LoggingConfig::default()
    });

    let output = resolve(&args)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

pub fn resolve(args: &ResolveKeyArgs) -> anyhow::Result<ResolvedOutput> {
    let template = KeyTemplate::parse(args.template.as_str())?;
    let ctx = build_context(args)?;

    let output = match KeyResolver::new().resolve(&template, &ctx) {
        Some(resolved) => ResolvedOutput {
            key: Some(resolved.key),
            group: Some(resolved.group),
            cacheable: ctx.is_read(),
        },
        None => ResolvedOutput {
            key: None,
            group: None,
            cacheable: false,
        },
    };

    Ok(output)
}

fn build_context(args: &ResolveKeyArgs) -> anyhow::Result<RequestContext> {
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut ctx = RequestContext::new(method).with_query(args.query.as_str());

    for param in &args.params {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid param '{}'. Expected NAME=VALUE", param))?;
        ctx = ctx.with_param(name, value);
    }

    for arg in &args.args {
        let value: Value = serde_json::from_str(arg)
            .with_context(|| format!("Argument '{}' is not valid JSON", arg))?;
        ctx = ctx.with_arg(value);
    }

    Ok(ctx)
}
