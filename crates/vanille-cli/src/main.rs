//! Vanille command-line client.
//!
//! Sends admin actions to a site the same way its settings pages do, and
//! reads or edits the namespaced local cache.
//!
//!   vanille --config site.toml dispatch --action purge --method delete
//!   vanille --config site.toml cache put nav-tab '"#general"' --ttl 10

mod args;

use anyhow::{Context, bail};
use args::{CacheCmd, Cli, Command, DispatchCmd, MethodArg, StoreArg};
use clap::Parser;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vanille_cache::{FileStore, TtlCache};
use vanille_client::{
    DispatchArgs, Dispatcher, LogNavigator, MemoryDom, Session, Surfaces, ToastCenter,
};
use vanille_core::{
    Config, ElementSnapshot, FileBlob, Method, Outcome, Payload, TransportKind, TypedValue,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vanille=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!(namespace = %config.namespace, restful = config.restful, "loaded configuration");

    match cli.command {
        Command::Dispatch(cmd) => dispatch(Arc::new(config), cmd).await,
        Command::Cache(cmd) => cache(&config, cmd),
    }
}

async fn dispatch(config: Arc<Config>, cmd: DispatchCmd) -> anyhow::Result<()> {
    let surfaces = Surfaces {
        dom: Arc::new(MemoryDom::new()),
        notifier: Arc::new(ToastCenter::new()),
        navigator: Arc::new(LogNavigator),
    };
    let dispatcher = Dispatcher::new(config, Arc::new(Session::new()), surfaces)?;

    let mut args = DispatchArgs::new()
        .data(parse_data(&cmd.data)?)
        .files(read_files(&cmd.files).await?)
        .method(match cmd.method {
            MethodArg::Post => Method::Post,
            MethodArg::Delete => Method::Delete,
        });
    args.action = cmd.action;
    args.endpoint = cmd.endpoint;
    args.token = cmd.token;
    args.timeout = cmd.timeout.map(Duration::from_secs);
    if cmd.rest {
        args = args.transport(TransportKind::Rest);
    } else if cmd.legacy {
        args = args.transport(TransportKind::Legacy);
    }
    for header in &cmd.headers {
        let (name, value) = header
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got {header:?}"))?;
        args = args.header(name, value);
    }

    let element = ElementSnapshot::control("cli");
    let outcome = dispatcher.dispatch(&element, args).await?;
    if let Some(envelope) = outcome.envelope() {
        println!("{}", serde_json::to_string_pretty(envelope)?);
    }
    match outcome {
        Outcome::Success(_) => Ok(()),
        failed => bail!("request failed: {}", failed.error_detail().unwrap_or_default()),
    }
}

/// Build a payload from `key=value` pairs. Values use the tagged wire form
/// (`int|5`, `bool|1`); anything else is a string.
fn parse_data(entries: &[String]) -> anyhow::Result<Payload> {
    let mut payload = Payload::new();
    let mut groups: BTreeMap<String, Payload> = BTreeMap::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {entry:?}"))?;
        let value: TypedValue = raw.parse().with_context(|| format!("invalid value for {key}"))?;
        match key.split_once('.') {
            Some((group, name)) => groups.entry(group.to_string()).or_default().insert(name, value),
            None => payload.insert(key, value),
        }
    }
    for (group, fields) in groups {
        payload.insert(group, fields);
    }
    Ok(payload)
}

async fn read_files(paths: &[std::path::PathBuf]) -> anyhow::Result<Vec<FileBlob>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(FileBlob::new(name, bytes));
    }
    Ok(files)
}

fn open_cache(config: &Config, store: &StoreArg) -> anyhow::Result<TtlCache> {
    let file = FileStore::open(&store.path)
        .with_context(|| format!("opening {}", store.path.display()))?;
    Ok(TtlCache::new(config.namespace.clone(), Arc::new(file)))
}

fn cache(config: &Config, cmd: CacheCmd) -> anyhow::Result<()> {
    match cmd {
        CacheCmd::Get { key, store } => match open_cache(config, &store)?.get_value(&key)? {
            Some(value) => println!("{value}"),
            None => bail!("{key} is not cached"),
        },
        CacheCmd::Put { key, value, ttl, store } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            open_cache(config, &store)?.put(&key, &value, ttl.map(Duration::from_secs))?;
            tracing::info!(%key, ttl, "cached");
        }
        CacheCmd::Remove { key, store } => {
            open_cache(config, &store)?.remove(&key)?;
            tracing::info!(%key, "removed");
        }
        CacheCmd::Purge { all, store } => {
            let cache = open_cache(config, &store)?;
            if all {
                cache.purge_all()?;
                tracing::info!("cleared store");
            } else {
                let removed = cache.purge_namespace()?;
                tracing::info!(removed, namespace = %config.namespace, "purged namespace");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_pairs_nest_on_dots() {
        let payload = parse_data(&[
            "slug=theme".to_string(),
            "settings.limit=int|5".to_string(),
            "settings.debug=bool|1".to_string(),
        ])
        .unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"slug": "theme", "settings": {"limit": "int|5", "debug": "bool|1"}})
        );
    }

    #[test]
    fn data_pairs_are_validated() {
        assert!(parse_data(&["novalue".to_string()]).is_err());
        assert!(parse_data(&["n=int|abc".to_string()]).is_err());
    }

    #[test]
    fn parses_dispatch_flags() {
        let cli = Cli::try_parse_from([
            "vanille", "--config", "site.toml", "dispatch", "--action", "purge", "--rest",
            "--method", "delete", "-d", "a=1", "-d", "b=2",
        ])
        .unwrap();
        let Command::Dispatch(cmd) = cli.command else {
            panic!("expected dispatch");
        };
        assert_eq!(cmd.action.as_deref(), Some("purge"));
        assert!(cmd.rest);
        assert_eq!(cmd.method, MethodArg::Delete);
        assert_eq!(cmd.data, ["a=1", "b=2"]);
    }

    #[test]
    fn rest_and_legacy_conflict() {
        assert!(Cli::try_parse_from(["vanille", "dispatch", "--rest", "--legacy"]).is_err());
    }
}
