//! # Store Probe
//!
//! Purpose: Check a live endpoint end to end: write a scalar and a record,
//! read both back, then delete them.
//!
//! Usage: `kvs-probe [ADDR] [DOMAIN]`. Missing arguments fall back to the
//! `KVS_*` environment variables. Log verbosity follows `RUST_LOG`.

use std::collections::BTreeMap;
use std::env;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kvs_client::{KeyValueClient, StoreConfig};

const PROBE_KEY: &str = "kvs-probe:counter";
const PROBE_RECORD_KEY: &str = "kvs-probe:record";

fn main() -> Result<()> {
    init_logging();

    let mut config = StoreConfig::from_env().context("reading KVS_* environment")?;
    let mut args = env::args().skip(1);
    if let Some(addr) = args.next() {
        config.addr = addr;
    }
    if let Some(domain) = args.next() {
        config.domain = domain;
    }

    info!(addr = %config.addr, domain = %config.domain, "probing store");
    let client = KeyValueClient::connect(config).context("connecting to store")?;

    client.put(PROBE_KEY, 42)?;
    let counter = client.get_int(PROBE_KEY)?;
    if counter != 42 {
        bail!("scalar round-trip returned {counter}, expected 42");
    }

    let mut record = BTreeMap::new();
    record.insert("probe".to_string(), "ok".to_string());
    client.put_object(PROBE_RECORD_KEY, &record)?;
    let stored: BTreeMap<String, String> = client.get_object(PROBE_RECORD_KEY)?;
    if stored != record {
        bail!("record round-trip returned {stored:?}");
    }

    client.del(PROBE_KEY)?;
    client.del(PROBE_RECORD_KEY)?;
    if client.exists(PROBE_KEY)? {
        bail!("{PROBE_KEY} still present after DEL");
    }

    let stats = client.pool_stats();
    info!(idle = stats.idle, active = stats.active, "probe succeeded");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
