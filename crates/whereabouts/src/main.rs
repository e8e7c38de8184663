//! `whereabouts` - CLI for the whereabouts library
//!
//! This binary wires the configured geolocation host, local storage and
//! introspection host together and exposes them as subcommands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};

use whereabouts::cli::{Cli, Command, ConfigCommand, HistoryCommand, OutputFormat};
use whereabouts::{
    init_logging, Config, DeviceProfiler, GeolocationHost, IntrospectionHost, LocationCapture,
    LocationRecord, LocationStore, NativeHost, SimulatedGeolocation, SqliteKeyValue,
    StoredLocationEntry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config;
    match cli.command {
        Command::Capture(cmd) => App::load(config_path)?.capture(cmd.json).await,
        Command::Watch(cmd) => App::load(config_path)?.watch(cmd.count).await,
        Command::History(cmd) => App::load(config_path)?.history(&cmd),
        Command::Clear(cmd) => App::load(config_path)?.clear(cmd.yes),
        Command::Export(cmd) => App::load(config_path)?.export(cmd.output),
        Command::Profile(cmd) => App::load(config_path)?.profile(cmd.json).await,
        Command::Status(cmd) => App::load(config_path)?.status(cmd.json),
        // Config commands report load errors themselves
        Command::Config(cmd) => handle_config(config_path, cmd),
    }
}

/// Everything a command needs, built once from the configuration.
#[derive(Debug)]
struct App {
    config: Config,
    capture: LocationCapture,
    profiler: DeviceProfiler,
    native: Arc<NativeHost>,
}

impl App {
    fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = Config::load_from(config_path).context("Failed to load configuration")?;

        #[cfg(target_os = "linux")]
        whereabouts_linux::init().map_err(|e| anyhow::anyhow!("{e}"))?;

        let db_path = config.database_path();
        let backend = SqliteKeyValue::open(&db_path)
            .with_context(|| format!("Failed to open storage at {}", db_path.display()))?;
        let store = LocationStore::new(Arc::new(backend));

        let native = Arc::new(NativeHost::new());
        let geolocation = SimulatedGeolocation::from_config(&config)
            .map(|host| Arc::new(host) as Arc<dyn GeolocationHost>);
        debug!(
            geolocation = geolocation.as_ref().map_or("none", |h| h.name()),
            introspection = native.name(),
            "Hosts ready"
        );

        let capture = LocationCapture::new(geolocation, store, native.environment())
            .with_options(config.position_options());
        let profiler = DeviceProfiler::new(native.clone())
            .with_permissions(config.profile.permissions.clone());

        Ok(Self {
            config,
            capture,
            profiler,
            native,
        })
    }

    async fn capture(&self, json: bool) -> anyhow::Result<()> {
        let record = self
            .capture
            .capture_location()
            .await
            .context("Location capture failed")?;

        if json {
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            print_record(&record);
        }
        Ok(())
    }

    async fn watch(&self, count: Option<usize>) -> anyhow::Result<()> {
        let Some(mut subscription) = self.capture.start_watching() else {
            bail!("Geolocation watch is not available on this host");
        };
        info!(watch = %subscription.id(), "Watching position, press Ctrl-C to stop");

        let mut received = 0usize;
        loop {
            if count.is_some_and(|n| received >= n) {
                break;
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    break;
                }
                update = subscription.next() => {
                    let Some(update) = update else { break };
                    received += 1;
                    match update {
                        Ok(record) => print_record(&record),
                        Err(e) => eprintln!("[{}] {e}", e.kind()),
                    }
                }
            }
        }

        self.capture.stop_watching(Some(subscription));
        println!("Received {received} update(s)");
        Ok(())
    }

    fn history(&self, cmd: &HistoryCommand) -> anyhow::Result<()> {
        let entries = self.capture.store().get_all();
        let skip = cmd
            .limit
            .map_or(0, |limit| entries.len().saturating_sub(limit));
        let shown = &entries[skip..];

        match cmd.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(shown)?),
            OutputFormat::Plain => {
                for entry in shown {
                    println!(
                        "{} {} {:.6},{:.6} ±{}m",
                        entry.record.timestamp,
                        entry.capture_id,
                        entry.record.latitude,
                        entry.record.longitude,
                        entry.record.accuracy
                    );
                }
            }
            OutputFormat::Table => print_history_table(shown),
        }
        Ok(())
    }

    fn clear(&self, yes: bool) -> anyhow::Result<()> {
        if !yes {
            let count = self.capture.store().get_all().len();
            println!("This will delete {count} stored location(s) and the session id.");
            println!("Use --yes to confirm.");
            return Ok(());
        }
        self.capture.store().clear()?;
        println!("Stored locations cleared.");
        Ok(())
    }

    async fn profile(&self, json: bool) -> anyhow::Result<()> {
        let profile = self.profiler.collect().await;

        if json {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            return Ok(());
        }

        println!("Device Profile ({})", self.profiler.host().name());
        println!("==============");
        for (name, value) in profile.fields() {
            let shown = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {name:<24} {shown}");
        }
        println!();
        println!(
            "Revealed {} of {} fields, digest {}",
            profile.revealed_count(),
            profile.len(),
            profile.digest()
        );
        Ok(())
    }

    fn export(&self, output: Option<PathBuf>) -> anyhow::Result<()> {
        let dir = output.unwrap_or_else(|| self.config.export_dir());
        let path = self.capture.store().export_to(&dir)?;
        println!("Exported to {}", path.display());
        Ok(())
    }

    fn status(&self, json: bool) -> anyhow::Result<()> {
        let config = &self.config;
        let stats = self.capture.store().stats();
        let platform = self
            .native
            .platform()
            .unwrap_or_else(|u| u.sentinel().to_string());

        if json {
            let status = serde_json::json!({
                "platform": platform,
                "geolocation_supported": self.capture.is_supported(),
                "database_path": config.database_path(),
                "entry_count": stats.entry_count,
                "session_id": stats.session_id,
                "oldest_capture": stats.oldest_capture,
                "newest_capture": stats.newest_capture,
                "database_size_bytes": stats.backend_size_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            let or_none = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
            println!("whereabouts status");
            println!("------------------");
            println!("Platform:      {platform}");
            println!(
                "Geolocation:   {}",
                if self.capture.is_supported() {
                    "available"
                } else {
                    "not supported"
                }
            );
            println!("Database:      {}", config.database_path().display());
            println!("Size:          {} bytes", stats.backend_size_bytes);
            println!("Entries:       {}", stats.entry_count);
            println!("Session:       {}", or_none(stats.session_id));
            println!(
                "Oldest:        {}",
                or_none(stats.oldest_capture.map(|t| t.to_rfc3339()))
            );
            println!(
                "Newest:        {}",
                or_none(stats.newest_capture.map(|t| t.to_rfc3339()))
            );
        }
        Ok(())
    }
}

fn print_record(record: &LocationRecord) {
    println!(
        "{}  lat {:.6}  lon {:.6}  ±{}m{}",
        record.timestamp,
        record.latitude,
        record.longitude,
        record.accuracy,
        record
            .altitude
            .map(|a| format!("  alt {a}m"))
            .unwrap_or_default()
    );
}

fn print_history_table(entries: &[StoredLocationEntry]) {
    println!(
        "{:<26} {:>11} {:>12} {:>9}  CAPTURE ID",
        "TIMESTAMP", "LATITUDE", "LONGITUDE", "ACCURACY"
    );
    for entry in entries {
        println!(
            "{:<26} {:>11.6} {:>12.6} {:>9.1}  {}",
            entry.record.timestamp,
            entry.record.latitude,
            entry.record.longitude,
            entry.record.accuracy,
            entry.capture_id
        );
    }
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("Failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Export dir:         {}", config.export_dir().display());
                println!();
                println!("[Geolocation]");
                println!("  High accuracy:      {}", config.geolocation.high_accuracy);
                println!("  Timeout (ms):       {}", config.geolocation.timeout_ms);
                println!(
                    "  Max cached age (ms): {}",
                    config.geolocation.max_cached_age_ms
                );
                println!(
                    "  Watch interval (ms): {}",
                    config.geolocation.watch_interval_ms
                );
                println!();
                println!("[Simulator]");
                println!("  Enabled:            {}", config.simulator.enabled);
                println!(
                    "  Position:           {}, {} (±{}m)",
                    config.simulator.latitude,
                    config.simulator.longitude,
                    config.simulator.accuracy
                );
                if let Some(code) = config.simulator.error_code {
                    println!("  Forced error code:  {code}");
                }
                println!();
                println!("[Profile]");
                println!(
                    "  Permissions:        {}",
                    config.profile.permissions.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                config_path
                    .unwrap_or_else(Config::default_config_path)
                    .display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
