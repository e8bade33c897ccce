#![forbid(unsafe_code)]

mod cli;

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use hostwatch::register::{InMemoryModel, RegistrationSummary};
use hostwatch::session::{LoadOptions, LoadSession, ObjectCounts};

#[derive(Serialize)]
struct LoadReport {
    objects: ObjectCounts,
    registered: RegistrationSummary,
    duration_ms: u64,
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<()> {
    let config = cli::parse_args()?;
    let start = Instant::now();

    let mut session = LoadSession::new(LoadOptions {
        kinds: config.kinds,
        use_regexp_matching: config.use_regex,
        precached: config.precached,
        index_seed: None,
    });

    session
        .load(&config.config_path)
        .context("configuration load failed")?;

    // Verify mode still registers, against the in-memory model, so builder
    // failures surface the same way they would in the daemon.
    let mut model = InMemoryModel::new();
    let registered = session
        .register(&mut model)
        .context("object registration failed")?;

    if let Some(cache_path) = &config.cache_path {
        let file = File::create(cache_path)
            .with_context(|| format!("cannot create cache file '{}'", cache_path.display()))?;
        let mut out = BufWriter::new(file);
        session
            .write_cache(&mut out)
            .with_context(|| format!("cannot write cache file '{}'", cache_path.display()))?;
    }

    let report = LoadReport {
        objects: session.object_counts(),
        registered,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !config.quiet {
        print_human(&report, config.verify_only);
    }

    Ok(())
}

fn print_human(report: &LoadReport, verify_only: bool) {
    if verify_only {
        println!("Configuration OK");
    }
    println!("Registered objects:");
    let r = &report.registered;
    println!("  Timeperiods:           {}", r.timeperiods);
    println!("  Commands:              {}", r.commands);
    println!("  Contacts:              {}", r.contacts);
    println!("  Contact groups:        {}", r.contactgroups);
    println!("  Hosts:                 {}", r.hosts);
    println!("  Host groups:           {}", r.hostgroups);
    println!("  Services:              {}", r.services);
    println!("  Service groups:        {}", r.servicegroups);
    println!("  Service dependencies:  {}", r.servicedependencies);
    println!("  Service escalations:   {}", r.serviceescalations);
    println!("  Host dependencies:     {}", r.hostdependencies);
    println!("  Host escalations:      {}", r.hostescalations);
    println!("  Host ext info:         {}", r.hostextinfo);
    println!("  Service ext info:      {}", r.serviceextinfo);

    // Duration formatted like the rest of the tooling
    let duration_sec = report.duration_ms as f64 / 1000.0;
    if duration_sec < 1.0 {
        println!("Load time: {}ms", report.duration_ms);
    } else {
        println!("Load time: {:.2}s", duration_sec);
    }
}
