use anyhow::{Context, Result};
use clap::Parser;
use meter_ingest::{
    shutdown_channel, DeviceReader, IngestionWriter, InfluxSink, MemorySink, PointSink, Poller,
    SampleAssembler, StartupError,
};
use meter_registry::{encode_f32, MetricsHub, RegisterMap};
use meter_transport::{MockBus, RegisterBus, RtuBus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod cli;
mod config;

use cli::Cli;
use config::DaemonConfig;

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    if cli.list_ports {
        for port in meter_transport::list_ports()? {
            println!("{}\t{}", port.name, port.driver);
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::load(path)?,
        None => DaemonConfig::default(),
    };
    cli.apply_to(&mut config);
    config.validate()?;

    let map = config.register_map()?;
    info!(registers = ?map.names(), "register map ready");

    let bus: Box<dyn RegisterBus> = if cli.mock {
        Box::new(simulated_meter(&map))
    } else {
        let rtu = RtuBus::open(&config.rtu_settings()).map_err(StartupError::from)?;
        Box::new(rtu)
    };
    // Outer bound a little above the serial timeout so the bus reports its own error first.
    let reader = DeviceReader::new(bus, config.read_timeout() + Duration::from_millis(250));

    let memory = Arc::new(MemorySink::new());
    let sink: Arc<dyn PointSink> = if cli.dry_run {
        memory.clone()
    } else {
        let influx = InfluxSink::new(&config.influx_settings()).map_err(StartupError::from)?;
        influx
            .ping()
            .await
            .map_err(StartupError::from)
            .with_context(|| format!("checking {}", config.influx.url))?;
        Arc::new(influx)
    };

    let mut writer = IngestionWriter::new(sink, &config.influx.measurement, config.write_retry());
    for (key, value) in &config.influx.tags {
        writer = writer.with_tag(key, value);
    }
    let assembler = SampleAssembler::new(map, config.read_retry());

    let mut poller_config = config.poller_config();
    if cli.once {
        poller_config.max_ticks = Some(1);
    }
    let metrics = MetricsHub::new().context("initialising metrics")?;
    let poller = Poller::new(poller_config, reader, assembler, writer)?.with_metrics(metrics.clone());

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested, finishing current tick");
                trigger.stop();
            }
            Err(e) => warn!("cannot listen for ctrl-c: {e}"),
        }
    });

    let reports = poller.run(shutdown).await;

    if cli.once {
        for report in &reports {
            println!("{}", serde_json::to_string_pretty(&report.write)?);
        }
    }
    if cli.dry_run {
        for point in memory.points() {
            println!("{}", point.to_line_protocol());
        }
    }
    info!(
        ticks = metrics.meter.ticks.get(),
        points_written = metrics.meter.points_written.get(),
        points_failed = metrics.meter.points_failed.get(),
        reads_failed = metrics.meter.reads_failed.get(),
        "meterd exiting"
    );
    Ok(())
}

/// A meter that answers every register of `map` with a plausible fixed value.
fn simulated_meter(map: &RegisterMap) -> MockBus {
    let mut bus = MockBus::new("simulated");
    for spec in map {
        let value = match spec.name.as_str() {
            "voltage" => 230.1,
            "current" => 4.2,
            "power" => 966.4,
            "apparent_power" => 980.0,
            "reactive_power" => 160.0,
            "power_factor" => 0.986,
            "phase_angle" => 9.4,
            "frequency" => 50.0,
            _ => 1.0,
        };
        bus.set_words(spec.access, spec.address, &encode_f32(value, spec.word_order));
    }
    bus
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
