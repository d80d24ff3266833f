use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use otcoap::{
    browse_and_print, browse_banner, discover_and_invoke, init_tracing, server_router,
    SUBSCRIPTION_PROMPT,
};
use otcoap_client::{Button, Dispatcher, MulticastSubscription, SensorPublisher};
use otcoap_core::config::AppConfig;
use otcoap_discovery::{Advertiser, MdnsBrowser};
use otcoap_server::{CoapServer, LedResource, Router};
use std::net::{Ipv6Addr, SocketAddr};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// otcoap - CoAP tools for Thread networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "OTCOAP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve /sensor (and /led) until Ctrl-C
    Server {
        /// Override bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Do not expose /led
        #[arg(long)]
        no_led: bool,
    },

    /// Print every instance of a service type as it appears
    Browse {
        /// DNS-SD service type to browse
        #[arg(short = 't', long)]
        service_type: Option<String>,

        /// Run mDNS on this interface only
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Send one request to the first instance that answers
    Toggle {
        /// DNS-SD service type to browse
        #[arg(short = 't', long)]
        service_type: Option<String>,

        /// Resource path on the peer
        #[arg(long)]
        path: Option<String>,

        /// Request payload
        #[arg(long)]
        payload: Option<String>,

        /// Response timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Run mDNS on this interface only
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Send one request to a fixed peer or multicast group
    Button {
        /// Destination (defaults to [ff03::1]:5683)
        #[arg(long)]
        target: Option<SocketAddr>,

        /// Resource path on the peer
        #[arg(long)]
        path: Option<String>,

        /// Request payload
        #[arg(long)]
        payload: Option<String>,
    },

    /// Join an IPv6 multicast group until Enter is pressed
    Multicast {
        /// Group to join (e.g. ff02::1:2)
        group: Ipv6Addr,

        /// Interface index, 0 lets the kernel choose
        #[arg(short, long)]
        interface: Option<u32>,
    },

    /// Serve /led and advertise it over mDNS until Ctrl-C
    Led {
        /// Override bind address
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Advertise on this interface only
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Send one sensor measurement
    Publish {
        /// Destination (defaults to [ff03::1]:5683)
        #[arg(long)]
        target: Option<SocketAddr>,

        /// Sensor identifier
        #[arg(long)]
        id: Option<String>,

        /// Temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temp: f64,

        /// Pressure in hPa
        #[arg(long)]
        press: f64,

        /// Relative humidity in %
        #[arg(long)]
        hum: f64,
    },
}

impl Command {
    /// Folds command-line overrides into the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        match self {
            Command::Server { bind, no_led } => {
                if let Some(bind) = bind {
                    config.server.bind = *bind;
                }
                if *no_led {
                    config.server.enable_led = false;
                }
            }
            Command::Browse {
                service_type,
                interface,
            } => {
                if let Some(service_type) = service_type {
                    config.discovery.service_type = service_type.clone();
                }
                if interface.is_some() {
                    config.discovery.interface = interface.clone();
                }
            }
            Command::Toggle {
                service_type,
                path,
                payload,
                timeout_ms,
                interface,
            } => {
                if let Some(service_type) = service_type {
                    config.discovery.service_type = service_type.clone();
                }
                if let Some(path) = path {
                    config.client.path = path.clone();
                }
                if let Some(payload) = payload {
                    config.client.payload = payload.clone();
                }
                if let Some(timeout_ms) = timeout_ms {
                    config.client.timeout_ms = *timeout_ms;
                }
                if interface.is_some() {
                    config.discovery.interface = interface.clone();
                }
            }
            Command::Button {
                target,
                path,
                payload,
            } => {
                if let Some(target) = target {
                    config.button.target = *target;
                }
                if let Some(path) = path {
                    config.client.path = path.clone();
                }
                if let Some(payload) = payload {
                    config.client.payload = payload.clone();
                }
            }
            Command::Multicast { group, interface } => {
                config.multicast.group = *group;
                if let Some(interface) = interface {
                    config.multicast.interface = *interface;
                }
            }
            Command::Led { bind, interface } => {
                if let Some(bind) = bind {
                    config.server.bind = *bind;
                }
                if interface.is_some() {
                    config.discovery.interface = interface.clone();
                }
            }
            Command::Publish { target, id, .. } => {
                if let Some(target) = target {
                    config.publisher.target = *target;
                }
                if let Some(id) = id {
                    config.publisher.id = id.clone();
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    cli.command.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging)?;

    if let Some(path) = &cli.config {
        info!("Configuration loaded from {:?}", path);
    }

    match cli.command {
        Command::Server { .. } => serve(server_router(&config.server), &config, false).await,
        Command::Led { .. } => {
            let router = Router::new().resource("led", LedResource::new());
            serve(router, &config, true).await
        }
        Command::Browse { .. } => browse(&config).await,
        Command::Toggle { .. } => toggle(&config).await,
        Command::Button { .. } => press(&config).await,
        Command::Multicast { .. } => subscribe(&config).await,
        Command::Publish {
            temp, press, hum, ..
        } => publish(&config, temp, press, hum).await,
    }
}

/// Returns a token cancelled on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, stopping...");
                trigger.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    cancel
}

async fn serve(router: Router, config: &AppConfig, advertise: bool) -> Result<()> {
    let server = CoapServer::bind(config.server.bind)
        .await
        .context("Failed to start CoAP server")?;
    let port = server.local_addr().port();

    let advertiser = if advertise {
        Some(Advertiser::register(&config.discovery, port).context("Failed to advertise service")?)
    } else {
        None
    };

    let cancel = cancel_on_ctrl_c();
    let result = server.run(router, cancel).await;

    if let Some(advertiser) = advertiser {
        if let Err(e) = advertiser.shutdown() {
            error!("Failed to withdraw announcement: {}", e);
        }
    }

    result.context("CoAP server failed")
}

async fn browse(config: &AppConfig) -> Result<()> {
    let (browser, events) =
        MdnsBrowser::start(&config.discovery).context("Failed to start discovery")?;
    println!("{}", browse_banner(&config.discovery.service_type));

    browse_and_print(
        events,
        browser.resolver(),
        config.discovery.resolve_timeout(),
        cancel_on_ctrl_c(),
    )
    .await;

    browser.shutdown().context("Failed to stop discovery")
}

async fn toggle(config: &AppConfig) -> Result<()> {
    let (browser, events) =
        MdnsBrowser::start(&config.discovery).context("Failed to start discovery")?;
    println!("{}", browse_banner(&config.discovery.service_type));

    let report = discover_and_invoke(
        events,
        browser.resolver(),
        config.discovery.resolve_timeout(),
        Dispatcher::new(config.client.clone()),
        cancel_on_ctrl_c(),
    )
    .await;

    if report.is_none() {
        info!("Stopped before any peer answered");
    }

    browser.shutdown().context("Failed to stop discovery")
}

async fn subscribe(config: &AppConfig) -> Result<()> {
    let subscription = MulticastSubscription::join(&config.multicast)
        .with_context(|| format!("Failed to join multicast group {}", config.multicast.group))?;
    println!(
        "Successfully subscribed to multicast group {}",
        subscription.group()
    );
    print!("{SUBSCRIPTION_PROMPT}");
    std::io::stdout()
        .flush()
        .context("Failed to write to stdout")?;

    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = stdin.read_line(&mut line) => {
            result.context("Failed to read from stdin")?;
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping...");
        }
    }

    subscription.leave().context("Failed to leave multicast group")
}

async fn press(config: &AppConfig) -> Result<()> {
    let button = Button::new(config.button.clone(), config.client.clone())
        .context("Invalid button configuration")?;

    let report = button
        .press()
        .await
        .with_context(|| format!("Failed to press {}", button.target()))?;

    match report {
        Some(report) => {
            for line in report.lines() {
                println!("{line}");
            }
        }
        None => println!("Sent to {}", button.target()),
    }
    Ok(())
}

async fn publish(config: &AppConfig, temp: f64, press: f64, hum: f64) -> Result<()> {
    let publisher =
        SensorPublisher::new(config.publisher.clone()).context("Failed to open publisher")?;
    let measurement = publisher.measurement(temp, press, hum);

    publisher
        .publish(&measurement)
        .await
        .with_context(|| format!("Failed to publish to {}", publisher.target()))?;

    println!("{measurement}");
    println!("Published to {}", publisher.target());
    Ok(())
}
