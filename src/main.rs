use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use zigbee_core::commissioning::Role;
use zigbee_core::config::{Config, load_dotenv};
use zigbee_core::error::Result;
use zigbee_core::simulation::{LoopbackStack, RemoteDevice, run_stack_task};
use zigbee_core::zigbee::endpoints::{ColorDimmableLight, OnOffSwitch, Thermostat, ZigbeeEndpoint};
use zigbee_core::zigbee::scan::NetworkDescriptor;
use zigbee_core::zigbee::stack::IeeeAddr;
use zigbee_core::zigbee::{EndpointRegistry, ZigbeeCore};

const LOCAL_IEEE: IeeeAddr = [0x01, 0x00, 0x4B, 0x12, 0x00, 0xAE, 0x21, 0x00];
const LIGHT_ENDPOINT: u8 = 10;
const SWITCH_ENDPOINT: u8 = 1;
const THERMOSTAT_ENDPOINT: u8 = 3;

#[derive(Parser)]
#[command(name = "zigbee-core")]
#[command(about = "Run the Zigbee core against a loopback network")]
struct Args {
    /// JSON configuration file; environment variables are used when absent
    #[arg(long, env = "ZIGBEE_CONFIG")]
    config: Option<PathBuf>,

    /// Device role (coordinator, router, end_device)
    #[arg(long, env = "ZIGBEE_ROLE")]
    role: Option<Role>,

    /// Seconds to reopen the network for after a reboot
    #[arg(long, env = "ZIGBEE_REOPEN_SECS")]
    reopen: Option<u8>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::from_env(),
    };
    if let Some(role) = args.role {
        config.zigbee.role = role;
    }
    if let Some(reopen) = args.reopen {
        config.zigbee.reopen_secs = reopen;
    }
    config.validate()?;
    Ok(config)
}

fn build_endpoints(
    config: &Config,
) -> Result<(EndpointRegistry, Arc<ColorDimmableLight>, Arc<OnOffSwitch>, Arc<Thermostat>)> {
    let light = Arc::new(ColorDimmableLight::new(LIGHT_ENDPOINT));
    let switch = Arc::new(OnOffSwitch::new(SWITCH_ENDPOINT));
    let thermostat = Arc::new(Thermostat::new(THERMOSTAT_ENDPOINT));

    light.on_light_change(|state| {
        info!(
            "[Demo] Light {} level {} rgb {:?}",
            if state.on { "on" } else { "off" },
            state.level,
            state.rgb
        );
    });
    thermostat.on_temperature_receive(|celsius| info!("[Demo] Thermostat sees {:.2} C", celsius));

    let mut registry = EndpointRegistry::new();
    for endpoint in [
        light.clone() as Arc<dyn ZigbeeEndpoint>,
        switch.clone() as Arc<dyn ZigbeeEndpoint>,
        thermostat.clone() as Arc<dyn ZigbeeEndpoint>,
    ] {
        endpoint
            .core()
            .set_manufacturer_and_model(&config.device.manufacturer, &config.device.model)?;
        registry.register(endpoint)?;
    }
    Ok((registry, light, switch, thermostat))
}

/// Drive a few peers through the network once commissioning has finished.
async fn run_demo(
    stack: &LoopbackStack,
    core: &ZigbeeCore,
    switch: &OnOffSwitch,
    thermostat: &Thermostat,
) {
    stack.join_device(RemoteDevice::color_light(0x1234, [0x11; 8], 11));
    stack.join_device(RemoteDevice::temperature_sensor(0x5678, [0x22; 8], 1, 21.5));
    tokio::time::sleep(Duration::from_millis(200)).await;

    for peer in switch.core().bound_peers() {
        info!(
            "[Demo] Switch bound to 0x{:04x}/{}",
            peer.short_addr, peer.endpoint
        );
    }
    if let Err(e) = switch.light_toggle() {
        warn!("[Demo] Toggle failed: {}", e);
    }
    if let Err(e) = thermostat.get_temperature() {
        warn!("[Demo] Temperature read failed: {}", e);
    }

    if let Err(e) = core.start_scan() {
        warn!("[Demo] Scan failed to start: {}", e);
        return;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    match core.scan_result().map(|r| serde_json::to_string_pretty(&r)) {
        Some(Ok(json)) => info!("[Demo] Scan result:\n{}", json),
        Some(Err(e)) => warn!("[Demo] Could not encode scan result: {}", e),
        None => info!("[Demo] Scan status {:?}", core.scan_status()),
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_logger();
    info!("Starting Zigbee core");

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded:");
    info!("  Role: {}", config.zigbee.role);
    info!("  Reopen window: {} s", config.zigbee.reopen_secs);
    info!("  Channel mask: 0x{:08X}", config.zigbee.channel_mask);
    info!(
        "  Manufacturer/model: {} / {}",
        config.device.manufacturer, config.device.model
    );

    let (registry, _light, switch, thermostat) = match build_endpoints(&config) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Failed to build endpoints: {}", e);
            std::process::exit(1);
        }
    };

    let (stack, events) = LoopbackStack::new(config.zigbee.role, LOCAL_IEEE);
    // somewhere for routers and end devices to join
    stack.add_neighbour(NetworkDescriptor {
        short_pan_id: 0x1A62,
        extended_pan_id: [0xDD; 8],
        channel: 15,
        permit_joining: true,
        router_capacity: true,
        end_device_capacity: true,
        stack_profile: 2,
        nwk_update_id: 0,
    });

    let core = match ZigbeeCore::new(config, stack.clone(), registry) {
        Ok(core) => Arc::new(core),
        Err(e) => {
            error!("Failed to start Zigbee core: {}", e);
            std::process::exit(1);
        }
    };
    let stack_task = run_stack_task(stack.clone(), core.clone(), events);

    stack.boot();

    match core.wait_started(Duration::from_secs(30)).await {
        Ok(()) => {
            info!("Zigbee core is running ({})", core.state());
            run_demo(&stack, &core, &switch, &thermostat).await;
        }
        Err(e) => error!("Network did not start: {}", e),
    }

    info!("  - Press Ctrl+C to exit");
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    stack_task.abort();
    info!("Zigbee core stopped");
}
