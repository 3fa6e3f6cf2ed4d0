use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use pnet_base::MacAddr;
use tracing::info;

use wps_bin::config::{self, ConfigArgs};
use wps_core::device::{generate_pin, uuid_from_mac, DeviceInfo};

#[derive(Parser, Debug)]
#[clap(name = "wpsctl", author, version, about = "WPS enrollee utilities", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random PIN with a valid check digit.
    Pin,
    /// Verify the check digit of a PIN.
    CheckPin { pin: String },
    /// Derive the UUID-E advertised for a MAC address.
    Uuid { mac: MacAddr },
    /// Print the configuration with defaults applied.
    ShowConfig {
        #[clap(flatten)]
        config: ConfigArgs,
        /// MAC address used to render the device identity.
        #[clap(long, default_value = "02:00:00:00:00:01")]
        mac: MacAddr,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Pin => {
            println!("{}", generate_pin(&mut rand::thread_rng()));
        }
        Command::CheckPin { pin } => match config::normalize_pin(&pin) {
            Some(pin) => println!("{} is valid", pin),
            None => bail!("{} is not a valid WPS PIN", pin),
        },
        Command::Uuid { mac } => {
            println!("{}", uuid_from_mac(mac));
        }
        Command::ShowConfig { config, mac } => {
            let enrollee = config::load_config(&config)?;
            info!("Config loaded from {}", config.config_file.display());
            let device = DeviceInfo::new(mac, &enrollee);
            println!("{}", toml::to_string_pretty(&enrollee)?);
            println!("# manufacturer  = {:?}", device.manufacturer);
            println!("# model_number  = {:?}", device.model_number);
            println!("# model_name    = {:?}", device.model_name);
            println!("# device_name   = {:?}", device.device_name);
            println!("# serial_number = {:?}", device.serial_number);
            println!("# uuid          = {}", device.uuid);
        }
    }
    Ok(())
}
