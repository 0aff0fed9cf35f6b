use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gw-desktop")]
#[command(about = "Keeps the local gateway running while the desktop app wants it")]
#[command(version)]
pub struct Cli {
    /// Only attach to a gateway that is already running; never start one
    #[arg(long)]
    pub(crate) attach_only: bool,

    /// Gateway port (overrides config.toml and GW_GATEWAY_PORT)
    #[arg(long)]
    pub(crate) port: Option<u16>,

    /// Stop managing the gateway and disable its background service
    #[arg(long, conflicts_with = "once")]
    pub(crate) deactivate: bool,

    /// Activate, print the resulting status as JSON and exit
    #[arg(long)]
    pub(crate) once: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub(crate) fn apply(&self, config: &mut gw_config::Config) {
        if self.attach_only {
            config.gateway.attach_only = true;
        }
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
    }
}
