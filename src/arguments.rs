use {
    super::*,
    clap::{
        ValueEnum,
        builder::styling::{AnsiColor, Effects, Styles},
    },
};

/// The compute backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "UPPER")]
pub enum Device {
    Cpu,
    Gpu,
}

/// `<bin> <host> <port> <user> <password> <CPU|GPU> <num_workers> <platform_id> <local_work_size>`
#[derive(Debug, Parser)]
#[command(
    version,
    styles = Styles::styled()
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Red.on_default())
        .literal(AnsiColor::Blue.on_default())
        .placeholder(AnsiColor::Cyan.on_default())
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default()),
)]
pub struct Arguments {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub device: Device,
    pub num_workers: usize,
    pub platform_id: usize,
    pub local_work_size: usize,
}
