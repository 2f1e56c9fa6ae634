//! dnsfence-monitor: passive per-IP-pair traffic accounting with DNS
//! enrichment on a secondary interface.

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::error;

use dnsfence::config::{self, Config};
use dnsfence::error::FenceError;
use dnsfence::events::build_endpoint;
use dnsfence::monitor::Monitor;
use dnsfence::publisher::HttpPublisher;

/// Passive traffic monitor publishing per-IP-pair summaries.
#[derive(Parser, Debug)]
#[command(name = "dnsfence-monitor", version, about)]
struct Args {
    /// Interface to monitor
    #[arg(short, long, default_value = "kidos")]
    iface: String,
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    install_signal_handlers();

    if let Err(e) = run(&args.iface) {
        error!("monitor: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(iface: &str) -> Result<(), FenceError> {
    let cfg = Config::load(config::DEFAULT_PATH)?;

    let mut publisher = HttpPublisher::new(build_endpoint(&cfg.web.listen, "/api/events"));
    let mut monitor = Monitor::open(iface)?;

    let result = monitor.run(&publisher, &SHUTDOWN_REQUESTED);
    publisher.close();
    result
}
