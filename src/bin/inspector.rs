//! dnsfence-inspector: in-line DNS policy enforcement on an AF_XDP socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use dnsfence::config::{self, Config};
use dnsfence::error::FenceError;
use dnsfence::events::build_endpoint;
use dnsfence::inspector::Inspector;
use dnsfence::policy::PolicySet;
use dnsfence::publisher::HttpPublisher;
use dnsfence::xsk;

/// Queue index in the redirect program's socket map.
const QUEUE_ID: u32 = 0;

/// In-line DNS policy enforcement on kernel-bypass packet I/O.
#[derive(Parser, Debug)]
#[command(name = "dnsfence-inspector", version, about)]
struct Args {}

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
    let _args = Args::parse();
    install_signal_handlers();

    if let Err(e) = run() {
        error!("inspector: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), FenceError> {
    let cfg = Config::load(config::DEFAULT_PATH)?;

    xsk::raise_memlock_limit();

    let ifindex = xsk::interface_index(&cfg.interfaces.physical)?;

    let mut publisher = HttpPublisher::new(build_endpoint(&cfg.web.listen, "/api/events"));
    let policy = Arc::new(PolicySet::new(cfg.dns.blocklist.iter()));

    let mut inspector = Inspector::new(ifindex, QUEUE_ID, policy)?;
    info!("dns inspector ready on {}", cfg.interfaces.physical);

    let result = inspector.run(&publisher, &SHUTDOWN_REQUESTED);
    drop(inspector);
    publisher.close();
    result
}
