#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    #[error("config error: {0}")]
    Config(String),
    #[error("interface {name}: {detail}")]
    Interface { name: String, detail: String },
    #[error("kernel map {0} not found")]
    MapNotFound(String),
    #[error("bpf syscall error: {0}")]
    Bpf(#[source] std::io::Error),
    #[error("xdp socket error: {0}")]
    Socket(String),
    #[error("capture device error: {0}")]
    Capture(String),
    #[error("DNS parse error at offset {offset}: {detail}")]
    DnsParse { offset: usize, detail: String },
    #[error("not a DNS frame")]
    NotDns,
    #[error("poll error: {0}")]
    Poll(#[source] std::io::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}
