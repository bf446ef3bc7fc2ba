pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        rate_limit_quota: u32,
        rate_limit_window_seconds: u64,
        production: bool,
    },
}
