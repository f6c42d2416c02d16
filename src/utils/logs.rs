use tracing::Level;

// Installs a JSON formatter for structured logs. Embedding applications usually call this
// once at startup; later calls keep the subscriber that is already installed.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // ANSI color codes are noise once logs are shipped to a collector.
        .with_ansi(false)
        // the log collector adds the ingestion time.
        .without_time()
        .json()
        .try_init();
}
