mod cli;

#[tokio::main]
async fn main() {
    let config = match cli::run() {
        cli::RunOutcome::Serve(config) => config,
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    apns_relay::logging::init_tracing(apns_relay::logging::DEFAULT_FILTER, config.log_json);

    if let Err(err) = apns_relay::serve(config).await {
        tracing::error!(error = %err, "relay stopped");
        std::process::exit(1);
    }
}
