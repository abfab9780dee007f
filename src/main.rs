use anyhow::Result;
use tracer::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse cli and handle clap errors
    let options = cli::parse_from_args();

    // Override the default log_level if there is a greater verbosity flag
    tracer::init_logger(Some(options.override_log_level()));

    match tracer::tracer_filter::tracer_filter_run(&options).await {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            tracer::utils::report_error(&e);
            std::process::exit(1);
        }
    }
}
