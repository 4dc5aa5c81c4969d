use std::path::Path;
use std::process;

use petsoft_core::observability::init_logging;

use crate::config::ServeConfig;
use crate::{report_error, serve, OutputFormat};

/// Load config, apply overrides, and run the server until Ctrl+C.
pub(crate) fn cmd_serve(config_path: &Path, port: Option<u16>, output: OutputFormat, quiet: bool) {
    let mut config = match ServeConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };
    if let Err(e) = config.apply_env() {
        report_error(&e.to_string(), output, quiet);
        process::exit(1);
    }
    if let Some(port) = port {
        config.port = port;
    }

    init_logging(config.log_format);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(serve::start_server(config)) {
        report_error(&format!("Server error: {}", e), output, quiet);
        process::exit(1);
    }
}
