pub fn config_loaded(path: &str) -> String {
    format!("Loaded configuration from {path}")
}

pub fn config_missing(path: &str) -> String {
    format!("No configuration file at {path}, using defaults and environment")
}

pub fn project_root(path: &str) -> String {
    format!("Project root: {path}")
}

pub fn listening(addr: &str) -> String {
    format!("projectd listening on http://{addr}")
}

pub fn route(method: &str, path: &str) -> String {
    format!("  {method:<6} {path}")
}

pub const SHUTDOWN: &str = "Shutting down...";

pub fn shutdown_fail(err: &str) -> String {
    format!("Unable to listen for shutdown signal: {err}")
}
