use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Our crates log at `level`; dependencies
/// (reqwest, hyper) stay at `warn`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_new(directives(level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

fn directives(level: &str) -> String {
    format!("warn,owm_core={level},owm_check={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_own_crates() {
        assert_eq!(directives("debug"), "warn,owm_core=debug,owm_check=debug");
    }
}
