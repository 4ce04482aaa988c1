//! Tracing setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates logged at `info` unless `RUST_LOG` says otherwise
const DEFAULT_DIRECTIVES: [&str; 2] = ["mcp_studio=info", "studio=info"];

/// Initialize tracing to stderr
///
/// Filtering comes from `RUST_LOG` on top of the default directives. Set
/// `LOG_FORMAT=json` for structured JSON output; text output has no ANSI
/// colors.
pub fn init_tracing() -> anyhow::Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}
