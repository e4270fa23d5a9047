#![allow(clippy::result_large_err)]

use anyhow::Context;
use podtato::config::{CliOverrides, PodtatoConfig};
use podtato::telemetry;

enum CliCommand {
    Run(CliOverrides),
    Help,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise telemetry")?;

    match parse_cli_args(std::env::args().skip(1))? {
        CliCommand::Run(overrides) => {
            let mut config = PodtatoConfig::load().context("failed to load configuration")?;
            config.apply_overrides(overrides);
            let settings = config.validate().context("invalid configuration")?;

            let app = podtato::app::PodtatoApp::initialise(settings)
                .context("failed to construct application")?;

            app.run().await.context("application runtime error")
        }
        CliCommand::Help => {
            print_help();
            Ok(())
        }
    }
}

fn parse_cli_args<I>(args: I) -> anyhow::Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut overrides = CliOverrides::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--component" => {
                if overrides.component.is_some() {
                    anyhow::bail!("component specified multiple times");
                }
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("expected role after {arg}"))?;
                overrides.component = Some(value);
            }
            "-p" | "--port" => {
                if overrides.port.is_some() {
                    anyhow::bail!("port specified multiple times");
                }
                let value = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("expected port after {arg}"))?;
                let port = value
                    .parse::<u16>()
                    .with_context(|| format!("invalid port `{value}`"))?;
                overrides.port = Some(port);
            }
            "-h" | "--help" => return Ok(CliCommand::Help),
            other => anyhow::bail!("unrecognised argument `{other}`"),
        }
    }

    Ok(CliCommand::Run(overrides))
}

fn print_help() {
    println!(
        "\
Usage: podtato-server [OPTIONS]

Options:
  -c, --component <ROLE>  all, frontend, or a single part (hat, left-arm, ...)
  -p, --port <PORT>       Listen port; monolith peers use PORT+1..PORT+5
  -h, --help              Print this help message

Configuration is also read from config/local.(toml|yaml) and PODTATO_* variables,
e.g. PODTATO_COMPONENT, PODTATO_STARTUP_DELAY=5s, PODTATO_PEER__REQUEST_TIMEOUT=2s.
"
    );
}
