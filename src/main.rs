use clap::Parser;
use color_eyre::Result;
use gantry::{config, core::RouteCompiler, tracing_setup};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Load a configuration file and report whether it compiles
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "gateway.yaml")]
        config: String,
    },
    /// Compile a configuration file and print the resulting route set
    Routes {
        /// Configuration file to compile
        #[clap(short, long, default_value = "gateway.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_setup::init_console_tracing()?;

    let args = Args::parse();

    match args.command {
        Commands::Validate { config } => validate_command(&config).await,
        Commands::Routes { config } => routes_command(&config).await,
    }
}

async fn validate_command(config_path: &str) -> Result<()> {
    let config = config::load_config(config_path).await?;
    let routes = RouteCompiler::compile(&config);
    println!(
        "✅ {} compiled: {} route(s)",
        config_path,
        routes.len()
    );
    Ok(())
}

async fn routes_command(config_path: &str) -> Result<()> {
    let config = config::load_config(config_path).await?;
    let routes = RouteCompiler::compile(&config);

    if routes.is_empty() {
        println!("(no routes)");
        return Ok(());
    }

    for route in &routes {
        let methods = route
            .upstream_http_methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let methods = if methods.is_empty() { "*" } else { &methods };

        for downstream in &route.downstream_routes {
            let target = if downstream.flags.use_service_discovery {
                format!("service:{}", downstream.service_name)
            } else {
                downstream
                    .downstream_addresses
                    .iter()
                    .map(|address| format!("{}:{}", address.host, address.port))
                    .collect::<Vec<_>>()
                    .join(",")
            };
            println!(
                "{methods} {} -> {}://{}{} (timeout: {})",
                route.upstream_template.as_str(),
                downstream.downstream_scheme,
                target,
                downstream.downstream_path_template,
                if downstream.qos_options.timeout_ms == 0 {
                    "default".to_string()
                } else {
                    format!("{}ms", downstream.qos_options.timeout_ms)
                },
            );
        }
    }
    Ok(())
}
