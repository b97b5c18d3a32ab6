use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capstats::config::Args;
use capstats::server;
use capstats::state::AnalysisState;
use capstats::vendor::{HttpLookup, OfflineLookup, VendorLookup, VendorResolver};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let sources = args.sources()?;
    let workers = args.workers()?;

    let lookup: Box<dyn VendorLookup> = if args.offline {
        Box::new(OfflineLookup)
    } else {
        Box::new(HttpLookup::new(&args.lookup_url, args.lookup_timeout())?)
    };
    let resolver = VendorResolver::new(lookup).with_retries(args.lookup_retries);

    // everything is computed up front; the server only ever reads it
    let state = AnalysisState::build(&sources, &resolver, workers);
    info!(
        protocols = state.protocols.is_ready(),
        manufacturers = state.manufacturers.is_ready(),
        rip_graph = state.rip_graph.is_ready(),
        udp_ports = state.udp_ports.is_ready(),
        "analyses computed"
    );

    if args.report {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    actix_web::rt::System::new().block_on(server::run(state, args.bind))?;
    Ok(())
}
