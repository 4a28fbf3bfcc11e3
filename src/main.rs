use anneal_router::config::{AppConfig, SolverBackend};
use anneal_router::graph::GraphGenerator;
use anneal_router::optimizer::{OptimizationReport, RouteOptimizer};
use anneal_router::router::RouteFinder;
use anneal_router::solver::{ExhaustiveSolver, QuboSolver, SimulatedAnnealer};
use anyhow::{anyhow, Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run() {
        tracing::error!(error = ?err, "fatal routing error");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let optimize = config.optimize_config()?;
    let solver = build_solver(config.solver_backend()?)?;
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);

    let graph = GraphGenerator::new(
        config.graph.num_nodes,
        config.graph.num_channels,
        config.graph.capacity_range(),
    )
    .generate(&mut rng)
    .context("generate payment network")?;
    let stats = graph.stats();
    info!(
        nodes = stats.num_nodes,
        channels = stats.num_channels,
        avg_degree = stats.avg_degree,
        max_degree = stats.max_degree,
        avg_capacity = stats.avg_capacity,
        avg_fee = stats.avg_fee,
        connected = stats.is_connected,
        "payment network generated"
    );

    let finder = RouteFinder::new(&graph)
        .with_edge_penalty(config.routing.edge_penalty)
        .context("configure route finder")?;
    let transactions = finder
        .generate_transactions(
            config.transactions.count,
            config.transactions.amount_range(),
            &mut rng,
        )
        .context("sample transactions")?;
    for tx in &transactions {
        info!(id = tx.id, source = tx.source, destination = tx.destination, amount = tx.amount, "transaction");
    }

    let candidates = finder.find_all_routes(&transactions, config.routing.candidates, &mut rng);
    for (id, routes) in &candidates {
        for (j, route) in routes.iter().enumerate() {
            let info = finder.route_info(route);
            debug!(tx = id, candidate = j, hops = info.num_hops, fee = info.total_fee, avg_capacity = info.avg_capacity, "candidate route");
        }
    }

    let report = RouteOptimizer::new(solver)
        .optimize(&graph, &transactions, &candidates, &optimize)
        .context("optimize routes")?;
    log_report(&report);
    debug!(metrics = %anneal_router::metrics::render(), "metrics snapshot");
    Ok(())
}

fn build_solver(backend: SolverBackend) -> Result<Box<dyn QuboSolver>> {
    let solver: Box<dyn QuboSolver> = match backend {
        SolverBackend::Anneal { schedule, seed } => {
            Box::new(SimulatedAnnealer::new(seed).with_schedule(schedule))
        }
        SolverBackend::Exhaustive { max_variables } => {
            Box::new(ExhaustiveSolver::new(max_variables))
        }
        #[cfg(feature = "http-solver")]
        SolverBackend::Http {
            endpoint,
            token,
            retries,
        } => {
            use anneal_router::solver::{HttpAnnealer, RetryingSolver};
            let mut annealer = HttpAnnealer::new(endpoint).with_label("anneal-router");
            info!(endpoint = %annealer.endpoint(), retries, "remote annealer configured");
            if let Some(token) = token {
                annealer = annealer.with_token(token);
            }
            Box::new(RetryingSolver::new(annealer, retries))
        }
        #[cfg(not(feature = "http-solver"))]
        SolverBackend::Http { .. } => {
            return Err(anyhow!("built without the http-solver feature"));
        }
    };
    info!(solver = solver.name(), "solver backend selected");
    Ok(solver)
}

fn log_report(report: &OptimizationReport) {
    for outcome in &report.outcomes {
        match &outcome.selected {
            Some(route) => info!(
                tx = outcome.transaction_id,
                amount = outcome.amount,
                candidate = route.candidate_index,
                hops = route.hop_count,
                fee = route.fee,
                path = ?route.nodes,
                "route selected"
            ),
            None => warn!(
                tx = outcome.transaction_id,
                status = outcome.status.as_str(),
                "no route selected"
            ),
        }
    }
    for channel in report.channels.iter().filter(|c| !c.feasible) {
        warn!(
            channel = channel.channel_id,
            usage = channel.usage,
            capacity = channel.capacity,
            "channel over capacity"
        );
    }
    info!(
        solver = %report.solver,
        feasible = report.is_feasible(),
        objective = report.objective,
        capacity_energy = report.energy.capacity,
        route_energy = report.energy.route,
        distance_energy = report.energy.distance,
        routed = report.stats.routed,
        total_hops = report.stats.total_hops,
        avg_hops = report.stats.avg_hops,
        total_fee = report.stats.total_fee,
        elapsed_ms = report.elapsed.as_millis() as u64,
        variables = report.variable_info.used_variables,
        "routing report"
    );
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
