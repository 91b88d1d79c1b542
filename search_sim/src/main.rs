//! Search Planner CLI
//!
//! Plan a coverage route over a reference area and report, export or fly it.

use anyhow::{bail, Context, Result};
use clap::Parser;
use search_core::{
    AggregationPolicy, FlightSink, GeoPoint, GridAlignment, PlanRequest, PlanResult, PlannerConfig, ProbabilitySeed,
    SearchPlanner, Waypoint,
};
use search_sim::{AreaId, PlanExport, PlanReport};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Search Planner CLI
#[derive(Parser, Debug)]
#[command(name = "search-sim")]
#[command(about = "Plan a probability-driven search route over a reference area", long_about = None)]
struct Args {
    /// Area to search (air_drop, search_field, square)
    #[arg(short, long, default_value = "air_drop")]
    area: String,

    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Fine cell size in meters
    #[arg(short, long)]
    resolution: Option<f64>,

    /// Fine cells per coarse cell side
    #[arg(short = 'k', long)]
    compression: Option<usize>,

    /// Coarse aggregation (sum, max)
    #[arg(long)]
    aggregation: Option<String>,

    /// Grid alignment (north, longest_edge, or a heading in degrees)
    #[arg(long)]
    alignment: Option<String>,

    /// Only cells above this probability are planned
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum coarse cells in the path
    #[arg(long)]
    max_cells: Option<usize>,

    /// Maximum coarse travel distance in meters
    #[arg(long)]
    max_distance: Option<f64>,

    /// Flight altitude in meters
    #[arg(long)]
    altitude: Option<f64>,

    /// Start position as "lat,lon" (defaults to the area's first vertex)
    #[arg(long)]
    start: Option<String>,

    /// Sighting hint as "lat,lon,weight"; repeatable
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Print the probability grid after the report
    #[arg(long)]
    show_map: bool,

    /// Send the route to the (logging) flight controller
    #[arg(long)]
    fly: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export the plan to a JSON file
    #[arg(long)]
    export: Option<String>,
}

/// Flight controller stand-in that logs the route.
struct LogSink;

impl FlightSink for LogSink {
    fn fly(&mut self, waypoints: &[Waypoint]) -> PlanResult<()> {
        for (i, w) in waypoints.iter().enumerate() {
            debug!("  wp {:>4}: {:.7}, {:.7} @ {:.1} m", i, w.latitude, w.longitude, w.altitude);
        }
        info!("Uploaded {} waypoints", waypoints.len());
        Ok(())
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let area: AreaId = args.area.parse().map_err(anyhow::Error::msg)?;
    let config = build_config(args)?;
    let start = match &args.start {
        Some(s) => parse_point(s)?,
        None => area.default_start(),
    };
    let seeds = args.seeds.iter().map(|s| parse_seed(s)).collect::<Result<Vec<_>>>()?;

    if !args.json {
        info!("Search Planner v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Area: {} ({})", area.name(), area.description());
    }

    let request = PlanRequest::new(area.boundary(), start).with_seeds(seeds);
    let planner = SearchPlanner::new(config.clone());
    let plan = if args.fly {
        planner.execute(&request, &mut LogSink)
    } else {
        planner.plan(&request)
    }
    .with_context(|| format!("planning {} failed", area.name()))?;

    if plan.is_empty() {
        info!("No cell above the probability threshold; nothing to fly");
    }

    if let Some(path) = &args.export {
        PlanExport::new(area.name(), &config, start, &plan)
            .write_to_file(path)
            .with_context(|| format!("writing export to {}", path))?;
        info!("Exported plan to {}", path);
    }

    if args.json {
        let export = PlanExport::new(area.name(), &config, start, &plan);
        println!("{}", serde_json::to_string_pretty(&export)?);
    } else {
        let mut report = PlanReport::new(area.name(), &config, &plan);
        if args.show_map {
            report = report.with_map(&plan);
        }
        report.print();
    }

    Ok(())
}

/// Loads the config file (if any) and applies flag overrides.
fn build_config(args: &Args) -> Result<PlannerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
            PlannerConfig::from_json(&json)?
        }
        None => PlannerConfig::default(),
    };

    if let Some(size) = args.resolution {
        config.cell_size_m = size;
    }
    if let Some(k) = args.compression {
        config.compression_factor = k;
    }
    if let Some(policy) = &args.aggregation {
        config.aggregation = policy.parse::<AggregationPolicy>().map_err(anyhow::Error::msg)?;
    }
    if let Some(alignment) = &args.alignment {
        config.alignment = parse_alignment(alignment)?;
    }
    if let Some(threshold) = args.threshold {
        config.min_probability = threshold;
    }
    if let Some(cells) = args.max_cells {
        config.budget.max_cells = Some(cells);
    }
    if let Some(meters) = args.max_distance {
        config.budget.max_distance_m = Some(meters);
    }
    if let Some(altitude) = args.altitude {
        config.altitude_m = altitude;
    }

    config.validate()?;
    Ok(config)
}

fn parse_numbers(s: &str, expected: usize, what: &str) -> Result<Vec<f64>> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: {}", what, s))?;
    if values.len() != expected {
        bail!("invalid {}: {} (expected {} comma-separated numbers)", what, s, expected);
    }
    Ok(values)
}

fn parse_point(s: &str) -> Result<GeoPoint> {
    let v = parse_numbers(s, 2, "position")?;
    Ok(GeoPoint::new(v[0], v[1]))
}

fn parse_seed(s: &str) -> Result<ProbabilitySeed> {
    let v = parse_numbers(s, 3, "seed")?;
    Ok(ProbabilitySeed::new(GeoPoint::new(v[0], v[1]), v[2]))
}

fn parse_alignment(s: &str) -> Result<GridAlignment> {
    match s.to_lowercase().as_str() {
        "north" => Ok(GridAlignment::North),
        "longest_edge" | "longestedge" | "edge" => Ok(GridAlignment::LongestEdge),
        other => {
            let degrees: f64 = other
                .parse()
                .with_context(|| format!("unknown alignment: {} (expected north, longest_edge or degrees)", s))?;
            Ok(GridAlignment::Heading(degrees.to_radians()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["search-sim"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = build_config(&args(&["-r", "5", "-k", "4", "--aggregation", "max", "--max-cells", "7"])).unwrap();

        assert_eq!(config.cell_size_m, 5.0);
        assert_eq!(config.compression_factor, 4);
        assert_eq!(config.aggregation, AggregationPolicy::Max);
        assert_eq!(config.budget.max_cells, Some(7));
        assert_eq!(config.budget.max_distance_m, None);
    }

    #[test]
    fn test_invalid_flag_values_rejected() {
        assert!(build_config(&args(&["-k", "0"])).is_err());
        assert!(build_config(&args(&["--aggregation", "mean"])).is_err());
        assert!(build_config(&args(&["--threshold", "-1"])).is_err());
    }

    #[test]
    fn test_parse_seed() {
        let seed = parse_seed("38.3144, -76.5452, 2.5").unwrap();
        assert_eq!(seed.location, GeoPoint::new(38.3144, -76.5452));
        assert_eq!(seed.weight, 2.5);

        assert!(parse_seed("38.3144,-76.5452").is_err());
        assert!(parse_seed("north,east,1").is_err());
    }

    #[test]
    fn test_parse_alignment() {
        assert_eq!(parse_alignment("north").unwrap(), GridAlignment::North);
        assert_eq!(parse_alignment("longest_edge").unwrap(), GridAlignment::LongestEdge);
        assert_eq!(parse_alignment("90").unwrap(), GridAlignment::Heading(90f64.to_radians()));
        assert!(parse_alignment("sideways").is_err());
    }

    #[test]
    fn test_run_rejects_unknown_area() {
        assert!(run(&args(&["--area", "lake", "--json"])).is_err());
    }
}
