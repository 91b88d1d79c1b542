//! Human-readable plan summary.

use std::fmt;

use search_core::{PlannerConfig, SearchPlan};

const RULE: &str = "══════════════════════════════════════════════════════════════";

/// Summary of one planning run, printed after the plan is built.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub area: String,
    pub status: String,
    pub cell_size_m: f64,
    pub compression_factor: usize,
    pub aggregation: &'static str,
    pub min_probability: f64,
    pub fine_cells: usize,
    pub coarse_cells: usize,
    pub qualifying_cells: usize,
    pub coarse_path_len: usize,
    pub unvisited: usize,
    pub waypoints: usize,
    pub coarse_distance_m: f64,
    pub flight_distance_m: f64,
    pub probability_covered: f64,
    /// ASCII grid, present only when requested
    pub map: Option<String>,
}

impl PlanReport {
    pub fn new(area: &str, config: &PlannerConfig, plan: &SearchPlan) -> Self {
        let stats = &plan.stats;
        Self {
            area: area.to_string(),
            status: plan.status.name().to_string(),
            cell_size_m: config.cell_size_m,
            compression_factor: config.compression_factor,
            aggregation: config.aggregation.name(),
            min_probability: config.min_probability,
            fine_cells: stats.fine_cells,
            coarse_cells: stats.coarse_cells,
            qualifying_cells: stats.qualifying_cells,
            coarse_path_len: stats.coarse_path_len,
            unvisited: plan.unvisited().len(),
            waypoints: stats.waypoint_count,
            coarse_distance_m: stats.coarse_distance_m,
            flight_distance_m: stats.flight_distance_m,
            probability_covered: stats.probability_covered,
            map: None,
        }
    }

    pub fn with_map(mut self, plan: &SearchPlan) -> Self {
        self.map = Some(plan.probability_map.to_string());
        self
    }

    pub fn print(&self) {
        println!();
        print!("{}", self);
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "╠{}╣", RULE)?;
    writeln!(f, "║ {:<60} ║", title)?;
    writeln!(f, "╠{}╣", RULE)
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "║ {:<22}{:>38} ║", label, value.to_string())
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔{}╗", RULE)?;
        writeln!(f, "║ {:^60} ║", "SEARCH PLAN REPORT")?;
        heading(f, "REQUEST")?;
        row(f, "Area:", &self.area)?;
        row(f, "Cell Size:", format!("{:.1} m", self.cell_size_m))?;
        row(f, "Compression (k):", self.compression_factor)?;
        row(f, "Aggregation:", self.aggregation)?;
        row(f, "Min Probability:", format!("{:.4}", self.min_probability))?;
        heading(f, "GRID")?;
        row(f, "Fine Cells:", self.fine_cells)?;
        row(f, "Coarse Cells:", self.coarse_cells)?;
        row(f, "Qualifying Cells:", self.qualifying_cells)?;
        heading(f, "ROUTE")?;
        row(f, "Status:", &self.status)?;
        row(f, "Coarse Path:", self.coarse_path_len)?;
        if self.unvisited > 0 {
            row(f, "Left Unvisited:", self.unvisited)?;
        }
        row(f, "Waypoints:", self.waypoints)?;
        row(f, "Coarse Distance:", format!("{:.1} m", self.coarse_distance_m))?;
        row(f, "Flight Distance:", format!("{:.1} m", self.flight_distance_m))?;
        row(f, "Probability Covered:", format!("{:.1}%", self.probability_covered * 100.0))?;
        writeln!(f, "╚{}╝", RULE)?;

        if let Some(map) = &self.map {
            writeln!(f)?;
            writeln!(f, "Probability Grid (# pending, * visited):")?;
            write!(f, "{}", map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::AreaId;
    use search_core::{PathBudget, PlanRequest, SearchPlanner};

    fn plan_square(config: &PlannerConfig) -> SearchPlan {
        let area = AreaId::Square;
        SearchPlanner::new(config.clone())
            .plan(&PlanRequest::new(area.boundary(), area.default_start()))
            .unwrap()
    }

    #[test]
    fn test_report_rows_are_aligned() {
        let config = PlannerConfig::default();
        let report = PlanReport::new("square", &config, &plan_square(&config));
        let text = report.to_string();

        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|&w| w == widths[0]));
        assert!(text.contains("complete"));
        assert!(!text.contains("Left Unvisited"));
    }

    #[test]
    fn test_report_shows_budget_remainder() {
        let config = PlannerConfig {
            budget: PathBudget::unconstrained().with_max_cells(2),
            ..PlannerConfig::default()
        };
        let report = PlanReport::new("square", &config, &plan_square(&config));

        assert_eq!(report.status, "budget_exhausted");
        assert!(report.unvisited > 0);
        assert!(report.to_string().contains("Left Unvisited"));
    }

    #[test]
    fn test_map_appended_on_request() {
        let config = PlannerConfig::default();
        let plan = plan_square(&config);
        let report = PlanReport::new("square", &config, &plan).with_map(&plan);

        let text = report.to_string();
        assert!(text.contains("Probability Grid"));
        assert!(text.contains('*'));
    }
}
