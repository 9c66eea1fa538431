//! Per-step summary of the solver state.
use log::info;
use prettytable::{Table, row};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepSummary {
    pub time: f64,
    pub delta_t: f64,
    pub co: f64,
    pub alpha_co: f64,
    pub n_alpha_sub_cycles: usize,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub phase1_volume: f64,
    pub cont_err_global: f64,
    pub cont_err_cumulative: f64,
}

impl StepSummary {
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["Quantity", "Value"]);
        table.add_row(row!["time", format!("{:.6e}", self.time)]);
        table.add_row(row!["deltaT", format!("{:.3e}", self.delta_t)]);
        table.add_row(row!["max Co", format!("{:.4}", self.co)]);
        table.add_row(row!["max interface Co", format!("{:.4}", self.alpha_co)]);
        table.add_row(row!["alpha sub-cycles", self.n_alpha_sub_cycles]);
        table.add_row(row!["min alpha1", format!("{:.3e}", self.alpha_min)]);
        table.add_row(row!["max alpha1", format!("{:.6}", self.alpha_max)]);
        table.add_row(row!["phase-1 volume", format!("{:.6e}", self.phase1_volume)]);
        table.add_row(row!["continuity (global)", format!("{:.3e}", self.cont_err_global)]);
        table.add_row(row![
            "continuity (cumulative)",
            format!("{:.3e}", self.cont_err_cumulative)
        ]);
        table
    }

    pub fn log(&self) {
        info!("\n{}", self.table());
    }
}
