use crate::types::EnergySummary;

/// Render the fixed four-line cost summary
pub fn format_summary(summary: &EnergySummary, currency: &str) -> String {
    let fuel = summary.fuel_type.as_str();
    format!(
        "Total {fuel} consumption: {:.2} kWh\n\
         Total {fuel} unit cost: {currency}{:.2}\n\
         Total standing charge: {currency}{:.2}\n\
         Total {fuel} cost: {currency}{:.2}",
        summary.total_consumption,
        summary.total_unit_cost,
        summary.total_standing_charge,
        summary.total_cost,
    )
}
