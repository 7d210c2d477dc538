//! Mix configuration inspection commands.

use rust_decimal::Decimal;

use restock_fulfillment::db::MixConfigRepository;
use restock_fulfillment::services::allocation;

/// Check whether the active mix percentages are usable.
///
/// Prints every component and whether Standard allocation is available
/// system-wide. An unusable configuration makes the pipeline fall back to
/// even distribution, so this is the first thing to check when allocations
/// look wrong.
///
/// # Errors
///
/// Returns an error if configuration is missing or the query fails.
pub async fn check() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let repository = MixConfigRepository::new(&pool);

    let components = repository.all_components().await?;
    let active: Vec<_> = components
        .iter()
        .filter(|component| component.active)
        .cloned()
        .collect();
    let active_sum: Decimal = active.iter().map(|component| component.percentage).sum();
    let usable = allocation::mix_is_usable(&active);

    #[allow(clippy::print_stdout)]
    {
        println!("{:<6} {:<30} {:>10} {:>8}", "ID", "PRODUCT", "PERCENT", "ACTIVE");
        for component in &components {
            println!(
                "{:<6} {:<30} {:>10} {:>8}",
                component.id,
                component.product_name,
                component.percentage,
                if component.active { "yes" } else { "no" }
            );
        }
        println!();
        println!("Active components: {}", active.len());
        println!("Active percentage sum: {active_sum}");
        if usable {
            println!("Standard allocation: available");
        } else {
            println!("Standard allocation: UNAVAILABLE (sum must be 100 +/- 0.01)");
            println!("Orders will fall back to even distribution until this is fixed.");
        }
    }

    Ok(())
}
