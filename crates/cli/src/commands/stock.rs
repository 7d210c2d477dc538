//! Stock ledger inspection and adjustment commands.

use restock_core::ProductId;
use restock_fulfillment::db::StockRepository;

/// Print the ledger-derived balance for every product.
///
/// # Errors
///
/// Returns an error if configuration is missing or the query fails.
pub async fn balances() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let repository = StockRepository::new(&pool);

    let balances = repository.balances().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<10} {:>12}", "PRODUCT", "BALANCE");
        for balance in &balances {
            println!("{:<10} {:>12}", balance.product_id, balance.balance);
        }
        if balances.is_empty() {
            println!("(no ledger activity)");
        }
    }

    Ok(())
}

/// Write a manual credit movement for a product.
///
/// # Errors
///
/// Returns an error if configuration is missing, the quantity is not
/// positive, or the write fails.
pub async fn credit(product: i32, quantity: i32) -> Result<(), Box<dyn std::error::Error>> {
    if quantity <= 0 {
        return Err("quantity must be positive".into());
    }

    let pool = super::connect().await?;
    let repository = StockRepository::new(&pool);

    let movement = repository
        .insert_credit(ProductId::new(product), quantity)
        .await?;

    tracing::info!(
        movement_id = %movement.id,
        product_id = %movement.product_id,
        quantity = movement.quantity,
        "Credit recorded"
    );
    Ok(())
}
