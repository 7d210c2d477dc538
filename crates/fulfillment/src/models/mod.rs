//! Domain models for the fulfillment pipeline.

pub mod demand;
pub mod mix;
pub mod movement;
pub mod order;
pub mod record;

pub use demand::{AggregateDemand, DemandLine, DemandPlan, OrderDemand, ShortfallLine, ShortfallReport};
pub use mix::MixComponent;
pub use movement::{ProductBalance, StockMovement};
pub use order::{CustomItem, NewOrder, Order, OrderSnapshot};
pub use record::{DeliveryRecord, RecordItem};
