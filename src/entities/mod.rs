pub mod address;
pub mod order;
pub mod order_status_history;

pub use address::Entity as Address;
pub use order::Entity as Order;
pub use order_status_history::Entity as OrderStatusHistory;
