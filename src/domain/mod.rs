pub mod cart;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;

pub type UserId = u64;
pub type ProductId = u64;
pub type OrderId = u64;
pub type ItemId = u64;
