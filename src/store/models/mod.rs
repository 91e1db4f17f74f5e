mod application;
mod driver;
mod manager;
mod order;
mod review;
mod user;

pub use application::{ApplicationStatus, ApplicationView, DriverApplication};
pub use driver::{Car, Driver};
pub use manager::{Manager, ManagerResponse};
pub use order::{ComfortLevel, Order, OrderStatus};
pub use review::Review;
pub use user::{Role, User, UserResponse};
