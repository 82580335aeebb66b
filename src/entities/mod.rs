//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod business;
pub mod card;
pub mod category;
pub mod company;
pub mod employee;
pub mod payment;
pub mod recharge;

pub use business::{Column as BusinessColumn, Entity as Business, Model as BusinessModel};
pub use card::{Column as CardColumn, Entity as Card, Model as CardModel};
pub use category::Category;
pub use company::{Column as CompanyColumn, Entity as Company, Model as CompanyModel};
pub use employee::{Column as EmployeeColumn, Entity as Employee, Model as EmployeeModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use recharge::{Column as RechargeColumn, Entity as Recharge, Model as RechargeModel};
