pub mod ads;
pub mod health;
pub mod users;
