pub mod health_route;
pub mod sessions;
pub mod turns;
